use crate::catalog::record::{Field, Record};
use crate::catalog::store::Change;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Inventory numbers that match the shape but are known not to be real.
pub const DEFAULT_FALSE_POSITIVES: [&str; 2] = ["T01", "FE3018T"];

const INVENTORY_SEPARATOR: &str = "|";

static CANDIDATE_RE: OnceLock<Regex> = OnceLock::new();

// Prefix, digit run and optional suffix letter. The "not preceded by an
// uppercase letter" and "suffix not followed by a letter" rules are
// checked by hand in `extract`.
fn candidate_re() -> &'static Regex {
    CANDIDATE_RE.get_or_init(|| {
        Regex::new(r"(?:M|T|DVD|FE|HFA|VA|XFE|XFF|XVE)[0-9]{2,}(?P<suffix>[A-Z])?")
            .expect("inventory pattern is valid")
    })
}

/// Ordered, de-duplicated inventory numbers found in `text`, minus
/// `false_positives`.
pub fn extract(text: &str, false_positives: &[String]) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut found: Vec<String> = Vec::new();
    let mut pos = 0usize;

    while pos < text.len() {
        let Some(caps) = candidate_re().captures_at(text, pos) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        let start = whole.start();

        if start > 0 && bytes[start - 1].is_ascii_uppercase() {
            // Prefix letters are ASCII, so the next byte is a char boundary.
            pos = start + 1;
            continue;
        }

        let mut end = whole.end();
        if let Some(suffix) = caps.name("suffix")
            && bytes.get(suffix.end()).is_some_and(u8::is_ascii_alphabetic)
        {
            end = suffix.start();
        }

        let token = &text[start..end];
        if !found.iter().any(|seen| seen == token) {
            found.push(token.to_string());
        }
        pos = end;
    }

    found.retain(|token| !false_positives.iter().any(|fp| fp == token));
    found
}

/// Stored representation of several inventory numbers.
pub fn join_inventory_numbers(numbers: &[String]) -> String {
    numbers.join(INVENTORY_SEPARATOR)
}

/// Records whose inventory number is blank or explicitly marked invalid.
pub fn needs_inventory_number(record: &Record) -> bool {
    record.is_blank(Field::InventoryNumber)
        || record
            .get(Field::InventoryNumber)
            .to_lowercase()
            .contains("invalid")
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtractedInventory {
    pub id: u64,
    pub inventory_number: String,
    pub file_folder_name: String,
    pub sub_folder_name: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryPlan {
    pub candidates: usize,
    pub changes: Vec<Change>,
    pub extracted: Vec<ExtractedInventory>,
}

/// Fill missing or invalid inventory numbers from the path fields. Records
/// where nothing survives the deny-list are left untouched.
pub fn plan_inventory_extraction(records: &[Record], false_positives: &[String]) -> InventoryPlan {
    let mut plan = InventoryPlan::default();
    for record in records.iter().filter(|r| needs_inventory_number(r)) {
        plan.candidates += 1;
        let numbers = extract(&record.path_string(), false_positives);
        if numbers.is_empty() {
            continue;
        }
        let joined = join_inventory_numbers(&numbers);
        if joined == record.get(Field::InventoryNumber) {
            continue;
        }
        plan.changes.push(Change::SetField {
            id: record.id,
            field: Field::InventoryNumber,
            value: joined.clone(),
        });
        plan.extracted.push(ExtractedInventory {
            id: record.id,
            inventory_number: joined,
            file_folder_name: record.get(Field::FileFolderName).to_string(),
            sub_folder_name: record.get(Field::SubFolderName).to_string(),
            file_name: record.get(Field::FileName).to_string(),
        });
    }
    plan
}
