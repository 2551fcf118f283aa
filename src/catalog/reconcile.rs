//! Forward scans over the id-ordered record set that repair rows imported
//! from the lab spreadsheet.
//!
//! Every pass only *plans*: it reads a snapshot and returns the `Change`s it
//! would make. Carried values ("last device seen", "last folder seen", ...)
//! are locals of the scan, so each call starts from a clean slate and only
//! looks at records already visited.

use crate::catalog::record::{Field, Record};
use crate::catalog::status::StatusId;
use crate::catalog::store::Change;
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_HEADER_VALUE: &str = "File Folder Name";
pub const DEFAULT_DIGITAL_LAB_LOCATION: &str = "Digital Lab";

static DEVICE_MARKER_RE: OnceLock<Regex> = OnceLock::new();
static INLINE_NOTE_RE: OnceLock<Regex> = OnceLock::new();

fn device_marker_re() -> &'static Regex {
    DEVICE_MARKER_RE.get_or_init(|| {
        Regex::new(r"(?i)digital\s*lab\s*[0-9]").expect("device marker pattern is valid")
    })
}

fn inline_note_re() -> &'static Regex {
    INLINE_NOTE_RE
        .get_or_init(|| Regex::new(r"\[.*?\]").expect("inline note pattern is valid"))
}

/// Literals that identify special rows in the source data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRules {
    /// `file_folder_name` value of a header row repeated mid-sheet.
    pub header_value: String,
    /// `carrier_a_location` of rows that already carry complete carrier info.
    pub digital_lab_location: String,
}

impl Default for ReconcileRules {
    fn default() -> Self {
        Self {
            header_value: DEFAULT_HEADER_VALUE.to_string(),
            digital_lab_location: DEFAULT_DIGITAL_LAB_LOCATION.to_string(),
        }
    }
}

impl ReconcileRules {
    pub fn is_header(&self, record: &Record) -> bool {
        record.get(Field::FileFolderName) == self.header_value
    }
}

pub fn is_device_marker(hard_drive_name: &str) -> bool {
    device_marker_re().is_match(hard_drive_name)
}

pub fn has_inline_note(text: &str) -> bool {
    inline_note_re().is_match(text)
}

fn non_empty(records: &[Record]) -> impl Iterator<Item = &Record> {
    records.iter().filter(|r| !r.is_empty())
}

fn set_field(record: &Record, field: Field, value: &str) -> Change {
    Change::SetField {
        id: record.id,
        field,
        value: value.to_string(),
    }
}

/// Pass A: rows with no text at all.
pub fn plan_delete_empty(records: &[Record]) -> Vec<Change> {
    records
        .iter()
        .filter(|r| r.is_empty())
        .map(|r| Change::Delete { id: r.id })
        .collect()
}

/// Pass B: copy the last seen "Digital Lab N" device name down onto the
/// rows below it. A header row ends the device's block.
pub fn plan_drive_name_propagation(records: &[Record], rules: &ReconcileRules) -> Vec<Change> {
    let mut current_drive: Option<&str> = None;
    let mut changes = Vec::new();

    for record in non_empty(records) {
        let name = record.get(Field::HardDriveName);
        if is_device_marker(name) {
            current_drive = Some(name);
        } else if rules.is_header(record) {
            current_drive = None;
        } else if let Some(drive) = current_drive {
            changes.push(set_field(record, Field::HardDriveName, drive));
        }
    }
    changes
}

/// Pass C: fill a blank folder name from the folder above, but only on
/// rows that name a sub folder or file.
pub fn plan_folder_name_propagation(records: &[Record], rules: &ReconcileRules) -> Vec<Change> {
    let mut current_folder: Option<&str> = None;
    let mut changes = Vec::new();

    for record in non_empty(records) {
        if rules.is_header(record) {
            current_folder = None;
        } else if !record.is_blank(Field::FileFolderName) {
            current_folder = Some(record.get(Field::FileFolderName));
        } else if let Some(folder) = current_folder
            && record.has_file_info()
        {
            changes.push(set_field(record, Field::FileFolderName, folder));
        }
    }
    changes
}

/// Pass D: for tape-resident rows, fill blank carrier fields from the last
/// row that had both carriers. Existing carrier values are never replaced.
pub fn plan_carrier_propagation(records: &[Record], rules: &ReconcileRules) -> Vec<Change> {
    let mut prev_a = "";
    let mut prev_b = "";
    let mut changes = Vec::new();

    let tape_rows = non_empty(records).filter(|r| {
        r.is_blank(Field::HardDriveName)
            && r.get(Field::CarrierALocation) != rules.digital_lab_location
            && !rules.is_header(r)
    });

    for record in tape_rows {
        let has_a = !record.is_blank(Field::CarrierA);
        let has_b = !record.is_blank(Field::CarrierB);
        if has_a && has_b {
            prev_a = record.get(Field::CarrierA);
            prev_b = record.get(Field::CarrierB);
            continue;
        }
        if prev_a.trim().is_empty() || prev_b.trim().is_empty() || !record.has_file_info() {
            continue;
        }
        if !has_a {
            changes.push(set_field(record, Field::CarrierA, prev_a));
        }
        if !has_b {
            changes.push(set_field(record, Field::CarrierB, prev_b));
        }
    }
    changes
}

/// Pass E: header rows, once B-D no longer need them as boundaries.
pub fn plan_delete_headers(records: &[Record], rules: &ReconcileRules) -> Vec<Change> {
    records
        .iter()
        .filter(|r| rules.is_header(r))
        .map(|r| Change::Delete { id: r.id })
        .collect()
}

/// Pass F: rows that only ever carried a device name.
pub fn plan_delete_hard_drive_only(records: &[Record]) -> Vec<Change> {
    records
        .iter()
        .filter(|r| {
            let mut populated = r.populated_fields();
            populated.next() == Some(Field::HardDriveName) && populated.next().is_none()
        })
        .map(|r| Change::Delete { id: r.id })
        .collect()
}

/// Pass G: bracketed notes inside path fields need a human to look at them.
pub fn plan_flag_inline_notes(records: &[Record], needs_review: StatusId) -> Vec<Change> {
    records
        .iter()
        .filter(|r| !r.status.contains(&needs_review))
        .filter(|r| {
            Field::PATH_FIELDS
                .iter()
                .any(|field| has_inline_note(r.get(*field)))
        })
        .map(|r| Change::AddStatus {
            id: r.id,
            status: needs_review,
        })
        .collect()
}
