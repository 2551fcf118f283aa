use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::catalog::record::{Field, Record, RecordLinks};
use crate::catalog::status::StatusCatalog;
use crate::catalog::store::{Change, MemoryStore, RecordStore, apply_changes};
use crate::catalog::util::truncate_with_ellipsis;
use crate::commands::{CommandReport, StoreSession};

const NO_FILE_NAME: &str = "NO FILE NAME";
const NOTE_VALUE_CHARS: usize = 80;

/// Input is either one sheet of rows or a list of sheets.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UpdateInput {
    Sheets(Vec<Vec<Map<String, Value>>>),
    Rows(Vec<Map<String, Value>>),
}

impl UpdateInput {
    fn into_sheets(self) -> Vec<Vec<Map<String, Value>>> {
        match self {
            UpdateInput::Sheets(sheets) => sheets,
            UpdateInput::Rows(rows) => vec![rows],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Skip,
    Text(Field),
    Link(LinkKey),
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKey {
    AssignedUser,
    AssetType,
    FileType,
    MediaType,
    IngestDate,
}

impl LinkKey {
    fn slot(self, links: &mut RecordLinks) -> &mut Option<String> {
        match self {
            LinkKey::AssignedUser => &mut links.assigned_user,
            LinkKey::AssetType => &mut links.asset_type,
            LinkKey::FileType => &mut links.file_type,
            LinkKey::MediaType => &mut links.media_type,
            LinkKey::IngestDate => &mut links.ingest_date,
        }
    }

    fn name(self) -> &'static str {
        match self {
            LinkKey::AssignedUser => "assigned_user",
            LinkKey::AssetType => "asset_type",
            LinkKey::FileType => "file_type",
            LinkKey::MediaType => "media_type",
            LinkKey::IngestDate => "ingest_date",
        }
    }
}

fn target_named(name: &str) -> Option<Target> {
    let target = match name {
        "status" => Target::Status,
        "assigned_user" => Target::Link(LinkKey::AssignedUser),
        "asset_type" => Target::Link(LinkKey::AssetType),
        "file_type" => Target::Link(LinkKey::FileType),
        "media_type" => Target::Link(LinkKey::MediaType),
        "ingest_date" => Target::Link(LinkKey::IngestDate),
        _ => Target::Text(Field::from_name(name).ok()?),
    };
    Some(target)
}

/// Lookup columns may arrive with an `_id` suffix.
fn resolve_target(column: &str) -> Option<Target> {
    let lowered = column.trim().to_ascii_lowercase();
    if matches!(lowered.as_str(), "id" | "pk" | "uuid") {
        return Some(Target::Skip);
    }
    target_named(&lowered).or_else(|| lowered.strip_suffix("_id").and_then(target_named))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_id(row: &Map<String, Value>) -> Option<u64> {
    match row.get("id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Check every column name, every id and every status label before any
/// row is applied.
fn validate(sheets: &[Vec<Map<String, Value>>], store: &MemoryStore) -> Result<()> {
    let mut unknown_fields = BTreeSet::new();
    let mut missing_ids = BTreeSet::new();
    let mut unknown_statuses = BTreeSet::new();

    for row in sheets.iter().flatten() {
        match row_id(row) {
            Some(id) if store.get(id).is_some() => {}
            Some(id) => {
                missing_ids.insert(id.to_string());
            }
            None => {
                missing_ids.insert(row.get("id").map(cell_text).unwrap_or_default());
            }
        }
        for (column, value) in row {
            match resolve_target(column) {
                None => {
                    unknown_fields.insert(column.clone());
                }
                Some(Target::Status) => {
                    let label = cell_text(value);
                    if !label.trim().is_empty() && store.catalog().find_by_prefix(&label).is_none()
                    {
                        unknown_statuses.insert(label);
                    }
                }
                Some(_) => {}
            }
        }
    }

    if !unknown_fields.is_empty() {
        let names = unknown_fields.into_iter().collect::<Vec<_>>().join(", ");
        bail!("input validation failed: fields {names} do not exist in the record schema");
    }
    if !missing_ids.is_empty() {
        let ids = missing_ids.into_iter().collect::<Vec<_>>().join(", ");
        bail!("input validation failed: record ids {ids} do not exist in the store");
    }
    if !unknown_statuses.is_empty() {
        let labels = unknown_statuses.into_iter().collect::<Vec<_>>().join(", ");
        bail!("input validation failed: statuses {labels} do not exist in the catalog");
    }
    Ok(())
}

/// Apply one row. Returns a description per changed value.
fn update_row(
    record: &mut Record,
    row: &Map<String, Value>,
    catalog: &StatusCatalog,
) -> Result<(Vec<Change>, Vec<String>)> {
    let mut changes = Vec::new();
    let mut notes = Vec::new();

    for (column, value) in row {
        let target = resolve_target(column).ok_or_else(|| anyhow!("unknown field {column}"))?;
        let text = cell_text(value);
        match target {
            Target::Skip => {}
            Target::Text(field) => {
                let text = if field == Field::FileName && text.is_empty() {
                    NO_FILE_NAME.to_string()
                } else {
                    text
                };
                let current = record.get(field);
                if current != text {
                    notes.push(format!(
                        "record {} updated: {} changed from {:?} to {:?}",
                        record.id,
                        field.name(),
                        truncate_with_ellipsis(current, NOTE_VALUE_CHARS),
                        truncate_with_ellipsis(&text, NOTE_VALUE_CHARS)
                    ));
                    changes.push(Change::SetField {
                        id: record.id,
                        field,
                        value: text,
                    });
                }
            }
            Target::Link(key) => {
                let wanted = (!text.trim().is_empty()).then(|| text.trim().to_string());
                let slot = key.slot(&mut record.links);
                if *slot != wanted {
                    notes.push(format!(
                        "record {} updated: {} changed from {:?} to {:?}",
                        record.id,
                        key.name(),
                        slot.as_deref().unwrap_or_default(),
                        wanted.as_deref().unwrap_or_default()
                    ));
                    *slot = wanted;
                }
            }
            Target::Status => {
                if text.trim().is_empty() {
                    continue;
                }
                let status = catalog
                    .find_by_prefix(&text)
                    .ok_or_else(|| anyhow!("unknown status {text}"))?;
                if !record.status.contains(&status) {
                    notes.push(format!(
                        "record {} updated: added {} to status",
                        record.id,
                        catalog.label_of(status).unwrap_or(&text)
                    ));
                    changes.push(Change::AddStatus {
                        id: record.id,
                        status,
                    });
                }
            }
        }
    }
    Ok((changes, notes))
}

pub fn parse_input(raw: &str) -> Result<Vec<Vec<Map<String, Value>>>> {
    let input: UpdateInput = serde_json::from_str(raw)?;
    Ok(input.into_sheets())
}

pub fn run(input: &Path, dry_run: bool) -> Result<CommandReport> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let sheets = parse_input(&raw).with_context(|| format!("failed to parse {}", input.display()))?;

    let mut session = StoreSession::open()?;
    validate(&sheets, &session.store)?;

    let mut report = CommandReport::new("batch-update");
    let catalog = session.store.catalog().clone();
    let mut total_updated = 0usize;

    for (idx, sheet) in sheets.iter().enumerate() {
        let mut sheet_updated = 0usize;
        for row in sheet {
            let id = row_id(row).ok_or_else(|| anyhow!("row without a valid id"))?;
            let mut record = session
                .store
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow!("record #{id} disappeared during update"))?;
            let links_before = record.links.clone();
            let (changes, notes) = update_row(&mut record, row, &catalog)?;
            if changes.is_empty() && notes.is_empty() {
                report.detail(format!("no changes were made to record {id}"));
                continue;
            }
            apply_changes(&mut session.store, &changes)?;
            if record.links != links_before {
                session.store.set_links(id, record.links)?;
            }
            for note in notes {
                report.detail(note);
            }
            sheet_updated += 1;
        }
        report.detail(format!(
            "updated {sheet_updated} records from sheet {} of {}",
            idx + 1,
            sheets.len()
        ));
        total_updated += sheet_updated;
    }

    report.detail(format!("total_records_updated={total_updated}"));
    let summary = format!("updated {total_updated} records");
    session.finish(&mut report, dry_run, &summary)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new(StatusCatalog::seeded());
        store.insert(Record::new(0).with(Field::FileName, "a.mov"));
        store.insert(Record::new(0).with(Field::Title, "Reel"));
        store
    }

    fn row(raw: &str) -> Map<String, Value> {
        serde_json::from_str(raw).expect("row json")
    }

    #[test]
    fn single_sheet_and_multi_sheet_inputs_both_parse() {
        assert_eq!(parse_input(r#"[{"id": 1}]"#).expect("rows").len(), 1);
        assert_eq!(
            parse_input(r#"[[{"id": 1}], [{"id": 2}]]"#).expect("sheets").len(),
            2
        );
    }

    #[test]
    fn protected_and_suffixed_columns_resolve() {
        assert_eq!(resolve_target("uuid"), Some(Target::Skip));
        assert_eq!(resolve_target("ID"), Some(Target::Skip));
        assert_eq!(
            resolve_target("assigned_user_id"),
            Some(Target::Link(LinkKey::AssignedUser))
        );
        assert_eq!(resolve_target("title"), Some(Target::Text(Field::Title)));
        assert_eq!(
            resolve_target("hard_drive_barcode_id"),
            Some(Target::Text(Field::HardDriveBarcodeId))
        );
        assert_eq!(resolve_target("titel"), None);
    }

    #[test]
    fn validation_rejects_unknown_fields_and_ids_together() {
        let store = store();
        let sheets = vec![vec![row(r#"{"id": 1, "titel": "x"}"#)]];
        let err = validate(&sheets, &store).expect_err("unknown field");
        assert!(err.to_string().contains("titel"));

        let sheets = vec![vec![row(r#"{"id": 9, "title": "x"}"#)]];
        let err = validate(&sheets, &store).expect_err("unknown id");
        assert!(err.to_string().contains('9'));

        let sheets = vec![vec![row(r#"{"id": "2", "status": "needs"}"#)]];
        assert!(validate(&sheets, &store).is_ok());
    }

    #[test]
    fn empty_file_name_becomes_placeholder() {
        let store = store();
        let mut record = store.get(1).cloned().expect("record");
        let (changes, _) = update_row(
            &mut record,
            &row(r#"{"id": 1, "file_name": "", "uuid": "zzz"}"#),
            store.catalog(),
        )
        .expect("update");
        assert_eq!(
            changes,
            vec![Change::SetField {
                id: 1,
                field: Field::FileName,
                value: NO_FILE_NAME.to_string()
            }]
        );
        assert_eq!(record.links.uuid, None);
    }

    #[test]
    fn status_is_added_by_prefix_and_assigned_user_clears() {
        let store = store();
        let mut record = store.get(2).cloned().expect("record");
        record.links.assigned_user = Some("kim".into());
        let (changes, notes) = update_row(
            &mut record,
            &row(r#"{"id": 2, "status": "invalid v", "assigned_user": ""}"#),
            store.catalog(),
        )
        .expect("update");

        let vault = store
            .catalog()
            .require(crate::catalog::status::StatusTag::InvalidVault)
            .expect("seeded");
        assert_eq!(changes, vec![Change::AddStatus { id: 2, status: vault }]);
        assert_eq!(record.links.assigned_user, None);
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn unchanged_values_produce_nothing() {
        let store = store();
        let mut record = store.get(2).cloned().expect("record");
        let (changes, notes) = update_row(
            &mut record,
            &row(r#"{"id": 2, "title": "Reel"}"#),
            store.catalog(),
        )
        .expect("update");
        assert!(changes.is_empty());
        assert!(notes.is_empty());
    }
}
