use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::record::{Field, Record};
use crate::catalog::status::{StatusCatalog, StatusId, StatusTag};
use crate::catalog::status_info::classify;
use crate::catalog::store::{Change, RecordStore, apply_changes};
use crate::catalog::util::report_timestamp;
use crate::commands::{CommandReport, StoreSession};

const FOLDER_COLUMN: &str = "File Folder Name";
const SUB_FOLDER_COLUMN: &str = "Sub Folder";
const FILE_COLUMN: &str = "File Name";
const INVENTORY_COLUMN: &str = "Inventory_no";
const STATUS_COLUMN: &str = "Requires Manual Intervention";

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportStatusOptions {
    pub inventory_numbers: bool,
    pub status_info: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StatusRow {
    pub file_folder_name: String,
    pub sub_folder_name: String,
    pub file_name: String,
    pub inventory_no: Option<String>,
    pub status_info: Option<String>,
}

impl StatusRow {
    fn key(&self) -> (String, String, String) {
        (
            self.file_folder_name.trim().to_string(),
            self.sub_folder_name.trim().to_string(),
            self.file_name.trim().to_string(),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChangedInventory {
    id: u64,
    file_folder_name: String,
    sub_folder_name: String,
    file_name: String,
    before: String,
    after: String,
}

#[derive(Debug, Default, Serialize)]
struct ImportStatusReport {
    multiple_matches: Vec<StatusRow>,
    no_matches: Vec<StatusRow>,
    changed_inventory_numbers: Vec<ChangedInventory>,
}

fn optional_cell(row: &Map<String, Value>, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn path_cell(row: &Map<String, Value>, column: &str) -> String {
    optional_cell(row, column).unwrap_or_default()
}

pub fn parse_rows(raw: &str) -> Result<Vec<StatusRow>> {
    let rows: Vec<Map<String, Value>> = serde_json::from_str(raw)?;
    Ok(rows
        .iter()
        .map(|row| StatusRow {
            file_folder_name: path_cell(row, FOLDER_COLUMN),
            sub_folder_name: path_cell(row, SUB_FOLDER_COLUMN),
            file_name: path_cell(row, FILE_COLUMN),
            inventory_no: optional_cell(row, INVENTORY_COLUMN),
            status_info: optional_cell(row, STATUS_COLUMN),
        })
        .collect())
}

/// Drop exact duplicates, then rows that carry none of the selected columns.
/// Returns the kept rows plus how many of each kind were dropped.
fn select_rows(rows: Vec<StatusRow>, opts: &ImportStatusOptions) -> (Vec<StatusRow>, usize, usize) {
    let mut seen = BTreeSet::new();
    let mut duplicates = 0usize;
    let mut missing = 0usize;
    let mut kept = Vec::new();
    for row in rows {
        if !seen.insert(row.clone()) {
            duplicates += 1;
            continue;
        }
        let has_inventory = opts.inventory_numbers && row.inventory_no.is_some();
        let has_status = opts.status_info && row.status_info.is_some();
        if !has_inventory && !has_status {
            missing += 1;
            continue;
        }
        kept.push(row);
    }
    (kept, duplicates, missing)
}

fn resolve_status_ids(catalog: &StatusCatalog) -> Result<BTreeMap<StatusTag, StatusId>> {
    let mut ids = BTreeMap::new();
    for tag in StatusTag::ALL {
        if tag == StatusTag::NeedsReview {
            continue;
        }
        ids.insert(tag, catalog.require(tag)?);
    }
    Ok(ids)
}

fn path_index(records: &[Record]) -> BTreeMap<(String, String, String), Vec<u64>> {
    let mut index: BTreeMap<_, Vec<u64>> = BTreeMap::new();
    for record in records {
        let key = (
            record.get(Field::FileFolderName).to_string(),
            record.get(Field::SubFolderName).to_string(),
            record.get(Field::FileName).to_string(),
        );
        index.entry(key).or_default().push(record.id);
    }
    index
}

fn replace_status_changes(record: &Record, wanted: &BTreeSet<StatusId>) -> Vec<Change> {
    let mut changes = record
        .status
        .difference(wanted)
        .map(|status| Change::RemoveStatus {
            id: record.id,
            status: *status,
        })
        .collect::<Vec<_>>();
    changes.extend(wanted.difference(&record.status).map(|status| Change::AddStatus {
        id: record.id,
        status: *status,
    }));
    changes
}

fn write_report(reports_dir: &Path, dry_run: bool, body: &ImportStatusReport) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("failed to create {}", reports_dir.display()))?;
    let prefix = if dry_run { "DRY_RUN_" } else { "" };
    let path = reports_dir.join(format!("{prefix}import_status_{}.json", report_timestamp()));
    fs::write(&path, format!("{}\n", serde_json::to_string_pretty(body)?))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn run(input: &Path, opts: &ImportStatusOptions) -> Result<CommandReport> {
    if !opts.inventory_numbers && !opts.status_info {
        bail!("at least one of --inventory-numbers or --status-info must be used");
    }
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let rows = parse_rows(&raw).with_context(|| format!("failed to parse {}", input.display()))?;
    let total_rows = rows.len();

    let mut session = StoreSession::open()?;
    let status_ids = if opts.status_info {
        resolve_status_ids(session.store.catalog())?
    } else {
        BTreeMap::new()
    };

    let mut report = CommandReport::new("import-status");
    let (rows, duplicates, missing) = select_rows(rows, opts);
    report.detail(format!("rows={total_rows}"));
    report.detail(format!("dropped_duplicates={duplicates}"));
    report.detail(format!("dropped_missing_values={missing}"));

    let index = path_index(&session.store.records());
    let mut body = ImportStatusReport::default();
    let mut updated = 0usize;

    for row in rows {
        let ids = index.get(&row.key()).map(Vec::as_slice).unwrap_or_default();
        let [id] = ids else {
            if ids.is_empty() {
                body.no_matches.push(row);
            } else {
                body.multiple_matches.push(row);
            }
            continue;
        };
        let Some(record) = session.store.get(*id).cloned() else {
            body.no_matches.push(row);
            continue;
        };

        let mut changes = Vec::new();
        if opts.inventory_numbers {
            let after = row.inventory_no.as_deref().unwrap_or_default().trim().to_string();
            let before = record.get(Field::InventoryNumber);
            if !before.is_empty() && before != after {
                body.changed_inventory_numbers.push(ChangedInventory {
                    id: record.id,
                    file_folder_name: record.get(Field::FileFolderName).to_string(),
                    sub_folder_name: record.get(Field::SubFolderName).to_string(),
                    file_name: record.get(Field::FileName).to_string(),
                    before: before.to_string(),
                    after: after.clone(),
                });
            }
            if before != after {
                changes.push(Change::SetField {
                    id: record.id,
                    field: Field::InventoryNumber,
                    value: after,
                });
            }
        }
        if opts.status_info {
            let wanted = classify(row.status_info.as_deref().unwrap_or_default())
                .into_iter()
                .filter_map(|tag| status_ids.get(&tag).copied())
                .collect::<BTreeSet<_>>();
            changes.extend(replace_status_changes(&record, &wanted));
        }
        apply_changes(&mut session.store, &changes)?;
        updated += 1;
    }

    report.detail(format!("records_updated={updated}"));
    report.detail(format!("multiple_matches={}", body.multiple_matches.len()));
    report.detail(format!("no_matches={}", body.no_matches.len()));
    if opts.inventory_numbers {
        report.detail(format!(
            "changed_inventory_numbers={}",
            body.changed_inventory_numbers.len()
        ));
        for changed in &body.changed_inventory_numbers {
            report.detail(format!(
                "inventory #{}: {} -> {}",
                changed.id, changed.before, changed.after
            ));
        }
    }
    let report_path = write_report(&session.paths.reports_dir, opts.dry_run, &body)?;
    report.detail(format!("report={}", report_path.display()));

    let summary = format!(
        "updated={updated} multiple={} none={}",
        body.multiple_matches.len(),
        body.no_matches.len()
    );
    session.finish(&mut report, opts.dry_run, &summary)?;
    Ok(report)
}
