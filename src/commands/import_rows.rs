use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::catalog::record::{Field, RELATIONAL_KEYS, Record, RecordLinks};
use crate::commands::{CommandReport, StoreSession};

/// Blank is the empty string; spreadsheet nulls collapse into it here.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn link_slot<'a>(links: &'a mut RecordLinks, key: &str) -> Option<&'a mut Option<String>> {
    match key {
        "assigned_user" => Some(&mut links.assigned_user),
        "asset_type" => Some(&mut links.asset_type),
        "file_type" => Some(&mut links.file_type),
        "media_type" => Some(&mut links.media_type),
        "ingest_date" => Some(&mut links.ingest_date),
        "uuid" => Some(&mut links.uuid),
        _ => None,
    }
}

fn row_to_record(row: &Map<String, Value>) -> Result<Record> {
    let mut record = Record::new(0);
    for (key, value) in row {
        let text = cell_text(value);
        if let Some(slot) = link_slot(&mut record.links, key) {
            *slot = (!text.is_empty()).then_some(text);
            continue;
        }
        // Ids and statuses are assigned by the store.
        if RELATIONAL_KEYS.contains(&key.as_str()) {
            continue;
        }
        record.set(Field::from_name(key)?, text);
    }
    Ok(record)
}

pub fn parse_rows(raw: &str) -> Result<Vec<Record>> {
    let rows: Vec<Map<String, Value>> = serde_json::from_str(raw)?;
    rows.iter()
        .enumerate()
        .map(|(idx, row)| row_to_record(row).with_context(|| format!("row {}", idx + 1)))
        .collect()
}

pub fn run(input: &Path) -> Result<CommandReport> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let records =
        parse_rows(&raw).with_context(|| format!("failed to import {}", input.display()))?;
    if records.is_empty() {
        bail!("{} contains no rows", input.display());
    }

    let mut session = StoreSession::open()?;
    let mut report = CommandReport::new("import-rows");
    let mut first_id = None;
    let mut last_id = 0;
    for record in records.iter().cloned() {
        let id = session.store.insert(record);
        first_id.get_or_insert(id);
        last_id = id;
    }

    report.detail(format!("imported {} records", records.len()));
    if let Some(first) = first_id {
        report.detail(format!("ids={first}..={last_id}"));
    }
    let summary = format!("imported {} records from {}", records.len(), input.display());
    session.finish(&mut report, false, &summary)?;
    Ok(report)
}
