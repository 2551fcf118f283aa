use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::config::load_config;
use crate::catalog::inventory::{ExtractedInventory, plan_inventory_extraction};
use crate::catalog::store::{RecordStore, apply_changes};
use crate::catalog::util::report_timestamp;
use crate::commands::{CommandReport, StoreSession};

fn summary_file_name(dry_run: bool, stamp: &str) -> String {
    let prefix = if dry_run { "DRY_RUN_" } else { "" };
    format!("{prefix}extract_inventory_{stamp}.json")
}

fn write_summary(
    reports_dir: &Path,
    dry_run: bool,
    extracted: &[ExtractedInventory],
) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("failed to create {}", reports_dir.display()))?;
    let path = reports_dir.join(summary_file_name(dry_run, &report_timestamp()));
    let data = serde_json::to_string_pretty(extracted)?;
    fs::write(&path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn run(dry_run: bool) -> Result<CommandReport> {
    let cfg = load_config()?;
    let mut session = StoreSession::open()?;
    let mut report = CommandReport::new("extract-inventory");

    let plan = plan_inventory_extraction(
        &session.store.records(),
        &cfg.inventory.false_positives,
    );
    if !dry_run {
        apply_changes(&mut session.store, &plan.changes)?;
    }

    report.detail(format!("candidates={}", plan.candidates));
    report.detail(format!("extracted={}", plan.extracted.len()));
    report.detail(format!(
        "skipped={}",
        plan.candidates - plan.extracted.len()
    ));
    let summary_path = write_summary(&session.paths.reports_dir, dry_run, &plan.extracted)?;
    report.detail(format!("summary={}", summary_path.display()));

    let summary = format!(
        "extracted {} of {} candidates",
        plan.extracted.len(),
        plan.candidates
    );
    session.finish(&mut report, dry_run, &summary)?;
    Ok(report)
}
