use anyhow::Result;
use std::env;

use crate::catalog::config::{load_config, resolve_config_path};
use crate::catalog::file_store;
use crate::catalog::paths::resolve_paths;
use crate::catalog::status::StatusTag;
use crate::catalog::store::RecordStore;
use crate::commands::CommandReport;
use crate::env_loader::unknown_labcat_keys;

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build={}", env!("BUILD_UUID")));
    report.detail(format!("labcat_home={}", paths.labcat_home.display()));
    report.detail(format!("store_file={}", paths.store_file.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("reports_dir={}", paths.reports_dir.display()));
    match resolve_config_path() {
        Some(path) if path.exists() => report.detail(format!("config_file={}", path.display())),
        Some(path) => report.detail(format!("config_file={} (absent, defaults)", path.display())),
        None => report.detail("config_file=<unresolved> (defaults)"),
    }

    match load_config() {
        Ok(cfg) => {
            report.detail(format!("header_value={:?}", cfg.cleanup.header_value));
            report.detail(format!(
                "digital_lab_location={:?}",
                cfg.cleanup.digital_lab_location
            ));
            report.detail(format!(
                "inventory_false_positives={}",
                cfg.inventory.false_positives.join(",")
            ));
            report.detail(format!("hard_drive_location={}", cfg.hard_drive.location));
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    // Read-only: no lock, the store may be mid-run elsewhere.
    match file_store::load(&paths.store_file) {
        Ok(store) => {
            report.detail(format!("records={}", store.len()));
            report.detail(format!("next_id={}", store.next_id()));
            report.detail(format!("statuses={}", store.catalog().len()));
            for tag in StatusTag::ALL {
                if let Err(err) = store.catalog().require(tag) {
                    report.issue(err.to_string());
                }
            }
        }
        Err(err) => report.issue(format!("store unreadable: {err:#}")),
    }

    let unknown = unknown_labcat_keys(env::vars_os().filter_map(|(key, _)| key.into_string().ok()));
    for key in unknown {
        report.issue(format!("unknown environment variable {key}"));
    }

    Ok(report)
}
