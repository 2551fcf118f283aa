pub mod batch_update;
pub mod clean;
pub mod clean_tape_info;
pub mod extract_inventory;
pub mod import_rows;
pub mod import_status;
pub mod set_hard_drive_location;
pub mod set_status;
pub mod status;

use anyhow::Result;
use serde::Serialize;

use crate::catalog::audit;
use crate::catalog::file_store::{self, StoreLock};
use crate::catalog::paths::{CatalogPaths, resolve_paths};
use crate::catalog::store::MemoryStore;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// An opened record store plus the lock that keeps other runs out until
/// the command is done with it.
pub struct StoreSession {
    pub paths: CatalogPaths,
    pub store: MemoryStore,
    _lock: StoreLock,
}

impl StoreSession {
    pub fn open() -> Result<Self> {
        let paths = resolve_paths()?;
        let lock = StoreLock::acquire(&paths.store_file)?;
        let store = file_store::load(&paths.store_file)?;
        Ok(Self {
            paths,
            store,
            _lock: lock,
        })
    }

    /// Persist the store unless this is a dry run, then append the audit
    /// event for the command.
    pub fn finish(&self, report: &mut CommandReport, dry_run: bool, summary: &str) -> Result<()> {
        if dry_run {
            report.detail("dry run: store left unchanged");
        } else {
            let written = file_store::save(&self.paths.store_file, &self.store)?;
            report.detail(format!("store={}", written.display()));
        }
        let status = if dry_run { "dry-run" } else { "ok" };
        audit::append_event(&self.paths, &report.command, status, summary)
    }
}

/// Audit a command that errored out before producing a report.
pub fn audit_failure(command: &str, err: &anyhow::Error) {
    let Ok(paths) = resolve_paths() else {
        return;
    };
    let _ = audit::append_event(&paths, command, "failed", &format!("{err:#}"));
}
