use anyhow::{Result, bail};

use crate::catalog::config::load_config;
use crate::catalog::pipeline::{self, Pass};
use crate::commands::{CommandReport, StoreSession};

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub dry_run: bool,
    pub only: Vec<String>,
}

fn selected_passes(only: &[String]) -> Result<Vec<Pass>> {
    if only.is_empty() {
        return Ok(Pass::ORDER.to_vec());
    }
    let mut passes = Vec::with_capacity(only.len());
    for raw in only {
        let Some(pass) = Pass::from_name(raw) else {
            let known = Pass::ORDER.map(Pass::name).join(", ");
            bail!("unknown pass `{raw}` (expected one of: {known})");
        };
        passes.push(pass);
    }
    Ok(passes)
}

pub fn run(opts: &CleanOptions) -> Result<CommandReport> {
    let passes = selected_passes(&opts.only)?;
    let cfg = load_config()?;
    let mut session = StoreSession::open()?;
    let mut report = CommandReport::new("clean");

    let rules = cfg.reconcile_rules();
    let outcome = if opts.only.is_empty() {
        pipeline::run_cleanup(&mut session.store, &rules, opts.dry_run)?
    } else {
        pipeline::run_passes(&mut session.store, &passes, &rules, opts.dry_run)?
    };

    for count in &outcome.counts {
        report.detail(format!(
            "{}: {} {} records",
            count.pass.name(),
            count.pass.verb(),
            count.count
        ));
    }
    report.detail(format!(
        "records_before={} records_after={}",
        outcome.records_before, outcome.records_after
    ));
    if let Some(flagged) = outcome.count(Pass::FlagInlineNotes).filter(|n| *n > 0) {
        report.detail(format!("{flagged} records now need review"));
    }

    let summary = format!(
        "{} changes across {} passes",
        outcome.total_changes(),
        outcome.counts.len()
    );
    session.finish(&mut report, opts.dry_run, &summary)?;
    Ok(report)
}
