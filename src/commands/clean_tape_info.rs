use anyhow::Result;

use crate::catalog::store::{RecordStore, apply_changes};
use crate::catalog::tape_info::{Carrier, plan_carrier_cleanup};
use crate::catalog::warn::{self, WarnEvent};
use crate::commands::{CommandReport, StoreSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeInfoMode {
    UpdateRecords,
    ReportProblems,
}

fn carrier_label(carrier: Carrier) -> &'static str {
    match carrier {
        Carrier::A => "Carrier A",
        Carrier::B => "Carrier B",
    }
}

pub fn run(mode: TapeInfoMode, dry_run: bool) -> Result<CommandReport> {
    let mut session = StoreSession::open()?;
    let mut report = CommandReport::new("clean-tape-info");
    let mut total_updated = 0usize;
    let mut total_unparsed = 0usize;

    // Carrier A is fully written before carrier B is planned.
    for carrier in Carrier::ALL {
        let plan = plan_carrier_cleanup(&session.store.records(), carrier);
        total_unparsed += plan.unparsed.len();

        match mode {
            TapeInfoMode::UpdateRecords => {
                apply_changes(&mut session.store, &plan.changes)?;
                total_updated += plan.updated;
                report.detail(format!(
                    "{}: updated {} records",
                    carrier.field().name(),
                    plan.updated
                ));
                for skipped in &plan.unparsed {
                    warn::emit(WarnEvent {
                        code: "TAPE_INFO_UNPARSED",
                        stage: "clean-tape-info",
                        action: "skip",
                        record: skipped.id,
                        field: carrier.field().name(),
                        reason: "unsupported-format",
                        value: &skipped.text,
                    });
                }
            }
            TapeInfoMode::ReportProblems => {
                report.detail(format!(
                    "{}: {} unsupported values",
                    carrier.field().name(),
                    plan.unparsed.len()
                ));
                for skipped in &plan.unparsed {
                    report.issue(format!(
                        "{} unsupported format: #{}: {}",
                        carrier_label(carrier),
                        skipped.id,
                        skipped.text
                    ));
                    warn::emit(WarnEvent {
                        code: "TAPE_INFO_UNPARSED",
                        stage: "clean-tape-info",
                        action: "report",
                        record: skipped.id,
                        field: carrier.field().name(),
                        reason: "unsupported-format",
                        value: &skipped.text,
                    });
                }
            }
        }
    }

    let writes = mode == TapeInfoMode::UpdateRecords && !dry_run;
    let summary = format!("updated={total_updated} unparsed={total_unparsed}");
    session.finish(&mut report, !writes, &summary)?;
    Ok(report)
}
