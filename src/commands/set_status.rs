use anyhow::Result;

use crate::catalog::record::{Field, Record};
use crate::catalog::status::StatusTag;
use crate::catalog::store::{Change, RecordStore, apply_changes};
use crate::commands::{CommandReport, StoreSession};
use crate::error::CatalogError;

/// Which blank-data condition earns which status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    EmptyInventoryNumber,
    EmptyLocation,
}

impl StatusRule {
    fn command(self) -> &'static str {
        match self {
            StatusRule::EmptyInventoryNumber => "set-empty-inv-no-status",
            StatusRule::EmptyLocation => "set-empty-location-status",
        }
    }

    fn tag(self) -> StatusTag {
        match self {
            StatusRule::EmptyInventoryNumber => StatusTag::InvalidInvNo,
            StatusRule::EmptyLocation => StatusTag::InvalidVault,
        }
    }

    fn matches(self, record: &Record) -> bool {
        match self {
            StatusRule::EmptyInventoryNumber => record.is_blank(Field::InventoryNumber),
            StatusRule::EmptyLocation => [
                Field::HardDriveLocation,
                Field::CarrierALocation,
                Field::CarrierBLocation,
            ]
            .iter()
            .all(|field| record.is_blank(*field)),
        }
    }
}

pub struct StatusPlan {
    pub matched: usize,
    pub changes: Vec<Change>,
}

pub fn plan_status_rule(store: &dyn RecordStore, rule: StatusRule) -> Result<StatusPlan, CatalogError> {
    let status = store.catalog().require(rule.tag())?;
    let matched = store.filter(&|record| rule.matches(record));
    let changes = matched
        .iter()
        .filter(|record| !record.status.contains(&status))
        .map(|record| Change::AddStatus {
            id: record.id,
            status,
        })
        .collect();
    Ok(StatusPlan {
        matched: matched.len(),
        changes,
    })
}

pub fn run(rule: StatusRule, dry_run: bool) -> Result<CommandReport> {
    let mut session = StoreSession::open()?;
    let mut report = CommandReport::new(rule.command());

    let plan = plan_status_rule(&session.store, rule)?;
    if !dry_run {
        apply_changes(&mut session.store, &plan.changes)?;
    }

    report.detail(format!("matched {} records", plan.matched));
    report.detail(format!(
        "added {:?} to {} records",
        rule.tag().label(),
        plan.changes.len()
    ));
    let summary = format!("{} of {} records flagged", plan.changes.len(), plan.matched);
    session.finish(&mut report, dry_run, &summary)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::status::{StatusCatalog, StatusEntry};
    use crate::catalog::store::MemoryStore;

    fn store() -> MemoryStore {
        let catalog = StatusCatalog::seeded();
        let vault = catalog.require(StatusTag::InvalidVault).expect("seeded");
        let mut flagged = Record::new(3).with(Field::Title, "already");
        flagged.status.insert(vault);
        MemoryStore::from_records(
            catalog,
            vec![
                Record::new(1).with(Field::InventoryNumber, "M1"),
                Record::new(2).with(Field::CarrierALocation, "S217-01A-11A"),
                flagged,
            ],
        )
    }

    #[test]
    fn empty_inventory_numbers_are_flagged_once() {
        let mut store = store();
        let plan = plan_status_rule(&store, StatusRule::EmptyInventoryNumber).expect("plan");
        assert_eq!(plan.matched, 2);
        assert_eq!(plan.changes.len(), 2);

        apply_changes(&mut store, &plan.changes).expect("apply");
        let again = plan_status_rule(&store, StatusRule::EmptyInventoryNumber).expect("plan");
        assert!(again.changes.is_empty());
    }

    #[test]
    fn empty_location_skips_records_already_flagged() {
        let store = store();
        let plan = plan_status_rule(&store, StatusRule::EmptyLocation).expect("plan");
        assert_eq!(plan.matched, 2);
        let ids = plan.changes.iter().map(Change::record_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn missing_status_aborts() {
        let store = MemoryStore::from_records(
            StatusCatalog::from_entries(&[StatusEntry {
                id: crate::catalog::status::StatusId(1),
                status: "Needs review".into(),
            }]),
            vec![Record::new(1)],
        );
        let err = plan_status_rule(&store, StatusRule::EmptyLocation)
            .err()
            .expect("missing");
        assert_eq!(err, CatalogError::MissingStatus("Invalid vault".into()));
    }
}
