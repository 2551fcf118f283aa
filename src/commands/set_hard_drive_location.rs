use anyhow::Result;

use crate::catalog::config::load_config;
use crate::catalog::record::Field;
use crate::catalog::status::StatusTag;
use crate::catalog::store::{Change, RecordStore, apply_changes, touched_records};
use crate::commands::{CommandReport, StoreSession};
use crate::error::CatalogError;

pub struct HardDrivePlan {
    pub located: usize,
    pub cleared_invalid_vault: usize,
    pub changes: Vec<Change>,
}

/// Every record on a named hard drive lives at `location`, so it no longer
/// counts as having an invalid vault.
pub fn plan_hard_drive_location(
    store: &dyn RecordStore,
    location: &str,
) -> Result<HardDrivePlan, CatalogError> {
    let invalid_vault = store.catalog().require(StatusTag::InvalidVault)?;
    let mut plan = HardDrivePlan {
        located: 0,
        cleared_invalid_vault: 0,
        changes: Vec::new(),
    };
    for record in store.filter(&|record| !record.is_blank(Field::HardDriveName)) {
        plan.located += 1;
        if record.get(Field::HardDriveLocation) != location {
            plan.changes.push(Change::SetField {
                id: record.id,
                field: Field::HardDriveLocation,
                value: location.to_string(),
            });
        }
        if record.status.contains(&invalid_vault) {
            plan.cleared_invalid_vault += 1;
            plan.changes.push(Change::RemoveStatus {
                id: record.id,
                status: invalid_vault,
            });
        }
    }
    Ok(plan)
}

pub fn run(dry_run: bool) -> Result<CommandReport> {
    let cfg = load_config()?;
    let mut session = StoreSession::open()?;
    let mut report = CommandReport::new("set-hard-drive-location");

    let plan = plan_hard_drive_location(&session.store, &cfg.hard_drive.location)?;
    if !dry_run {
        apply_changes(&mut session.store, &plan.changes)?;
    }

    report.detail(format!(
        "{} records with a hard drive name; {} changed",
        plan.located,
        touched_records(&plan.changes)
    ));
    report.detail(format!("hard_drive_location={}", cfg.hard_drive.location));
    report.detail(format!(
        "removed \"Invalid vault\" from {} records",
        plan.cleared_invalid_vault
    ));
    let summary = format!(
        "located={} cleared_invalid_vault={}",
        plan.located, plan.cleared_invalid_vault
    );
    session.finish(&mut report, dry_run, &summary)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::Record;
    use crate::catalog::status::StatusCatalog;
    use crate::catalog::store::MemoryStore;

    #[test]
    fn named_drives_get_location_and_lose_invalid_vault() {
        let catalog = StatusCatalog::seeded();
        let vault = catalog.require(StatusTag::InvalidVault).expect("seeded");
        let mut flagged = Record::new(2).with(Field::HardDriveName, "Digital Lab 1");
        flagged.status.insert(vault);
        let mut store = MemoryStore::from_records(
            catalog,
            vec![
                Record::new(1).with(Field::HardDriveName, "Digital Lab 1"),
                flagged,
                Record::new(3).with(Field::Title, "no drive"),
            ],
        );

        let plan = plan_hard_drive_location(&store, "217").expect("plan");
        assert_eq!(plan.located, 2);
        assert_eq!(plan.cleared_invalid_vault, 1);
        apply_changes(&mut store, &plan.changes).expect("apply");

        assert_eq!(store.get(1).expect("1").get(Field::HardDriveLocation), "217");
        assert!(store.get(2).expect("2").status.is_empty());
        assert!(store.get(3).expect("3").is_blank(Field::HardDriveLocation));

        let again = plan_hard_drive_location(&store, "217").expect("plan");
        assert!(again.changes.is_empty());
    }
}
