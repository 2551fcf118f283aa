use crate::catalog::reconcile::{self, ReconcileRules};
use crate::catalog::record::Record;
use crate::catalog::status::{StatusCatalog, StatusTag};
use crate::catalog::store::{Change, MemoryStore, RecordStore, apply_changes, touched_records};
use crate::error::CatalogError;
use serde::Serialize;

/// Cleanup passes in the only order they may run: B-D read header rows that
/// E deletes, F relies on B having absorbed device-only rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    DeleteEmpty,
    PropagateDriveName,
    PropagateFolderName,
    PropagateCarrierInfo,
    DeleteHeaders,
    DeleteHardDriveOnly,
    FlagInlineNotes,
}

impl Pass {
    pub const ORDER: [Pass; 7] = [
        Pass::DeleteEmpty,
        Pass::PropagateDriveName,
        Pass::PropagateFolderName,
        Pass::PropagateCarrierInfo,
        Pass::DeleteHeaders,
        Pass::DeleteHardDriveOnly,
        Pass::FlagInlineNotes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pass::DeleteEmpty => "delete-empty",
            Pass::PropagateDriveName => "propagate-drive-name",
            Pass::PropagateFolderName => "propagate-folder-name",
            Pass::PropagateCarrierInfo => "propagate-carrier-info",
            Pass::DeleteHeaders => "delete-headers",
            Pass::DeleteHardDriveOnly => "delete-hard-drive-only",
            Pass::FlagInlineNotes => "flag-inline-notes",
        }
    }

    pub fn from_name(raw: &str) -> Option<Pass> {
        let wanted = raw.trim().to_ascii_lowercase().replace('_', "-");
        Pass::ORDER.into_iter().find(|pass| pass.name() == wanted)
    }

    /// What the count for this pass measures.
    pub fn verb(self) -> &'static str {
        match self {
            Pass::DeleteEmpty | Pass::DeleteHeaders | Pass::DeleteHardDriveOnly => "deleted",
            Pass::PropagateDriveName
            | Pass::PropagateFolderName
            | Pass::PropagateCarrierInfo
            | Pass::FlagInlineNotes => "updated",
        }
    }
}

/// Decide what `pass` would change over `records` (ascending id order).
pub fn plan_pass(
    pass: Pass,
    records: &[Record],
    rules: &ReconcileRules,
    catalog: &StatusCatalog,
) -> Result<Vec<Change>, CatalogError> {
    let changes = match pass {
        Pass::DeleteEmpty => reconcile::plan_delete_empty(records),
        Pass::PropagateDriveName => reconcile::plan_drive_name_propagation(records, rules),
        Pass::PropagateFolderName => reconcile::plan_folder_name_propagation(records, rules),
        Pass::PropagateCarrierInfo => reconcile::plan_carrier_propagation(records, rules),
        Pass::DeleteHeaders => reconcile::plan_delete_headers(records, rules),
        Pass::DeleteHardDriveOnly => reconcile::plan_delete_hard_drive_only(records),
        Pass::FlagInlineNotes => {
            let needs_review = catalog.require(StatusTag::NeedsReview)?;
            reconcile::plan_flag_inline_notes(records, needs_review)
        }
    };
    Ok(changes)
}

/// Run one pass against `store`. Returns the number of records it changed
/// (or would change, when `dry_run`).
pub fn run_pass(
    store: &mut dyn RecordStore,
    pass: Pass,
    rules: &ReconcileRules,
    dry_run: bool,
) -> Result<usize, CatalogError> {
    let changes = plan_pass(pass, &store.records(), rules, store.catalog())?;
    if !dry_run {
        apply_changes(store, &changes)?;
    }
    Ok(touched_records(&changes))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassCount {
    pub pass: Pass,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    pub dry_run: bool,
    pub records_before: usize,
    pub records_after: usize,
    pub counts: Vec<PassCount>,
}

impl CleanupOutcome {
    pub fn count(&self, pass: Pass) -> Option<usize> {
        self.counts
            .iter()
            .find(|c| c.pass == pass)
            .map(|c| c.count)
    }

    pub fn total_changes(&self) -> usize {
        self.counts.iter().map(|c| c.count).sum()
    }
}

/// Run passes A-G in order.
///
/// A dry run works on a scratch copy, so each pass still sees the earlier
/// passes' results and reports the same counts a real run would.
pub fn run_cleanup(
    store: &mut dyn RecordStore,
    rules: &ReconcileRules,
    dry_run: bool,
) -> Result<CleanupOutcome, CatalogError> {
    run_passes(store, &Pass::ORDER, rules, dry_run)
}

/// Run a subset of passes, still in canonical order.
pub fn run_passes(
    store: &mut dyn RecordStore,
    passes: &[Pass],
    rules: &ReconcileRules,
    dry_run: bool,
) -> Result<CleanupOutcome, CatalogError> {
    // Fail before touching anything if the catalog is incomplete.
    if passes.contains(&Pass::FlagInlineNotes) {
        store.catalog().require(StatusTag::NeedsReview)?;
    }

    let mut scratch;
    let target: &mut dyn RecordStore = if dry_run {
        scratch = MemoryStore::from_records(store.catalog().clone(), store.records());
        &mut scratch
    } else {
        store
    };

    let records_before = target.records().len();
    let mut counts = Vec::with_capacity(passes.len());
    for pass in Pass::ORDER.into_iter().filter(|p| passes.contains(p)) {
        let count = run_pass(target, pass, rules, false)?;
        counts.push(PassCount { pass, count });
    }

    Ok(CleanupOutcome {
        dry_run,
        records_before,
        records_after: target.records().len(),
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::reconcile::fixtures::{file, tape_block, two_device_sheet};
    use crate::catalog::record::Field;
    use crate::catalog::status::StatusEntry;

    fn sheet_store() -> MemoryStore {
        MemoryStore::from_records(StatusCatalog::seeded(), two_device_sheet())
    }

    #[test]
    fn full_run_reports_each_pass_in_order() {
        let mut store = sheet_store();
        let out = run_cleanup(&mut store, &ReconcileRules::default(), false).expect("run");

        let counts = out.counts.iter().map(|c| c.count).collect::<Vec<_>>();
        assert_eq!(counts, vec![1, 5, 3, 0, 2, 2, 0]);
        assert_eq!(out.records_before, 10);
        assert_eq!(out.records_after, 5);
        assert_eq!(store.len(), 5);

        let remaining = store.records();
        assert!(remaining.iter().all(|r| !r.is_blank(Field::HardDriveName)));
        assert!(remaining.iter().all(|r| !r.is_blank(Field::FileFolderName)));
        assert_eq!(
            remaining.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![3, 4, 6, 9, 10]
        );
    }

    #[test]
    fn dry_run_counts_match_but_store_is_untouched() {
        let mut store = sheet_store();
        let before = store.records();
        let dry = run_cleanup(&mut store, &ReconcileRules::default(), true).expect("dry");
        assert_eq!(store.records(), before);

        let real = run_cleanup(&mut store, &ReconcileRules::default(), false).expect("real");
        assert_eq!(dry.counts, real.counts);
        assert!(dry.dry_run);
        assert!(!real.dry_run);
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut store = sheet_store();
        store.insert(file(0, "Reel [check]", "c.mov"));
        let first = run_cleanup(&mut store, &ReconcileRules::default(), false).expect("first");
        assert_eq!(first.count(Pass::FlagInlineNotes), Some(1));

        let second = run_cleanup(&mut store, &ReconcileRules::default(), false).expect("second");
        assert_eq!(second.total_changes(), 0);
        for pass in Pass::ORDER {
            assert_eq!(second.count(pass), Some(0), "{} not idempotent", pass.name());
        }
    }

    fn counts(out: &CleanupOutcome) -> Vec<usize> {
        out.counts.iter().map(|c| c.count).collect()
    }

    #[test]
    fn tape_block_fills_carriers_then_settles() {
        let mut store = MemoryStore::from_records(StatusCatalog::seeded(), tape_block(1));
        let rules = ReconcileRules::default();

        let first = run_cleanup(&mut store, &rules, false).expect("first");
        assert_eq!(counts(&first), vec![0, 0, 3, 3, 1, 0, 1]);

        let rows = store.records();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        let carriers = rows
            .iter()
            .map(|r| (r.get(Field::CarrierA), r.get(Field::CarrierB)))
            .collect::<Vec<_>>();
        assert_eq!(
            carriers,
            vec![
                ("AAB963", "AAB964"),
                ("AAB963", "AAB964"),
                ("AAB970", "AAB964"),
                ("AAB963", "AAB964"),
            ]
        );
        assert!(rows.iter().all(|r| r.get(Field::FileFolderName) == "TapeFolder"));
        let review = store.catalog().require(StatusTag::NeedsReview).expect("seeded");
        assert!(store.get(5).expect("note row").status.contains(&review));

        let second = run_cleanup(&mut store, &rules, false).expect("second");
        assert_eq!(counts(&second), vec![0; 7]);
    }

    #[test]
    fn carrier_header_is_a_third_header_to_delete() {
        let mut records = two_device_sheet();
        records.extend(tape_block(11));
        let mut store = MemoryStore::from_records(StatusCatalog::seeded(), records);

        let out = run_cleanup(&mut store, &ReconcileRules::default(), false).expect("run");
        assert_eq!(counts(&out), vec![1, 5, 6, 3, 3, 2, 1]);
        assert!(
            store
                .records()
                .iter()
                .filter(|r| r.id > 11)
                .all(|r| r.is_blank(Field::HardDriveName))
        );
    }

    #[test]
    fn every_single_pass_is_idempotent() {
        let fixtures = [two_device_sheet(), tape_block(1)];
        for pass in Pass::ORDER {
            for records in &fixtures {
                let mut store =
                    MemoryStore::from_records(StatusCatalog::seeded(), records.clone());
                let rules = ReconcileRules::default();
                run_pass(&mut store, pass, &rules, false).expect("first");
                let again = run_pass(&mut store, pass, &rules, false).expect("second");
                assert_eq!(again, 0, "{} changed records twice", pass.name());
            }
        }

        let mut tape = MemoryStore::from_records(StatusCatalog::seeded(), tape_block(1));
        let rules = ReconcileRules::default();
        let filled =
            run_pass(&mut tape, Pass::PropagateCarrierInfo, &rules, false).expect("carrier pass");
        assert_eq!(filled, 3);
    }

    #[test]
    fn missing_review_status_aborts_before_any_change() {
        let catalog = StatusCatalog::from_entries(&[StatusEntry {
            id: crate::catalog::status::StatusId(1),
            status: "Invalid vault".into(),
        }]);
        let mut store = MemoryStore::from_records(catalog, two_device_sheet());
        let err = run_cleanup(&mut store, &ReconcileRules::default(), false).expect_err("fatal");
        assert_eq!(err, CatalogError::MissingStatus("Needs review".into()));
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn subset_runs_keep_canonical_order() {
        let mut store = sheet_store();
        let out = run_passes(
            &mut store,
            &[Pass::DeleteHeaders, Pass::PropagateDriveName],
            &ReconcileRules::default(),
            true,
        )
        .expect("subset");
        let order = out.counts.iter().map(|c| c.pass).collect::<Vec<_>>();
        assert_eq!(order, vec![Pass::PropagateDriveName, Pass::DeleteHeaders]);
        assert_eq!(out.count(Pass::PropagateDriveName), Some(5));
    }

    #[test]
    fn pass_names_parse_leniently() {
        assert_eq!(Pass::from_name("delete_headers"), Some(Pass::DeleteHeaders));
        assert_eq!(Pass::from_name(" Flag-Inline-Notes "), Some(Pass::FlagInlineNotes));
        assert_eq!(Pass::from_name("bogus"), None);
    }
}
