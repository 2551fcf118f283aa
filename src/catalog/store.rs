use crate::catalog::record::{Field, Record, RecordLinks};
use crate::catalog::status::{StatusCatalog, StatusId};
use crate::error::CatalogError;
use std::collections::{BTreeMap, BTreeSet};

/// Ordered record collection the cleanup passes run against.
pub trait RecordStore {
    /// All records, ascending by id.
    fn records(&self) -> Vec<Record>;
    fn catalog(&self) -> &StatusCatalog;
    fn update(&mut self, id: u64, field: Field, value: &str) -> Result<(), CatalogError>;
    fn delete(&mut self, id: u64) -> Result<(), CatalogError>;
    fn add_status(&mut self, id: u64, status: StatusId) -> Result<(), CatalogError>;
    fn remove_status(&mut self, id: u64, status: StatusId) -> Result<(), CatalogError>;

    fn filter(&self, predicate: &dyn Fn(&Record) -> bool) -> Vec<Record> {
        self.records().into_iter().filter(|r| predicate(r)).collect()
    }
}

/// A single decided mutation. Passes produce these without touching the
/// store so a dry run can count them and throw them away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    SetField {
        id: u64,
        field: Field,
        value: String,
    },
    Delete {
        id: u64,
    },
    AddStatus {
        id: u64,
        status: StatusId,
    },
    RemoveStatus {
        id: u64,
        status: StatusId,
    },
}

impl Change {
    pub fn record_id(&self) -> u64 {
        match self {
            Change::SetField { id, .. }
            | Change::Delete { id }
            | Change::AddStatus { id, .. }
            | Change::RemoveStatus { id, .. } => *id,
        }
    }
}

/// Number of distinct records touched by `changes`.
pub fn touched_records(changes: &[Change]) -> usize {
    changes
        .iter()
        .map(Change::record_id)
        .collect::<BTreeSet<_>>()
        .len()
}

pub fn apply_changes(store: &mut dyn RecordStore, changes: &[Change]) -> Result<(), CatalogError> {
    for change in changes {
        match change {
            Change::SetField { id, field, value } => store.update(*id, *field, value)?,
            Change::Delete { id } => store.delete(*id)?,
            Change::AddStatus { id, status } => store.add_status(*id, *status)?,
            Change::RemoveStatus { id, status } => store.remove_status(*id, *status)?,
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<u64, Record>,
    catalog: StatusCatalog,
    next_id: u64,
}

impl MemoryStore {
    pub fn new(catalog: StatusCatalog) -> Self {
        Self {
            records: BTreeMap::new(),
            catalog,
            next_id: 1,
        }
    }

    pub fn from_records(catalog: StatusCatalog, records: Vec<Record>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            records: records.into_iter().map(|r| (r.id, r)).collect(),
            catalog,
            next_id,
        }
    }

    /// Append a record, assigning the next sequential id.
    pub fn insert(&mut self, mut record: Record) -> u64 {
        let id = self.next_id.max(1);
        record.id = id;
        self.records.insert(id, record);
        self.next_id = id + 1;
        id
    }

    /// Ids below `next_id` stay retired even if their records were deleted.
    pub fn reserve_ids_below(&mut self, next_id: u64) {
        self.next_id = self.next_id.max(next_id);
    }

    pub fn get(&self, id: u64) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn set_links(&mut self, id: u64, links: RecordLinks) -> Result<(), CatalogError> {
        self.record_mut(id)?.links = links;
        Ok(())
    }

    fn record_mut(&mut self, id: u64) -> Result<&mut Record, CatalogError> {
        self.records
            .get_mut(&id)
            .ok_or(CatalogError::UnknownRecord(id))
    }
}

impl RecordStore for MemoryStore {
    fn records(&self) -> Vec<Record> {
        self.records.values().cloned().collect()
    }

    fn catalog(&self) -> &StatusCatalog {
        &self.catalog
    }

    fn update(&mut self, id: u64, field: Field, value: &str) -> Result<(), CatalogError> {
        self.record_mut(id)?.set(field, value);
        Ok(())
    }

    fn delete(&mut self, id: u64) -> Result<(), CatalogError> {
        self.records
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::UnknownRecord(id))
    }

    fn add_status(&mut self, id: u64, status: StatusId) -> Result<(), CatalogError> {
        self.record_mut(id)?.status.insert(status);
        Ok(())
    }

    fn remove_status(&mut self, id: u64, status: StatusId) -> Result<(), CatalogError> {
        self.record_mut(id)?.status.remove(&status);
        Ok(())
    }
}
