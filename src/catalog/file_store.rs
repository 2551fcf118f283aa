use crate::catalog::record::Record;
use crate::catalog::status::{StatusCatalog, StatusEntry};
use crate::catalog::store::{MemoryStore, RecordStore};
use crate::error::CatalogError;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    statuses: Vec<StatusEntry>,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    records: Vec<Record>,
}

/// Load the store at `path`. A missing file yields an empty store with the
/// seeded status catalog.
pub fn load(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        return Ok(MemoryStore::new(StatusCatalog::seeded()));
    }

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let doc: StoreDocument = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let catalog = StatusCatalog::from_entries(&doc.statuses);
    let mut store = MemoryStore::from_records(catalog, doc.records);
    store.reserve_ids_below(doc.next_id);
    Ok(store)
}

pub fn save(path: &Path, store: &MemoryStore) -> Result<PathBuf> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;

    let doc = StoreDocument {
        statuses: store.catalog().entries(),
        next_id: store.next_id(),
        records: store.records(),
    };
    let data = serde_json::to_string_pretty(&doc)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(data.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Exclusive advisory lock held while a command mutates the store.
#[derive(Debug)]
pub struct StoreLock {
    file: fs::File,
}

impl StoreLock {
    pub fn acquire(store_path: &Path) -> Result<Self> {
        let mut lock_name = store_path.as_os_str().to_owned();
        lock_name.push(".lock");
        let path = PathBuf::from(lock_name);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.try_lock_exclusive()
            .map_err(|_| CatalogError::StoreLocked(path.display().to_string()))?;
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::Field;
    use crate::catalog::status::{StatusId, StatusTag};
    use tempfile::tempdir;

    #[test]
    fn missing_store_starts_empty_and_seeded() {
        let tmp = tempdir().expect("tempdir");
        let store = load(&tmp.path().join("store.json")).expect("load");
        assert_eq!(store.len(), 0);
        assert!(store.catalog().require(StatusTag::NeedsReview).is_ok());
    }

    #[test]
    fn save_then_load_preserves_records_and_next_id() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("nested/store.json");
        let mut store = MemoryStore::new(StatusCatalog::seeded());
        let first = store.insert(Record::new(0).with(Field::FileName, "a.mov"));
        let second = store.insert(Record::new(0).with(Field::FileName, "b.mov"));
        store.add_status(first, StatusId(3)).expect("status");
        store.delete(second).expect("delete");
        save(&path, &store).expect("save");

        let mut loaded = load(&path).expect("load");
        assert_eq!(loaded.len(), 1);
        let record = loaded.get(first).expect("record");
        assert_eq!(record.get(Field::FileName), "a.mov");
        assert!(record.status.contains(&StatusId(3)));
        assert_eq!(loaded.insert(Record::new(0)), 3);
    }

    #[test]
    fn second_lock_on_same_store_is_refused() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("store.json");
        let held = StoreLock::acquire(&path).expect("first lock");
        assert!(tmp.path().join("store.json.lock").is_file());
        let err = StoreLock::acquire(&path).expect_err("second lock");
        assert!(err.to_string().contains("locked"));
        drop(held);
        assert!(StoreLock::acquire(&path).is_ok());
    }
}
