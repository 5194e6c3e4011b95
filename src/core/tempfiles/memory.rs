//! In-memory temp file record store for testing.

use super::{reclaim_order, NewTempFile, TempFile, TempFileStore};
use crate::error::StoreError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Records {
    next_id: i64,
    by_id: BTreeMap<i64, TempFile>,
}

/// In-memory temp file record store
#[derive(Default)]
pub struct InMemoryTempFileStore {
    records: RwLock<Records>,
}

impl InMemoryTempFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>, StoreError> {
        self.records.read().map_err(|_| StoreError::Poisoned {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Records>, StoreError> {
        self.records.write().map_err(|_| StoreError::Poisoned {
            path: PathBuf::from("memory"),
        })
    }

    fn tombstoned_in_order(&self) -> Result<Vec<TempFile>, StoreError> {
        let mut tombstoned: Vec<TempFile> = self
            .read()?
            .by_id
            .values()
            .filter(|r| r.is_tombstoned())
            .cloned()
            .collect();
        tombstoned.sort_by(reclaim_order);
        Ok(tombstoned)
    }
}

impl TempFileStore for InMemoryTempFileStore {
    fn insert(&self, new: NewTempFile) -> Result<TempFile, StoreError> {
        let mut records = self.write()?;
        records.next_id += 1;

        let record = TempFile {
            id: records.next_id,
            path: new.path,
            created_on_ms: new.created_on_ms,
            deleted_on_ms: None,
            linked_photo_id: new.linked_photo_id,
        };
        records.by_id.insert(record.id, record.clone());
        Ok(record)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<TempFile>, StoreError> {
        Ok(self.read()?.by_id.get(&id).cloned())
    }

    fn find_all(&self) -> Result<Vec<TempFile>, StoreError> {
        let mut all: Vec<TempFile> = self.read()?.by_id.values().cloned().collect();
        all.sort_by_key(|r| (r.created_on_ms, r.id));
        Ok(all)
    }

    fn mark_deleted(&self, id: i64, deleted_on_ms: i64) -> Result<bool, StoreError> {
        let mut records = self.write()?;
        match records.by_id.get_mut(&id) {
            Some(record) if !record.is_tombstoned() => {
                record.deleted_on_ms = Some(deleted_on_ms);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn set_linked_photo(&self, id: i64, photo_id: Option<&str>) -> Result<bool, StoreError> {
        let mut records = self.write()?;
        match records.by_id.get_mut(&id) {
            Some(record) => {
                record.linked_photo_id = photo_id.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_deleted_before(&self, cutoff_ms: i64) -> Result<Vec<TempFile>, StoreError> {
        let mut tombstoned = self.tombstoned_in_order()?;
        tombstoned.retain(|r| r.deleted_on_ms.is_some_and(|d| d < cutoff_ms));
        Ok(tombstoned)
    }

    fn find_oldest_deleted(&self, limit: usize) -> Result<Vec<TempFile>, StoreError> {
        let mut tombstoned = self.tombstoned_in_order()?;
        tombstoned.truncate(limit);
        Ok(tombstoned)
    }

    fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.write()?.by_id.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_file(name: &str, created_on_ms: i64) -> NewTempFile {
        NewTempFile {
            path: PathBuf::from(format!("/scratch/{name}")),
            created_on_ms,
            linked_photo_id: None,
        }
    }

    #[test]
    fn ids_are_assigned_in_insert_order() {
        let store = InMemoryTempFileStore::new();
        let a = store.insert(new_file("a", 1)).unwrap();
        let b = store.insert(new_file("b", 1)).unwrap();

        assert!(a.id < b.id);
        assert_eq!(store.find_all().unwrap(), vec![a, b]);
    }

    #[test]
    fn mark_deleted_only_once() {
        let store = InMemoryTempFileStore::new();
        let record = store.insert(new_file("a", 1)).unwrap();

        assert!(store.mark_deleted(record.id, 10).unwrap());
        assert!(!store.mark_deleted(record.id, 20).unwrap());
        assert_eq!(store.find_by_id(record.id).unwrap().unwrap().deleted_on_ms, Some(10));
    }

    #[test]
    fn find_deleted_before_is_strict_and_ordered() {
        let store = InMemoryTempFileStore::new();
        for (i, deleted_on) in [30, 10, 20].into_iter().enumerate() {
            let record = store.insert(new_file(&i.to_string(), i as i64)).unwrap();
            store.mark_deleted(record.id, deleted_on).unwrap();
        }
        store.insert(new_file("active", 9)).unwrap();

        let found: Vec<_> = store
            .find_deleted_before(30)
            .unwrap()
            .into_iter()
            .map(|r| r.deleted_on_ms)
            .collect();
        assert_eq!(found, vec![Some(10), Some(20)]);
    }

    #[test]
    fn link_unknown_id_reports_false() {
        let store = InMemoryTempFileStore::new();
        assert!(!store.set_linked_photo(404, Some("photo")).unwrap());
    }
}
