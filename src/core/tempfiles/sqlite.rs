//! SQLite temp file record store.

use super::{NewTempFile, TempFile, TempFileStore};
use crate::error::StoreError;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const COLUMNS: &str = "id, path, created_on, deleted_on, linked_photo_id";

/// Persistent temp file records
pub struct SqliteTempFileStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteTempFileStore {
    /// Open or create the record database
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS temp_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                created_on INTEGER NOT NULL,
                deleted_on INTEGER,
                linked_photo_id TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_temp_files_deleted
             ON temp_files(deleted_on, created_on, id)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned {
            path: self.db_path.clone(),
        })
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TempFile> {
        Ok(TempFile {
            id: row.get(0)?,
            path: PathBuf::from(row.get::<_, String>(1)?),
            created_on_ms: row.get(2)?,
            deleted_on_ms: row.get(3)?,
            linked_photo_id: row.get(4)?,
        })
    }

    fn query_records<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<TempFile>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let records = stmt
            .query_map(params, Self::record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl TempFileStore for SqliteTempFileStore {
    fn insert(&self, new: NewTempFile) -> Result<TempFile, StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO temp_files (path, created_on, deleted_on, linked_photo_id)
             VALUES (?1, ?2, NULL, ?3)",
            params![
                new.path.to_string_lossy(),
                new.created_on_ms,
                new.linked_photo_id,
            ],
        )?;

        Ok(TempFile {
            id: conn.last_insert_rowid(),
            path: new.path,
            created_on_ms: new.created_on_ms,
            deleted_on_ms: None,
            linked_photo_id: new.linked_photo_id,
        })
    }

    fn find_by_id(&self, id: i64) -> Result<Option<TempFile>, StoreError> {
        let conn = self.lock()?;

        let result = conn.query_row(
            &format!("SELECT {COLUMNS} FROM temp_files WHERE id = ?1"),
            [id],
            Self::record_from_row,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn find_all(&self) -> Result<Vec<TempFile>, StoreError> {
        self.query_records(
            &format!("SELECT {COLUMNS} FROM temp_files ORDER BY created_on ASC, id ASC"),
            [],
        )
    }

    fn mark_deleted(&self, id: i64, deleted_on_ms: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE temp_files SET deleted_on = ?2 WHERE id = ?1 AND deleted_on IS NULL",
            params![id, deleted_on_ms],
        )?;

        Ok(updated > 0)
    }

    fn set_linked_photo(&self, id: i64, photo_id: Option<&str>) -> Result<bool, StoreError> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE temp_files SET linked_photo_id = ?2 WHERE id = ?1",
            params![id, photo_id],
        )?;

        Ok(updated > 0)
    }

    fn find_deleted_before(&self, cutoff_ms: i64) -> Result<Vec<TempFile>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {COLUMNS} FROM temp_files
                 WHERE deleted_on IS NOT NULL AND deleted_on < ?1
                 ORDER BY deleted_on ASC, created_on ASC, id ASC"
            ),
            [cutoff_ms],
        )
    }

    fn find_oldest_deleted(&self, limit: usize) -> Result<Vec<TempFile>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {COLUMNS} FROM temp_files
                 WHERE deleted_on IS NOT NULL
                 ORDER BY deleted_on ASC, created_on ASC, id ASC
                 LIMIT ?1"
            ),
            [limit as i64],
        )
    }

    fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;

        let removed = conn.execute("DELETE FROM temp_files WHERE id = ?1", [id])?;

        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_file(name: &str, created_on_ms: i64) -> NewTempFile {
        NewTempFile {
            path: PathBuf::from(format!("/scratch/{name}.tmp")),
            created_on_ms,
            linked_photo_id: None,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteTempFileStore::open(&temp_dir.path().join("temp.db")).unwrap();

        let record = store.insert(new_file("a", 5)).unwrap();

        let found = store.find_by_id(record.id).unwrap().unwrap();
        assert_eq!(found, record);
        assert!(store.find_by_id(record.id + 1).unwrap().is_none());
    }

    #[test]
    fn test_oldest_deleted_limit() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteTempFileStore::open(&temp_dir.path().join("temp.db")).unwrap();

        for (i, deleted_on) in [40, 10, 30, 20].into_iter().enumerate() {
            let record = store.insert(new_file(&i.to_string(), i as i64)).unwrap();
            store.mark_deleted(record.id, deleted_on).unwrap();
        }

        let oldest: Vec<_> = store
            .find_oldest_deleted(2)
            .unwrap()
            .into_iter()
            .map(|r| r.deleted_on_ms.unwrap())
            .collect();
        assert_eq!(oldest, vec![10, 20]);
    }

    #[test]
    fn test_link_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteTempFileStore::open(&temp_dir.path().join("temp.db")).unwrap();
        let record = store.insert(new_file("a", 1)).unwrap();

        assert!(store.set_linked_photo(record.id, Some("photo-9")).unwrap());
        assert_eq!(
            store.find_by_id(record.id).unwrap().unwrap().linked_photo_id.as_deref(),
            Some("photo-9")
        );

        assert!(store.delete_by_id(record.id).unwrap());
        assert!(!store.delete_by_id(record.id).unwrap());
        assert!(store.find_all().unwrap().is_empty());
    }

    #[test]
    fn test_tombstone_is_one_way() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteTempFileStore::open(&temp_dir.path().join("temp.db")).unwrap();
        let record = store.insert(new_file("a", 1)).unwrap();

        assert!(store.mark_deleted(record.id, 100).unwrap());
        assert!(!store.mark_deleted(record.id, 200).unwrap());
        assert_eq!(store.find_deleted_before(101).unwrap().len(), 1);
        assert!(store.find_deleted_before(100).unwrap().is_empty());
    }
}
