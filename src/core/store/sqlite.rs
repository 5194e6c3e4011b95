//! SQLite photo store for persistent storage.

use super::{LocalPhotoStore, StoreStats};
use crate::core::photo::{CacheEntry, Cursor, FeedItem};
use crate::error::StoreError;
use rusqlite::{params, Connection, Row};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite-backed persistent photo store
///
/// All feeds share one `feed_entries` table, partitioned by the item's
/// `FeedKind`. Every mutation runs in its own transaction behind the
/// connection mutex, so there is a single writer at a time.
///
/// Reads go through the same mutex and are serialized with each other as
/// well. Open a second store on the same path for concurrent readers; WAL
/// mode lets those connections read while a write is in flight.
pub struct SqlitePhotoStore<T> {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    _item: PhantomData<fn() -> T>,
}

const SELECT_VISIBLE: &str = "SELECT payload, inserted_on FROM feed_entries
     WHERE kind = ?1
       AND inserted_on >= ?2
       AND (?3 IS NULL OR recency < ?3 OR (recency = ?3 AND key < ?4))
     ORDER BY recency DESC, key DESC
     LIMIT ?5";

impl<T: FeedItem> SqlitePhotoStore<T> {
    /// Open or create a store database at the given path
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
        // Stores for different feeds may share the file
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS feed_entries (
                kind TEXT NOT NULL,
                key TEXT NOT NULL,
                recency INTEGER NOT NULL,
                inserted_on INTEGER NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (kind, key)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_feed_order
             ON feed_entries(kind, recency DESC, key DESC)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_feed_inserted
             ON feed_entries(kind, inserted_on)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
            _item: PhantomData,
        })
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned {
            path: self.db_path.clone(),
        })
    }

    fn decode(payload: &str) -> Result<T, StoreError> {
        serde_json::from_str(payload).map_err(|e| StoreError::SerializationFailed(e.to_string()))
    }

    fn encode(item: &T) -> Result<String, StoreError> {
        serde_json::to_string(item).map_err(|e| StoreError::SerializationFailed(e.to_string()))
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<(String, i64)> {
        Ok((row.get(0)?, row.get(1)?))
    }
}

fn cursor_params(cursor: &Cursor) -> (Option<i64>, Option<&str>) {
    match cursor {
        Cursor::Latest => (None, None),
        Cursor::After { recency, key } => (Some(*recency), Some(key.as_str())),
    }
}

impl<T: FeedItem> LocalPhotoStore<T> for SqlitePhotoStore<T> {
    fn count_fresh(&self, cursor: &Cursor, fresh_since_ms: i64) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let (recency, key) = cursor_params(cursor);

        let count = conn.query_row(
            "SELECT COUNT(*) FROM feed_entries
             WHERE kind = ?1
               AND inserted_on >= ?2
               AND (?3 IS NULL OR recency < ?3 OR (recency = ?3 AND key < ?4))",
            params![T::KIND.as_str(), fresh_since_ms, recency, key],
            |row| row.get::<_, i64>(0).map(|v| v as usize),
        )?;

        Ok(count)
    }

    fn read_page(
        &self,
        cursor: &Cursor,
        count: usize,
        fresh_since_ms: i64,
    ) -> Result<Vec<T>, StoreError> {
        let conn = self.lock()?;
        let (recency, key) = cursor_params(cursor);

        let mut stmt = conn.prepare_cached(SELECT_VISIBLE)?;
        let rows = stmt
            .query_map(
                params![T::KIND.as_str(), fresh_since_ms, recency, key, count as i64],
                Self::entry_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.iter().map(|(payload, _)| Self::decode(payload)).collect()
    }

    fn save(&self, items: &[T], inserted_on_ms: i64) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO feed_entries (kind, key, recency, inserted_on, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(kind, key) DO UPDATE SET
                    recency = excluded.recency,
                    payload = excluded.payload",
            )?;

            for item in items {
                stmt.execute(params![
                    T::KIND.as_str(),
                    item.stable_key(),
                    item.recency_key(),
                    inserted_on_ms,
                    Self::encode(item)?,
                ])?;
            }
        }
        // Dropping an uncommitted transaction rolls it back
        tx.commit()?;

        Ok(())
    }

    fn prune_older_than(&self, cutoff_ms: i64) -> Result<usize, StoreError> {
        let conn = self.lock()?;

        let removed = conn.execute(
            "DELETE FROM feed_entries WHERE kind = ?1 AND inserted_on < ?2",
            params![T::KIND.as_str(), cutoff_ms],
        )?;

        Ok(removed)
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry<T>>, StoreError> {
        let conn = self.lock()?;

        let result = conn.query_row(
            "SELECT payload, inserted_on FROM feed_entries WHERE kind = ?1 AND key = ?2",
            params![T::KIND.as_str(), key],
            Self::entry_from_row,
        );

        match result {
            Ok((payload, inserted_on_ms)) => {
                Ok(Some(CacheEntry::new(Self::decode(&payload)?, inserted_on_ms)))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn entries(&self) -> Result<Vec<CacheEntry<T>>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare_cached(
            "SELECT payload, inserted_on FROM feed_entries
             WHERE kind = ?1
             ORDER BY recency DESC, key DESC",
        )?;
        let rows = stmt
            .query_map([T::KIND.as_str()], Self::entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.iter()
            .map(|(payload, inserted_on_ms)| {
                Ok(CacheEntry::new(Self::decode(payload)?, *inserted_on_ms))
            })
            .collect()
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;

        let removed = conn.execute(
            "DELETE FROM feed_entries WHERE kind = ?1",
            [T::KIND.as_str()],
        )?;

        Ok(removed)
    }

    fn stats(&self, fresh_since_ms: i64) -> Result<StoreStats, StoreError> {
        let conn = self.lock()?;

        let (total, fresh, oldest, newest) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN inserted_on >= ?2 THEN 1 ELSE 0 END), 0),
                    MIN(inserted_on),
                    MAX(inserted_on)
             FROM feed_entries WHERE kind = ?1",
            params![T::KIND.as_str(), fresh_since_ms],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            },
        )?;

        Ok(StoreStats {
            kind: T::KIND,
            total_entries: total as usize,
            fresh_entries: fresh as usize,
            oldest_inserted_ms: oldest,
            newest_inserted_ms: newest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::photo::{GalleryPhoto, GeoPoint, UploadedPhoto};
    use tempfile::TempDir;

    fn photo(name: &str, uploaded_on_ms: i64) -> GalleryPhoto {
        GalleryPhoto {
            photo_name: name.to_string(),
            uploader_user_id: "user-1".to_string(),
            uploaded_on_ms,
            location: GeoPoint { lon: 1.5, lat: -2.5 },
            favourites_count: 0,
        }
    }

    fn open(dir: &TempDir) -> SqlitePhotoStore<GalleryPhoto> {
        SqlitePhotoStore::open(&dir.path().join("feed.db")).unwrap()
    }

    #[test]
    fn sqlite_store_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("feed.db");

        let store = SqlitePhotoStore::<GalleryPhoto>::open(&db_path).unwrap();

        assert!(db_path.exists());
        assert_eq!(store.stats(0).unwrap().total_entries, 0);
    }

    #[test]
    fn sqlite_store_stores_and_retrieves() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        store.save(&[photo("a", 10), photo("b", 20)], 1_000).unwrap();

        let page = store.read_page(&Cursor::Latest, 10, 0).unwrap();
        assert_eq!(page, vec![photo("b", 20), photo("a", 10)]);

        let entry = store.get("a").unwrap().unwrap();
        assert_eq!(entry.inserted_on_ms, 1_000);
        assert_eq!(entry.value.location, GeoPoint { lon: 1.5, lat: -2.5 });
    }

    #[test]
    fn upsert_keeps_one_row_and_first_insertion_time() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        store.save(&[photo("a", 10)], 100).unwrap();
        let mut updated = photo("a", 15);
        updated.favourites_count = 3;
        store.save(&[updated.clone()], 900).unwrap();

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, updated);
        assert_eq!(entries[0].inserted_on_ms, 100);
    }

    #[test]
    fn cursor_pages_do_not_overlap_on_equal_recency() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        store
            .save(&[photo("a", 10), photo("b", 10), photo("c", 10), photo("d", 5)], 0)
            .unwrap();

        let first = store.read_page(&Cursor::Latest, 2, 0).unwrap();
        let second = store.read_page(&Cursor::after(&first[1]), 2, 0).unwrap();

        let names: Vec<_> = first
            .iter()
            .chain(second.iter())
            .map(|p| p.photo_name.as_str())
            .collect();
        assert_eq!(names, vec!["c", "b", "a", "d"]);
        assert_eq!(store.count_fresh(&Cursor::after(&first[1]), 0).unwrap(), 2);
    }

    #[test]
    fn prune_only_touches_its_own_feed() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("feed.db");
        let gallery = SqlitePhotoStore::<GalleryPhoto>::open(&db_path).unwrap();
        let uploaded = SqlitePhotoStore::<UploadedPhoto>::open(&db_path).unwrap();

        gallery.save(&[photo("g", 1)], 100).unwrap();
        uploaded
            .save(
                &[UploadedPhoto {
                    photo_name: "u".to_string(),
                    uploaded_on_ms: 1,
                    location: GeoPoint { lon: 0.0, lat: 0.0 },
                    has_receiver: false,
                }],
                100,
            )
            .unwrap();

        assert_eq!(gallery.prune_older_than(200).unwrap(), 1);
        assert_eq!(uploaded.stats(0).unwrap().total_entries, 1);
    }

    #[test]
    fn entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = open(&temp_dir);
            store.save(&[photo("kept", 42)], 7).unwrap();
        }

        let store = open(&temp_dir);
        let stats = store.stats(0).unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.oldest_inserted_ms, Some(7));
    }

    #[test]
    fn concurrent_saves_keep_one_row_per_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        std::thread::scope(|scope| {
            for writer in 0..4i64 {
                let store = &store;
                scope.spawn(move || {
                    for round in 0..10i64 {
                        // Writers overlap on every key
                        let batch: Vec<_> = (0..8)
                            .map(|i| photo(&format!("p{i}"), i * 10 + writer))
                            .collect();
                        store.save(&batch, 1_000 + round).unwrap();
                    }
                });
            }
        });

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 8);
        let mut keys: Vec<_> = entries.iter().map(|e| e.value.photo_name.clone()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 8);
        // The first committed batch inserts every key, later ones only update
        assert!(entries.iter().all(|e| e.inserted_on_ms == 1_000));
        assert_eq!(store.stats(0).unwrap().total_entries, 8);
    }
}
