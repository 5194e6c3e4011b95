//! In-memory photo store for testing.

use super::{LocalPhotoStore, StoreStats};
use crate::core::photo::{feed_order, CacheEntry, Cursor, FeedItem};
use crate::error::StoreError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory photo store
///
/// Useful for testing and scenarios where persistence isn't needed.
pub struct InMemoryPhotoStore<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: FeedItem> InMemoryPhotoStore<T> {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-filled with entries
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CacheEntry<T>>,
    {
        let map = entries
            .into_iter()
            .map(|e| (e.value.stable_key().to_string(), e))
            .collect();
        Self {
            entries: RwLock::new(map),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, CacheEntry<T>>>, StoreError> {
        self.entries.read().map_err(|_| StoreError::Poisoned {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, CacheEntry<T>>>, StoreError> {
        self.entries.write().map_err(|_| StoreError::Poisoned {
            path: PathBuf::from("memory"),
        })
    }
}

impl<T: FeedItem> Default for InMemoryPhotoStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn visible<T: FeedItem>(entry: &CacheEntry<T>, cursor: &Cursor, fresh_since_ms: i64) -> bool {
    entry.is_fresh(fresh_since_ms)
        && cursor.admits(entry.value.recency_key(), entry.value.stable_key())
}

impl<T: FeedItem> LocalPhotoStore<T> for InMemoryPhotoStore<T> {
    fn count_fresh(&self, cursor: &Cursor, fresh_since_ms: i64) -> Result<usize, StoreError> {
        let entries = self.read()?;
        Ok(entries
            .values()
            .filter(|e| visible(e, cursor, fresh_since_ms))
            .count())
    }

    fn read_page(
        &self,
        cursor: &Cursor,
        count: usize,
        fresh_since_ms: i64,
    ) -> Result<Vec<T>, StoreError> {
        let entries = self.read()?;
        let mut items: Vec<T> = entries
            .values()
            .filter(|e| visible(e, cursor, fresh_since_ms))
            .map(|e| e.value.clone())
            .collect();
        items.sort_by(feed_order);
        items.truncate(count);
        Ok(items)
    }

    fn save(&self, items: &[T], inserted_on_ms: i64) -> Result<(), StoreError> {
        let mut entries = self.write()?;
        for item in items {
            entries
                .entry(item.stable_key().to_string())
                .and_modify(|e| e.value = item.clone())
                .or_insert_with(|| CacheEntry::new(item.clone(), inserted_on_ms));
        }
        Ok(())
    }

    fn prune_older_than(&self, cutoff_ms: i64) -> Result<usize, StoreError> {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, e| e.inserted_on_ms >= cutoff_ms);
        Ok(before - entries.len())
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry<T>>, StoreError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn entries(&self) -> Result<Vec<CacheEntry<T>>, StoreError> {
        let mut all: Vec<CacheEntry<T>> = self.read()?.values().cloned().collect();
        all.sort_by(|a, b| feed_order(&a.value, &b.value));
        Ok(all)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut entries = self.write()?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn stats(&self, fresh_since_ms: i64) -> Result<StoreStats, StoreError> {
        let entries = self.read()?;

        Ok(StoreStats {
            kind: T::KIND,
            total_entries: entries.len(),
            fresh_entries: entries.values().filter(|e| e.is_fresh(fresh_since_ms)).count(),
            oldest_inserted_ms: entries.values().map(|e| e.inserted_on_ms).min(),
            newest_inserted_ms: entries.values().map(|e| e.inserted_on_ms).max(),
        })
    }
}
