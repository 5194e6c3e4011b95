//! Local photo store trait definition.

use super::StoreStats;
use crate::core::photo::{CacheEntry, Cursor, FeedItem};
use crate::error::StoreError;

/// Local cache for one kind of photo feed
///
/// Freshness is expressed as `fresh_since_ms`: an entry is fresh when its
/// `inserted_on_ms` is at or after that instant. Implementations serialize
/// their own mutations; reads may run concurrently with each other.
pub trait LocalPhotoStore<T: FeedItem>: Send + Sync {
    /// Count fresh entries that come after `cursor`
    fn count_fresh(&self, cursor: &Cursor, fresh_since_ms: i64) -> Result<usize, StoreError>;

    /// Read up to `count` fresh entries after `cursor`, most recent first
    fn read_page(
        &self,
        cursor: &Cursor,
        count: usize,
        fresh_since_ms: i64,
    ) -> Result<Vec<T>, StoreError>;

    /// Upsert items by stable key in a single write
    ///
    /// New keys are stamped with `inserted_on_ms`. Existing keys get the new
    /// value but keep their original insertion time. Saving the same items
    /// twice leaves the store unchanged.
    fn save(&self, items: &[T], inserted_on_ms: i64) -> Result<(), StoreError>;

    /// Remove entries inserted before `cutoff_ms`
    ///
    /// Returns the number of entries removed.
    fn prune_older_than(&self, cutoff_ms: i64) -> Result<usize, StoreError>;

    /// Look up a single entry by stable key
    fn get(&self, key: &str) -> Result<Option<CacheEntry<T>>, StoreError>;

    /// All entries regardless of freshness, most recent first
    fn entries(&self) -> Result<Vec<CacheEntry<T>>, StoreError>;

    /// Remove every entry, returning how many were removed
    fn clear(&self) -> Result<usize, StoreError>;

    /// Get store statistics
    fn stats(&self, fresh_since_ms: i64) -> Result<StoreStats, StoreError>;
}
