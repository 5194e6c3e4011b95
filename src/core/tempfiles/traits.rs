//! Temp file record store trait definition.

use super::{NewTempFile, TempFile};
use crate::error::StoreError;

/// Persistence for scratch file records
///
/// Queries that return tombstoned records order them oldest tombstone
/// first, ties broken by creation order.
pub trait TempFileStore: Send + Sync {
    /// Insert a new active record and return it with its id
    fn insert(&self, new: NewTempFile) -> Result<TempFile, StoreError>;

    fn find_by_id(&self, id: i64) -> Result<Option<TempFile>, StoreError>;

    /// Every record, in creation order
    fn find_all(&self) -> Result<Vec<TempFile>, StoreError>;

    /// Tombstone an active record
    ///
    /// Returns `false` when the record is missing or already tombstoned.
    fn mark_deleted(&self, id: i64, deleted_on_ms: i64) -> Result<bool, StoreError>;

    /// Set or clear the linked photo. Returns `false` for unknown ids.
    fn set_linked_photo(&self, id: i64, photo_id: Option<&str>) -> Result<bool, StoreError>;

    /// Tombstoned records deleted strictly before `cutoff_ms`
    fn find_deleted_before(&self, cutoff_ms: i64) -> Result<Vec<TempFile>, StoreError>;

    /// The `limit` oldest tombstoned records
    fn find_oldest_deleted(&self, limit: usize) -> Result<Vec<TempFile>, StoreError>;

    /// Remove a record. Returns `false` if it was already gone.
    fn delete_by_id(&self, id: i64) -> Result<bool, StoreError>;
}
