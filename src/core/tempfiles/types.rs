//! Types for scratch file records.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

/// Lifecycle state of a scratch file that still has a record
///
/// Reclaimed files have neither record nor backing file, so they have no
/// state to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempFileState {
    Active,
    Tombstoned,
}

impl TempFileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Tombstoned => "tombstoned",
        }
    }
}

/// A scratch file on disk and its bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempFile {
    pub id: i64,
    pub path: PathBuf,
    pub created_on_ms: i64,
    /// Set when the file was soft-deleted
    pub deleted_on_ms: Option<i64>,
    /// Photo this file holds the bytes of, once known
    pub linked_photo_id: Option<String>,
}

impl TempFile {
    pub fn state(&self) -> TempFileState {
        match self.deleted_on_ms {
            Some(_) => TempFileState::Tombstoned,
            None => TempFileState::Active,
        }
    }

    pub fn is_tombstoned(&self) -> bool {
        self.deleted_on_ms.is_some()
    }

    /// Size of the backing file, zero when it is missing
    pub fn size_on_disk(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

/// Reclamation order: oldest tombstone first, ties by creation order
pub fn reclaim_order(a: &TempFile, b: &TempFile) -> Ordering {
    a.deleted_on_ms
        .cmp(&b.deleted_on_ms)
        .then(a.created_on_ms.cmp(&b.created_on_ms))
        .then(a.id.cmp(&b.id))
}

/// A record about to be inserted
#[derive(Debug, Clone)]
pub struct NewTempFile {
    pub path: PathBuf,
    pub created_on_ms: i64,
    pub linked_photo_id: Option<String>,
}

/// A file that could not be removed during reclamation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimFailure {
    pub id: i64,
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a reclamation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReclaimReport {
    /// Records removed by this pass
    pub reclaimed: Vec<TempFile>,
    /// Files that stayed on disk although their record was removed
    pub failures: Vec<ReclaimFailure>,
    /// Bytes released on disk
    pub bytes_freed: u64,
}

impl ReclaimReport {
    pub fn reclaimed_count(&self) -> usize {
        self.reclaimed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of an orphan sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    /// Files in the managed directory that had no record
    pub files_removed: Vec<PathBuf>,
    /// Records whose backing file had already disappeared
    pub records_dropped: Vec<TempFile>,
    /// Bytes released on disk
    pub bytes_freed: u64,
}
