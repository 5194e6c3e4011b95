//! Event type definitions for progress reporting.

use crate::core::photo::FeedKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the engine
///
/// Each variant carries its own discriminator (`FeedKind`, temp file id), so
/// listeners route on the enum rather than on who sent it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Feed pagination events
    Feed(FeedEvent),
    /// Scratch file lifecycle events
    TempFile(TempFileEvent),
}

/// How a page request was served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    /// Network was not permitted, served from the local store
    Offline,
    /// Enough fresh entries were cached locally
    Cache,
    /// Fetched from the remote and persisted
    Remote,
}

impl std::fmt::Display for PageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageSource::Offline => write!(f, "offline"),
            PageSource::Cache => write!(f, "cache"),
            PageSource::Remote => write!(f, "remote"),
        }
    }
}

/// Events from the page coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeedEvent {
    /// A page was served
    PageServed {
        kind: FeedKind,
        source: PageSource,
        items: usize,
        is_end: bool,
    },
    /// Stale entries were dropped during a refresh
    Pruned { kind: FeedKind, removed: usize },
    /// The remote refresh failed and the error went back to the caller
    RefreshFailed { kind: FeedKind, message: String },
}

/// Events from the temp file lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TempFileEvent {
    /// A scratch file was allocated
    Created { id: i64, path: PathBuf },
    /// A scratch file was soft-deleted
    Tombstoned { id: i64, deleted_on_ms: i64 },
    /// A scratch file and its record were removed
    Reclaimed { id: i64, path: PathBuf },
    /// The backing file could not be removed, the record was dropped anyway
    ReclaimFailed {
        id: i64,
        path: PathBuf,
        message: String,
    },
    /// A file with no record was removed from the managed directory
    OrphanRemoved { path: PathBuf },
}
