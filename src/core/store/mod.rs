//! # Store Module
//!
//! Persists photo feed pages so they can be served without the network.
//!
//! ## Benefits
//! - Scrolling back through a feed needs no round-trip
//! - Feeds stay browsable offline
//! - Entries expire after a freshness window and get refreshed
//!
//! ## Backends
//! - `SqlitePhotoStore` - Persistent storage using SQLite
//! - `InMemoryPhotoStore` - For testing

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryPhotoStore;
pub use sqlite::SqlitePhotoStore;
pub use traits::LocalPhotoStore;

use crate::core::photo::FeedKind;
use serde::{Deserialize, Serialize};

/// Store statistics for one feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Feed these numbers describe
    pub kind: FeedKind,
    /// Total number of entries
    pub total_entries: usize,
    /// Entries still inside the freshness window
    pub fresh_entries: usize,
    /// Insertion time of the oldest entry
    pub oldest_inserted_ms: Option<i64>,
    /// Insertion time of the newest entry
    pub newest_inserted_ms: Option<i64>,
}

impl StoreStats {
    pub fn empty(kind: FeedKind) -> Self {
        Self {
            kind,
            total_entries: 0,
            fresh_entries: 0,
            oldest_inserted_ms: None,
            newest_inserted_ms: None,
        }
    }

    pub fn stale_entries(&self) -> usize {
        self.total_entries - self.fresh_entries
    }
}
