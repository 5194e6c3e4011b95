//! # Temp Files Module
//!
//! Manages the scratch files photos are written to while they are
//! uploaded, downloaded or processed.
//!
//! ## Lifecycle
//! 1. **Active** - created empty by `TempFileLifecycle::create`
//! 2. **Tombstoned** - soft-deleted, still on disk
//! 3. **Reclaimed** - file and record removed
//!
//! Reclamation works from tombstones only, oldest first. The one exception
//! is `delete_empty_temp_files`, which drops empty files in any state.
//!
//! ## Backends
//! - `SqliteTempFileStore` - Persistent records using SQLite
//! - `InMemoryTempFileStore` - For testing

mod lifecycle;
mod memory;
mod sqlite;
mod traits;
mod types;

pub use lifecycle::{directory_size, TempFileConfig, TempFileLifecycle};
pub use memory::InMemoryTempFileStore;
pub use sqlite::SqliteTempFileStore;
pub use traits::TempFileStore;
pub use types::{
    reclaim_order, NewTempFile, ReclaimFailure, ReclaimReport, SweepReport, TempFile,
    TempFileState,
};
