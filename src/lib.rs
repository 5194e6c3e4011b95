//! # Photo Feed Cache
//!
//! An offline-first cache engine for paginated photo feeds, plus the
//! lifecycle manager for the scratch files photos pass through on disk.
//!
//! ## Core Philosophy
//! - **Fresh or nothing** - cached entries expire after a freshness window
//! - **One strategy per page** - a page comes from the cache or the remote, never both
//! - **Soft delete first** - scratch files are tombstoned before they are reclaimed
//!
//! ## Architecture
//! - `core` - Feed pagination, local stores, scratch file lifecycle
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - Error types for every layer
//! - `config` - Engine configuration loaded from JSON
//! - `cli` - Command-line interface (binary only)

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{PhotoCacheError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber installed by the host application wins
    let _ = tracing::subscriber::set_global_default(subscriber);
}
