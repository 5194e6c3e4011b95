//! # Error Module
//!
//! Error types for the feed cache and the scratch file lifecycle.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, ids, cursors, what went wrong
//! - **Keep causes** - remote and store failures keep their source error
//! - **Caller decides** - nothing here retries on its own

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum PhotoCacheError {
    #[error("Feed error: {0}")]
    Page(#[from] PageError),

    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    #[error("Remote source error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Temp file error: {0}")]
    TempFile(#[from] TempFileError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by a local store (photo cache or temp file records)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Store lock poisoned for {path}. Restart the application.")]
    Poisoned { path: PathBuf },

    #[error("Failed to serialize cached item: {0}")]
    SerializationFailed(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::QueryFailed(error.to_string())
    }
}

/// Errors raised by a remote photo source
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Network access is not permitted right now")]
    NetworkUnavailable,

    #[error("Remote fetch timed out after {}ms", after.as_millis())]
    TimedOut { after: Duration },

    #[error("Remote request failed: {0}")]
    Transport(String),

    #[error("Remote returned a malformed page: {0}")]
    Malformed(String),
}

/// Errors surfaced by `PageCoordinator::get_page`
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Failed to fetch page from remote: {0}")]
    RemoteFetchFailed(#[source] RemoteError),

    #[error("Local photo store failed: {0}")]
    LocalStoreFailed(#[from] StoreError),

    #[error("Invalid page size: {requested} (must be at least 1)")]
    InvalidPageSize { requested: usize },
}

impl PageError {
    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PageError::RemoteFetchFailed(RemoteError::TimedOut { .. })
                | PageError::RemoteFetchFailed(RemoteError::Transport(_))
                | PageError::RemoteFetchFailed(RemoteError::NetworkUnavailable)
        )
    }
}

/// Errors raised by the temp file lifecycle
#[derive(Error, Debug)]
pub enum TempFileError {
    #[error("Temp file {id} not found")]
    NotFound { id: i64 },

    #[error("Temp file {id} is already marked as deleted")]
    AlreadyTombstoned { id: i64 },

    #[error("Temp file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Temp file record store failed: {0}")]
    Store(#[from] StoreError),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PhotoCacheError>;
