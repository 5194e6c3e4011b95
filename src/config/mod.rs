//! # Config Module
//!
//! Engine configuration, loaded from a JSON file.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "freshness_ttl_secs": 600, "network_policy": "unmetered_only" }
//! ```

use crate::core::feed::{FeedConfig, PageCoordinator, PageCoordinatorBuilder, RetryPolicy};
use crate::core::network::{ConnectionKind, NetworkPolicy, PolicyGate};
use crate::core::photo::FeedItem;
use crate::core::remote::{RemotePhotoSource, TimeoutSource};
use crate::core::tempfiles::TempFileConfig;
use crate::error::{PhotoCacheError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const APP_DIR: &str = "photo-feed-cache";

/// Settings shared by the feed coordinators and the temp file lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite database holding feed entries and temp file records
    pub database_path: PathBuf,
    /// Directory scratch files are created in
    pub temp_directory: PathBuf,
    pub freshness_ttl_secs: u64,
    pub page_size: usize,
    /// Retention of tombstoned scratch files
    pub reclaim_after_secs: u64,
    pub temp_file_extension: String,
    /// Applied by `network_gate` and `coordinator_builder`
    pub network_policy: NetworkPolicy,
    /// Deadline for a single remote page fetch, see `bounded_source`
    pub remote_timeout_ms: u64,
    /// Caller-side retry around `PageCoordinator::get_page`
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let feed = FeedConfig::default();
        Self {
            database_path: default_data_dir().join("cache.db"),
            temp_directory: default_cache_dir().join("scratch"),
            freshness_ttl_secs: feed.freshness_ttl.as_secs(),
            page_size: feed.page_size,
            reclaim_after_secs: 24 * 60 * 60,
            temp_file_extension: "tmp".to_string(),
            network_policy: NetworkPolicy::default(),
            remote_timeout_ms: 15_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load a config file, filling missing fields with defaults
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            PhotoCacheError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            PhotoCacheError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, the defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PhotoCacheError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PhotoCacheError::Config(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        fs::write(path, json)
            .map_err(|e| PhotoCacheError::Config(format!("cannot write {}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(PhotoCacheError::Config("page_size must be at least 1".into()));
        }
        if self.freshness_ttl_secs == 0 {
            return Err(PhotoCacheError::Config(
                "freshness_ttl_secs must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(PhotoCacheError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.database_path.starts_with(&self.temp_directory) {
            return Err(PhotoCacheError::Config(format!(
                "database_path {} must not be inside temp_directory {}",
                self.database_path.display(),
                self.temp_directory.display()
            )));
        }
        Ok(())
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            freshness_ttl: Duration::from_secs(self.freshness_ttl_secs),
            page_size: self.page_size,
        }
    }

    pub fn temp_file_config(&self) -> TempFileConfig {
        TempFileConfig {
            directory: self.temp_directory.clone(),
            reclaim_after: Duration::from_secs(self.reclaim_after_secs),
            file_extension: self.temp_file_extension.clone(),
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    /// Gate applying the configured `network_policy` to `connection`
    pub fn network_gate(&self, connection: ConnectionKind) -> PolicyGate {
        PolicyGate::new(self.network_policy, connection)
    }

    /// Wrap `source` so each fetch is bounded by `remote_timeout_ms`
    pub fn bounded_source<T, S>(&self, source: S) -> TimeoutSource<T, S>
    where
        T: FeedItem,
        S: RemotePhotoSource<T> + 'static,
    {
        TimeoutSource::new(source, self.remote_timeout())
    }

    /// Coordinator builder carrying the configured freshness, page size,
    /// network policy and remote deadline
    ///
    /// The store and clock still need to be set by the caller. Wrap calls
    /// in `self.retry.run(..)` to apply the configured retry policy.
    pub fn coordinator_builder<T, S>(
        &self,
        source: S,
        connection: ConnectionKind,
    ) -> PageCoordinatorBuilder<T>
    where
        T: FeedItem,
        S: RemotePhotoSource<T> + 'static,
    {
        PageCoordinator::builder(Arc::new(self.bounded_source(source)))
            .config(self.feed_config())
            .gate(Arc::new(self.network_gate(connection)))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
