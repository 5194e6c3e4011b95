//! Scratch file lifecycle: create, tombstone, reclaim, sweep.

use super::{
    NewTempFile, ReclaimFailure, ReclaimReport, SweepReport, TempFile, TempFileStore,
};
use crate::core::clock::Clock;
use crate::error::TempFileError;
use crate::events::{null_sender, Event, EventSender, TempFileEvent};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;
use walkdir::WalkDir;

/// Configuration for the scratch file directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFileConfig {
    /// Directory all scratch files live in
    pub directory: PathBuf,
    /// How long a tombstoned file is kept before `reclaim_expired` removes it
    pub reclaim_after: Duration,
    /// Extension given to new scratch files
    pub file_extension: String,
}

impl TempFileConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            reclaim_after: Duration::from_secs(24 * 60 * 60),
            file_extension: "tmp".to_string(),
        }
    }
}

/// Owns the scratch files of the application
///
/// State machine per file: `Active --mark_deleted_by_id--> Tombstoned
/// --delete_old / delete_many--> Reclaimed`. Every mutating operation holds
/// the lifecycle's write lock for its whole duration, so two reclamation
/// passes never interleave. Reclamation is best effort per record: a file
/// that cannot be removed is reported and its record is dropped anyway,
/// leaving the file for `sweep_orphans`.
pub struct TempFileLifecycle {
    config: TempFileConfig,
    store: Arc<dyn TempFileStore>,
    clock: Arc<dyn Clock>,
    events: EventSender,
    write_lock: Mutex<()>,
}

impl TempFileLifecycle {
    /// Create a lifecycle, creating the managed directory if needed
    pub fn new(
        config: TempFileConfig,
        store: Arc<dyn TempFileStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TempFileError> {
        fs::create_dir_all(&config.directory).map_err(|source| TempFileError::Io {
            path: config.directory.clone(),
            source,
        })?;

        Ok(Self {
            config,
            store,
            clock,
            events: null_sender(),
            write_lock: Mutex::new(()),
        })
    }

    /// Report lifecycle changes to this sender
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &TempFileConfig {
        &self.config
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, nothing can be left half-updated
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a new empty scratch file
    pub fn create(&self) -> Result<TempFile, TempFileError> {
        self.create_with(None)
    }

    /// Allocate a new empty scratch file already linked to a photo
    pub fn create_linked(&self, photo_id: &str) -> Result<TempFile, TempFileError> {
        self.create_with(Some(photo_id.to_string()))
    }

    fn create_with(&self, linked_photo_id: Option<String>) -> Result<TempFile, TempFileError> {
        let _guard = self.write_guard();

        let path = self.config.directory.join(format!(
            "{}.{}",
            Uuid::new_v4(),
            self.config.file_extension
        ));

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| TempFileError::Io {
                path: path.clone(),
                source,
            })?;

        let new = NewTempFile {
            path: path.clone(),
            created_on_ms: self.clock.now_ms(),
            linked_photo_id,
        };

        let record = match self.store.insert(new) {
            Ok(record) => record,
            Err(error) => {
                // No record means no file either
                if let Err(cleanup) = fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %cleanup, "failed to remove unrecorded temp file");
                }
                return Err(error.into());
            }
        };

        tracing::debug!(id = record.id, path = %record.path.display(), "created temp file");
        self.events.send(Event::TempFile(TempFileEvent::Created {
            id: record.id,
            path: record.path.clone(),
        }));
        Ok(record)
    }

    /// Link an existing scratch file to the photo it holds
    pub fn link_photo(&self, id: i64, photo_id: &str) -> Result<TempFile, TempFileError> {
        let _guard = self.write_guard();

        if !self.store.set_linked_photo(id, Some(photo_id))? {
            return Err(TempFileError::NotFound { id });
        }
        self.store
            .find_by_id(id)?
            .ok_or(TempFileError::NotFound { id })
    }

    /// Soft-delete a scratch file; the file stays on disk until reclaimed
    pub fn mark_deleted_by_id(&self, id: i64) -> Result<TempFile, TempFileError> {
        let _guard = self.write_guard();

        let record = self
            .store
            .find_by_id(id)?
            .ok_or(TempFileError::NotFound { id })?;
        if record.is_tombstoned() {
            return Err(TempFileError::AlreadyTombstoned { id });
        }

        let deleted_on_ms = self.clock.now_ms();
        if !self.store.mark_deleted(id, deleted_on_ms)? {
            return Err(TempFileError::AlreadyTombstoned { id });
        }

        self.events.send(Event::TempFile(TempFileEvent::Tombstoned { id, deleted_on_ms }));
        Ok(TempFile {
            deleted_on_ms: Some(deleted_on_ms),
            ..record
        })
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<TempFile>, TempFileError> {
        Ok(self.store.find_by_id(id)?)
    }

    /// Every record still held, in creation order
    pub fn find_all(&self) -> Result<Vec<TempFile>, TempFileError> {
        Ok(self.store.find_all()?)
    }

    /// Tombstoned records deleted before `cutoff_ms`, oldest first
    pub fn find_deleted_old(&self, cutoff_ms: i64) -> Result<Vec<TempFile>, TempFileError> {
        Ok(self.store.find_deleted_before(cutoff_ms)?)
    }

    /// Reclaim every record `find_deleted_old(cutoff_ms)` returns
    ///
    /// Running it twice with the same cutoff is harmless.
    pub fn delete_old(&self, cutoff_ms: i64) -> Result<ReclaimReport, TempFileError> {
        let _guard = self.write_guard();
        let records = self.store.find_deleted_before(cutoff_ms)?;
        Ok(self.reclaim_all(&records))
    }

    /// Reclaim tombstones older than the configured retention
    pub fn reclaim_expired(&self) -> Result<ReclaimReport, TempFileError> {
        let retention_ms = i64::try_from(self.config.reclaim_after.as_millis()).unwrap_or(i64::MAX);
        self.delete_old(self.clock.now_ms().saturating_sub(retention_ms))
    }

    /// The `n` oldest tombstoned records
    pub fn find_oldest(&self, n: usize) -> Result<Vec<TempFile>, TempFileError> {
        Ok(self.store.find_oldest_deleted(n)?)
    }

    /// Reclaim exactly these records
    pub fn delete_many(&self, records: &[TempFile]) -> Result<ReclaimReport, TempFileError> {
        let _guard = self.write_guard();
        Ok(self.reclaim_all(records))
    }

    /// Reclaim every record, in any state, whose file is empty
    pub fn delete_empty_temp_files(&self) -> Result<ReclaimReport, TempFileError> {
        let _guard = self.write_guard();
        let empty: Vec<TempFile> = self
            .store
            .find_all()?
            .into_iter()
            .filter(|r| fs::metadata(&r.path).is_ok_and(|m| m.is_file() && m.len() == 0))
            .collect();
        Ok(self.reclaim_all(&empty))
    }

    /// Sum of the sizes of all files in `dir`, records not consulted
    pub fn calculate_total_directory_size(&self, dir: &Path) -> Result<u64, TempFileError> {
        directory_size(dir)
    }

    /// Sum of the sizes of the files still referenced by a record
    pub fn referenced_size(&self) -> Result<u64, TempFileError> {
        Ok(self.store.find_all()?.iter().map(TempFile::size_on_disk).sum())
    }

    /// Whether `path` has the `<uuid>.<extension>` shape of a file this
    /// lifecycle creates
    fn is_managed_name(&self, path: &Path) -> bool {
        let extension_matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.config.file_extension);
        let stem_is_uuid = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| Uuid::parse_str(stem).is_ok());
        extension_matches && stem_is_uuid
    }

    /// Reconcile the managed directory with the records
    ///
    /// Removes unreferenced files this lifecycle could have created and
    /// drops records whose file has disappeared. Files with any other name,
    /// such as a database sharing the directory, are left alone.
    pub fn sweep_orphans(&self) -> Result<SweepReport, TempFileError> {
        let _guard = self.write_guard();
        let mut report = SweepReport::default();

        let records = self.store.find_all()?;
        let referenced: HashSet<&Path> = records.iter().map(|r| r.path.as_path()).collect();

        for entry in WalkDir::new(&self.config.directory)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if referenced.contains(entry.path()) || !self.is_managed_name(entry.path()) {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    report.bytes_freed += size;
                    report.files_removed.push(entry.path().to_path_buf());
                    self.events.send(Event::TempFile(TempFileEvent::OrphanRemoved {
                        path: entry.path().to_path_buf(),
                    }));
                }
                Err(error) => {
                    tracing::warn!(path = %entry.path().display(), %error, "failed to remove orphaned file");
                }
            }
        }

        for record in records.iter().filter(|r| !r.path.exists()) {
            if self.store.delete_by_id(record.id)? {
                report.records_dropped.push(record.clone());
            }
        }

        tracing::debug!(
            files_removed = report.files_removed.len(),
            records_dropped = report.records_dropped.len(),
            "orphan sweep finished"
        );
        Ok(report)
    }

    /// Reclaim each record independently; one failure never stops the batch
    fn reclaim_all(&self, records: &[TempFile]) -> ReclaimReport {
        let mut report = ReclaimReport::default();

        for record in records {
            let size = record.size_on_disk();
            let file_removed = match fs::remove_file(&record.path) {
                Ok(()) => {
                    report.bytes_freed += size;
                    true
                }
                // Already gone counts as reclaimed
                Err(error) if error.kind() == ErrorKind::NotFound => true,
                Err(error) => {
                    tracing::warn!(id = record.id, path = %record.path.display(), %error, "failed to delete temp file, dropping record anyway");
                    self.report_failure(&mut report, record, error.to_string());
                    false
                }
            };

            match self.store.delete_by_id(record.id) {
                Ok(true) => {
                    if file_removed {
                        self.events.send(Event::TempFile(TempFileEvent::Reclaimed {
                            id: record.id,
                            path: record.path.clone(),
                        }));
                    }
                    report.reclaimed.push(record.clone());
                }
                Ok(false) => {
                    tracing::debug!(id = record.id, "temp file record already reclaimed");
                }
                Err(error) => {
                    tracing::warn!(id = record.id, %error, "failed to delete temp file record");
                    self.report_failure(&mut report, record, error.to_string());
                }
            }
        }

        report
    }

    fn report_failure(&self, report: &mut ReclaimReport, record: &TempFile, message: String) {
        self.events.send(Event::TempFile(TempFileEvent::ReclaimFailed {
            id: record.id,
            path: record.path.clone(),
            message: message.clone(),
        }));
        report.failures.push(ReclaimFailure {
            id: record.id,
            path: record.path.clone(),
            message,
        });
    }
}

/// Sum of the sizes of all files under `dir`
///
/// A missing directory has size zero.
pub fn directory_size(dir: &Path) -> Result<u64, TempFileError> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut total = 0u64;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| TempFileError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: e.into(),
        })?;
        if entry.file_type().is_file() {
            let metadata = entry.metadata().map_err(|e| TempFileError::Io {
                path: entry.path().to_path_buf(),
                source: e.into(),
            })?;
            total += metadata.len();
        }
    }
    Ok(total)
}
