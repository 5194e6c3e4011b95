//! Integration tests for the scratch file lifecycle.
//!
//! These tests verify end-to-end lifecycle behavior including:
//! - Oldest-first reclamation
//! - Exact byte accounting
//! - Missing and empty backing files
//! - Orphan sweeps and persistence across reopen

use assert_fs::prelude::*;
use assert_fs::TempDir;
use photo_feed_cache::core::clock::ScriptedClock;
use photo_feed_cache::core::tempfiles::{
    SqliteTempFileStore, TempFileConfig, TempFileLifecycle, TempFileState,
};
use photo_feed_cache::error::TempFileError;
use predicates::prelude::*;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

fn lifecycle(temp: &TempDir, clock: ScriptedClock) -> TempFileLifecycle {
    let store = SqliteTempFileStore::open(&temp.path().join("records.db")).unwrap();
    TempFileLifecycle::new(
        TempFileConfig::new(temp.path().join("scratch")),
        Arc::new(store),
        Arc::new(clock),
    )
    .unwrap()
}

#[test]
fn oldest_tombstones_are_reclaimed_first() {
    let temp = TempDir::new().unwrap();
    let deleted_on = [100, 110, 120, 130, 250, 260, 270, 280];
    let clock = ScriptedClock::new((1..=8).chain(deleted_on));
    let lifecycle = lifecycle(&temp, clock);

    let files: Vec<_> = (0..8).map(|_| lifecycle.create().unwrap()).collect();
    for file in &files {
        lifecycle.mark_deleted_by_id(file.id).unwrap();
    }

    let oldest = lifecycle.find_oldest(4).unwrap();
    let oldest_deleted: Vec<_> = oldest.iter().map(|r| r.deleted_on_ms).collect();
    assert_eq!(
        oldest_deleted,
        vec![Some(100), Some(110), Some(120), Some(130)]
    );

    let report = lifecycle.delete_many(&oldest).unwrap();
    assert_eq!(report.reclaimed_count(), 4);
    assert!(report.is_clean());

    let remaining = lifecycle.find_all().unwrap();
    let remaining_deleted: Vec<_> = remaining.iter().map(|r| r.deleted_on_ms).collect();
    assert_eq!(
        remaining_deleted,
        vec![Some(250), Some(260), Some(270), Some(280)]
    );
    let remaining_ids: Vec<_> = remaining.iter().map(|r| r.id).collect();
    let expected_ids: Vec<_> = files[4..].iter().map(|r| r.id).collect();
    assert_eq!(remaining_ids, expected_ids);

    for file in &files[..4] {
        assert!(!file.path.exists());
    }
    for file in &files[4..] {
        assert!(file.path.exists());
    }
}

#[test]
fn directory_size_counts_exact_bytes() {
    let temp = TempDir::new().unwrap();
    let lifecycle = lifecycle(&temp, ScriptedClock::fixed(1));
    let scratch = temp.child("scratch");

    for len in [10usize, 21, 31, 41] {
        let file = lifecycle.create().unwrap();
        let name = file.path.file_name().unwrap().to_owned();
        scratch.child(name).write_binary(&vec![0xAB; len]).unwrap();
    }

    assert_eq!(
        lifecycle
            .calculate_total_directory_size(scratch.path())
            .unwrap(),
        103
    );
    assert_eq!(lifecycle.referenced_size().unwrap(), 103);
}

#[test]
fn file_deleted_behind_our_back_is_still_reclaimed() {
    let temp = TempDir::new().unwrap();
    let lifecycle = lifecycle(&temp, ScriptedClock::new([1, 5]));
    let file = lifecycle.create().unwrap();
    lifecycle.mark_deleted_by_id(file.id).unwrap();
    std::fs::remove_file(&file.path).unwrap();

    let report = lifecycle.delete_old(10).unwrap();

    assert_eq!(report.reclaimed_count(), 1);
    assert_eq!(report.bytes_freed, 0);
    assert!(lifecycle.find_all().unwrap().is_empty());
}

#[test]
fn empty_files_are_swept_in_any_state() {
    let temp = TempDir::new().unwrap();
    let lifecycle = lifecycle(&temp, ScriptedClock::fixed(1));
    let scratch = temp.child("scratch");

    let empty = lifecycle.create().unwrap();
    let written = lifecycle.create().unwrap();
    let written_child = scratch.child(written.path.file_name().unwrap());
    written_child.write_str("partial download").unwrap();

    let report = lifecycle.delete_empty_temp_files().unwrap();

    assert_eq!(report.reclaimed_count(), 1);
    assert_eq!(report.reclaimed[0].id, empty.id);
    scratch
        .child(empty.path.file_name().unwrap())
        .assert(predicate::path::missing());
    written_child.assert("partial download");
}

#[test]
fn sweep_reconciles_directory_with_records() {
    let temp = TempDir::new().unwrap();
    let lifecycle = lifecycle(&temp, ScriptedClock::fixed(1));
    let scratch = temp.child("scratch");

    let kept = lifecycle.create().unwrap();
    let lost = lifecycle.create().unwrap();
    std::fs::remove_file(&lost.path).unwrap();
    let stray = scratch.child(format!("{}.tmp", Uuid::new_v4()));
    stray.write_binary(&[1, 2, 3, 4, 5, 6, 7]).unwrap();
    let foreign = scratch.child("crashed-upload.part");
    foreign.write_str("not ours").unwrap();

    let report = lifecycle.sweep_orphans().unwrap();

    assert_eq!(report.files_removed.len(), 1);
    assert_eq!(report.bytes_freed, 7);
    assert_eq!(report.records_dropped.len(), 1);
    assert_eq!(report.records_dropped[0].id, lost.id);
    stray.assert(predicate::path::missing());
    foreign.assert("not ours");
    scratch
        .child(kept.path.file_name().unwrap())
        .assert(predicate::path::exists());
    assert_eq!(lifecycle.find_all().unwrap(), vec![kept]);
}

#[test]
fn records_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let (active_id, tombstoned_id) = {
        let lifecycle = lifecycle(&temp, ScriptedClock::new([1, 2, 3]));
        let active = lifecycle.create_linked("photo-1").unwrap();
        let tombstoned = lifecycle.create().unwrap();
        lifecycle.mark_deleted_by_id(tombstoned.id).unwrap();
        (active.id, tombstoned.id)
    };

    let reopened = lifecycle(&temp, ScriptedClock::fixed(10));
    let active = reopened.find_by_id(active_id).unwrap().unwrap();
    let tombstoned = reopened.find_by_id(tombstoned_id).unwrap().unwrap();

    assert_eq!(active.state(), TempFileState::Active);
    assert_eq!(active.linked_photo_id.as_deref(), Some("photo-1"));
    assert_eq!(tombstoned.state(), TempFileState::Tombstoned);
    assert_eq!(tombstoned.deleted_on_ms, Some(3));
    assert!(matches!(
        reopened.mark_deleted_by_id(tombstoned_id),
        Err(TempFileError::AlreadyTombstoned { .. })
    ));
}

#[test]
fn sweep_leaves_shared_database_intact() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("cache.db");
    let lifecycle = TempFileLifecycle::new(
        TempFileConfig::new(temp.path()),
        Arc::new(SqliteTempFileStore::open(&db_path).unwrap()),
        Arc::new(ScriptedClock::fixed(1)),
    )
    .unwrap();
    let file = lifecycle.create_linked("photo-1").unwrap();

    let report = lifecycle.sweep_orphans().unwrap();

    assert!(report.files_removed.is_empty());
    temp.child("cache.db").assert(predicate::path::exists());
    drop(lifecycle);

    let reopened = SqliteTempFileStore::open(&db_path).unwrap();
    let lifecycle = TempFileLifecycle::new(
        TempFileConfig::new(temp.path()),
        Arc::new(reopened),
        Arc::new(ScriptedClock::fixed(2)),
    )
    .unwrap();
    assert_eq!(lifecycle.find_all().unwrap(), vec![file]);
}

#[test]
fn racing_reclaim_passes_reclaim_each_record_once() {
    let temp = TempDir::new().unwrap();
    let lifecycle = lifecycle(&temp, ScriptedClock::fixed(1));
    let files: Vec<_> = (0..24).map(|_| lifecycle.create().unwrap()).collect();
    for file in &files {
        lifecycle.mark_deleted_by_id(file.id).unwrap();
    }
    let tombstoned = lifecycle.find_all().unwrap();

    let reports = thread::scope(|scope| {
        let handles = vec![
            scope.spawn(|| lifecycle.delete_many(&tombstoned).unwrap()),
            scope.spawn(|| lifecycle.delete_old(i64::MAX).unwrap()),
            scope.spawn(|| lifecycle.delete_many(&tombstoned[12..]).unwrap()),
            scope.spawn(|| lifecycle.delete_old(i64::MAX).unwrap()),
        ];
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    assert!(reports.iter().all(|r| r.is_clean()));
    let mut reclaimed: Vec<i64> = reports
        .iter()
        .flat_map(|r| r.reclaimed.iter().map(|f| f.id))
        .collect();
    reclaimed.sort_unstable();
    let mut expected: Vec<i64> = files.iter().map(|f| f.id).collect();
    expected.sort_unstable();
    assert_eq!(reclaimed, expected);
    assert!(lifecycle.find_all().unwrap().is_empty());
    assert_eq!(
        lifecycle
            .calculate_total_directory_size(&temp.path().join("scratch"))
            .unwrap(),
        0
    );
}
