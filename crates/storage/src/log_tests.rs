// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dj_core::JobRecordBuilder;
use tempfile::tempdir;

fn record_map(records: Vec<JobRecord>) -> HashMap<JobId, JobRecord> {
    records.into_iter().map(|r| (r.id.clone(), r)).collect()
}

#[test]
fn load_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    let log = JobLog::open(dir.path().join("update_log.json"));
    assert!(log.load().unwrap().is_empty());
}

#[test]
fn flush_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let log = JobLog::open(dir.path().join("update_log.json"));
    let records = record_map(vec![
        JobRecordBuilder::new("job-000000000001").origin("atlas-01").build(),
        JobRecordBuilder::new("job-000000000002")
            .origin("atlas-02")
            .status(JobStatus::Success)
            .build(),
    ]);

    log.flush(&records).unwrap();
    let loaded = log.load().unwrap();
    assert_eq!(loaded, records);
}

#[test]
fn flush_overwrites_previous_contents() {
    let dir = tempdir().unwrap();
    let log = JobLog::open(dir.path().join("update_log.json"));
    let first = record_map(vec![JobRecordBuilder::new("job-000000000001").build()]);
    log.flush(&first).unwrap();

    let second = record_map(vec![JobRecordBuilder::new("job-000000000002").build()]);
    log.flush(&second).unwrap();

    let loaded = log.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.contains_key("job-000000000002"));
}

#[test]
fn corrupt_log_is_deleted_and_treated_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("update_log.json");
    std::fs::write(&path, "{ definitely not json").unwrap();

    let log = JobLog::open(&path);
    assert!(log.load().unwrap().is_empty());
    assert!(!path.exists());
}

#[test]
fn sweep_purges_auto_and_cancels_stale() {
    let mut records = record_map(vec![
        JobRecordBuilder::new("job-000000000001")
            .auto(true)
            .status(JobStatus::Future)
            .build(),
        JobRecordBuilder::new("job-000000000002").status(JobStatus::Processing).build(),
        JobRecordBuilder::new("job-000000000003").status(JobStatus::Success).build(),
        JobRecordBuilder::new("job-000000000004").status(JobStatus::NotConnected).build(),
    ]);

    let stats = sweep(&mut records);
    assert_eq!(stats, SweepStats { cancelled: 2, purged: 1 });
    assert!(!records.contains_key("job-000000000001"));
    assert_eq!(records["job-000000000002"].status, JobStatus::Cancelled);
    assert_eq!(records["job-000000000003"].status, JobStatus::Success);
    assert_eq!(records["job-000000000004"].status, JobStatus::Cancelled);
}

#[test]
fn sweep_cancels_every_stale_status() {
    let stale = [
        JobStatus::Pending,
        JobStatus::Starting,
        JobStatus::Processing,
        JobStatus::NotConnected,
        JobStatus::Future,
        JobStatus::NotRequired,
    ];
    let mut records = HashMap::new();
    for (i, status) in stale.iter().enumerate() {
        let id = format!("job-{:012}", i + 1);
        records.insert(
            JobId::from_string(id.clone()),
            JobRecordBuilder::new(id).status(*status).build(),
        );
    }
    let stats = sweep(&mut records);
    assert_eq!(stats.cancelled, stale.len());
    assert!(records.values().all(|r| r.status == JobStatus::Cancelled));
}
