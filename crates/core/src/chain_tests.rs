// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    pending = { ChainStatus::Pending, true },
    future = { ChainStatus::Future, true },
    failure = { ChainStatus::Failure, true },
    interrupted = { ChainStatus::Interrupted, true },
    not_connected = { ChainStatus::NotConnected, true },
    success = { ChainStatus::Success, false },
    faulty = { ChainStatus::Faulty, false },
)]
fn blocks_successor(status: ChainStatus, expected: bool) {
    assert_eq!(status.blocks_successor(), expected);
}

#[test]
fn reset_clears_rolling_state() {
    let mut entry = ChainEntry {
        last_status: Some(ChainStatus::Failure),
        last_job: Some(JobId::from_string("job-000000000004")),
        redo: true,
        ..ChainEntry::default()
    };
    entry.reset();
    assert_eq!(entry.last_status, None);
    assert_eq!(entry.last_job, None);
    assert!(entry.redo);
}

#[test]
fn recurrence_minutes_defaults_to_zero_without_schedule() {
    let entry = ChainEntry::manual();
    let now = chrono::NaiveDate::from_ymd_opt(2026, 1, 15)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    assert_eq!(entry.recurrence_minutes(now), 0);
}

#[test]
fn recurrence_minutes_uses_schedule() {
    let entry = ChainEntry {
        recurrence: Some(Recurrence::Loop { minutes: 45 }),
        auto: true,
        ..ChainEntry::default()
    };
    let now = chrono::NaiveDate::from_ymd_opt(2026, 1, 15)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    assert_eq!(entry.recurrence_minutes(now), 45);
}

#[test]
fn chain_status_serializes_with_log_vocabulary() {
    let json = serde_json::to_string(&ChainStatus::NotConnected).unwrap();
    assert_eq!(json, "\"not connected\"");
    let back: ChainStatus = serde_json::from_str("\"interrupted\"").unwrap();
    assert_eq!(back, ChainStatus::Interrupted);
}
