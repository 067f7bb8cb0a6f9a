// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dj_core::Recurrence;

fn parse(json: &str) -> AutoJobDef {
    serde_json::from_str(json).unwrap()
}

#[yare::parameterized(
    plain          = { "atlas-01|atlas-02", &["atlas-01", "atlas-02"] },
    padded         = { "atlas-01| atlas-02 ", &["atlas-01", "atlas-02"] },
    empty_segments = { "atlas-01||", &["atlas-01"] },
    single         = { "atlas-01", &["atlas-01"] },
    blank          = { "", &[] },
)]
fn origin_list_splits_on_pipe(origins: &str, expected: &[&str]) {
    let def = parse(&format!(r#"{{"origins": "{}", "job": "nightly"}}"#, origins));
    assert_eq!(def.origin_list(), expected);
}

#[test]
fn loop_recurrence_from_numeric_value() {
    let def = parse(
        r#"{"origins": "a", "job": "nightly", "algotype": "loop", "algovalue": 240}"#,
    );
    assert_eq!(def.recurrence().unwrap(), Recurrence::Loop { minutes: 240 });
}

#[test]
fn daily_recurrence_from_clock_time() {
    let def = parse(
        r#"{"origins": "a", "job": "nightly", "algotype": "time", "algovalue": "03:30"}"#,
    );
    assert_eq!(def.recurrence().unwrap(), Recurrence::Daily { hour: 3, minute: 30 });
}

#[test]
fn missing_schedule_defaults_to_zero_loop() {
    let def = parse(r#"{"origins": "a", "job": "nightly"}"#);
    assert_eq!(def.recurrence().unwrap(), Recurrence::Loop { minutes: 0 });
}

#[test]
fn flags_default_to_false() {
    let def = parse(r#"{"origins": "a", "job": "nightly"}"#);
    assert!(!def.redo);
    assert!(!def.start_with_init);
    assert!(!def.redo_on_error);
}

#[test]
fn flags_parse_from_json_names() {
    let def = parse(
        r#"{"origins": "a", "job": "nightly", "redo": true, "startwithinit": true, "redoonerror": true}"#,
    );
    assert!(def.redo);
    assert!(def.start_with_init);
    assert!(def.redo_on_error);
}
