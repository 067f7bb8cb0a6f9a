// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurrence calculator for automatic chains.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RecurrenceError {
    #[error("invalid interval value '{0}'")]
    InvalidInterval(String),
    #[error("invalid clock time '{0}' (expected HH:MM)")]
    InvalidClockTime(String),
}

/// When a chain's next occurrence becomes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recurrence {
    /// Fixed period in minutes.
    Loop { minutes: i64 },
    /// Once per day at a fixed clock time.
    Daily { hour: u32, minute: u32 },
}

impl Recurrence {
    /// Parse the definition fields `algotype`/`algovalue`.
    ///
    /// `"loop"` takes a minute count; anything else is treated as a
    /// time-of-day value and must parse as `HH:MM`.
    pub fn parse(algotype: &str, algovalue: &str) -> Result<Self, RecurrenceError> {
        if algotype.eq_ignore_ascii_case("loop") {
            let minutes: i64 = algovalue
                .trim()
                .parse()
                .map_err(|_| RecurrenceError::InvalidInterval(algovalue.to_string()))?;
            return Ok(Recurrence::Loop { minutes });
        }
        let time = NaiveTime::parse_from_str(algovalue.trim(), "%H:%M")
            .map_err(|_| RecurrenceError::InvalidClockTime(algovalue.to_string()))?;
        Ok(Recurrence::Daily { hour: time.hour(), minute: time.minute() })
    }

    /// Minutes from `now` until the next occurrence.
    ///
    /// `Daily` wraps to tomorrow once today's clock time has passed.
    pub fn delay_minutes(&self, now: NaiveDateTime) -> i64 {
        match *self {
            Recurrence::Loop { minutes } => minutes,
            Recurrence::Daily { hour, minute } => {
                let target_time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
                let mut target = now.date().and_time(target_time);
                if target <= now {
                    target += chrono::Duration::days(1);
                }
                (target - now).num_minutes()
            }
        }
    }
}

#[cfg(test)]
#[path = "recurrence_tests.rs"]
mod tests;
