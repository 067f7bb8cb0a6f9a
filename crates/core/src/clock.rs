// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time.
///
/// `epoch_ms` drives due-date bookkeeping; `local_now` drives time-of-day
/// recurrence arithmetic.
pub trait Clock: Clone + Send + Sync + 'static {
    fn epoch_ms(&self) -> u64;
    fn local_now(&self) -> NaiveDateTime;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn local_now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

struct FakeClockState {
    epoch_ms: u64,
    local: NaiveDateTime,
}

impl FakeClock {
    pub fn new() -> Self {
        let local = NaiveDateTime::parse_from_str("2026-01-15 12:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap_or_default();
        Self {
            inner: Arc::new(Mutex::new(FakeClockState { epoch_ms: 1_000_000, local })),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock();
        state.epoch_ms += duration.as_millis() as u64;
        state.local += chrono::Duration::milliseconds(duration.as_millis() as i64);
    }

    /// Set the epoch milliseconds value
    pub fn set_epoch_ms(&self, ms: u64) {
        self.inner.lock().epoch_ms = ms;
    }

    /// Set the local wall-clock time
    pub fn set_local(&self, local: NaiveDateTime) {
        self.inner.lock().local = local;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }

    fn local_now(&self) -> NaiveDateTime {
        self.inner.lock().local
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
