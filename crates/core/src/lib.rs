// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dj-core: data model for the device job orchestrator.
//!
//! Job records, chain ledger entries, statuses, outcomes, id generation,
//! the clock abstraction, and the recurrence calculator. No I/O lives here.

pub mod macros;

pub mod chain;
pub mod clock;
pub mod id;
pub mod job;
pub mod outcome;
pub mod recurrence;

pub use chain::{ChainEntry, ChainStatus};
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{ChainId, IdGen, JobId};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobRecordBuilder;
pub use job::{JobKind, JobRecord, JobStatus};
pub use outcome::JobOutcome;
pub use recurrence::{Recurrence, RecurrenceError};
