// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dj-engine: the device job orchestrator core.
//!
//! Owns the job records, the chain ledger, and the dispatch queue; runs
//! the worker tasks that gate, execute, and disposition jobs against the
//! device fleet.

pub mod config;
pub mod decision;
pub mod dispatch;
pub mod error;
mod ops;
pub mod orchestrator;
pub mod queue;
pub mod state;
mod worker;

pub use config::{OrchestratorConfig, Pacing};
pub use decision::{Disposition, GateView};
pub use dispatch::DispatchOutcome;
pub use error::EngineError;
pub use orchestrator::Orchestrator;
pub use queue::DispatchQueue;
pub use state::{EngineState, FieldSink};
