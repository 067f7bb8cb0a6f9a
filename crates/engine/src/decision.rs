// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pre-execution gate: decides what a worker does with a dequeued
//! record before any device command is issued.
//!
//! The checks are strictly ordered; the first matching rule wins. Two
//! dispositions ([`Disposition::Discard`], [`Disposition::Busy`]) are
//! produced by the worker itself because they need queue and lock context;
//! everything else comes out of [`evaluate`], which is a pure function of
//! the record, its chain ledger entry, and the current time.

use dj_core::{ChainEntry, ChainStatus, JobRecord};

/// What the worker does with a dequeued record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Id no longer maps to a record; drop it silently.
    Discard,
    /// Another worker holds this origin; re-queue and pause.
    Busy,
    /// Previous record in an automatic chain went faulty; terminate this
    /// one without executing.
    Abort,
    /// First occurrence of a recurring chain without `start_with_init`;
    /// schedule it one full interval out.
    DeferFirstOccurrence,
    /// Predecessor succeeded and this record carries a wait time;
    /// schedule it that many minutes out.
    DeferWait,
    /// Predecessor in the chain has not finished; re-queue untouched.
    WaitForPredecessor,
    /// Scheduled time has not arrived; re-queue.
    NotDue,
    /// All gates passed; run it.
    Execute,
}

/// Gate input: one record plus its chain's rolling state.
#[derive(Clone, Copy)]
pub struct GateView<'a> {
    pub record: &'a JobRecord,
    pub chain: &'a ChainEntry,
    pub now_ms: u64,
}

/// Ordered gate evaluation (rules follow record/ledger state only).
pub fn evaluate(view: GateView<'_>) -> Disposition {
    let record = view.record;
    let chain = view.chain;
    let unscheduled = record.processing_at_ms.is_none();

    if chain.auto && chain.last_status == Some(ChainStatus::Faulty) {
        return Disposition::Abort;
    }

    let first_or_rescheduled = matches!(chain.last_status, None | Some(ChainStatus::Future));
    if chain.auto && !chain.start_with_init && first_or_rescheduled && unscheduled {
        return Disposition::DeferFirstOccurrence;
    }

    let after_success = matches!(chain.last_status, None | Some(ChainStatus::Success));
    if after_success && record.wait_time_min > 0 && unscheduled {
        return Disposition::DeferWait;
    }

    if let Some(last) = chain.last_status {
        let is_own_turn = chain.last_job.as_ref() == Some(&record.id);
        if last.blocks_successor() && !is_own_turn && unscheduled {
            return Disposition::WaitForPredecessor;
        }
    }

    if !record.is_due(view.now_ms) {
        return Disposition::NotDue;
    }

    Disposition::Execute
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
