// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chain ledger entries: rolling per-chain state.

use crate::id::JobId;
use crate::recurrence::Recurrence;
use serde::{Deserialize, Serialize};

/// Rolling status of the most recently touched record in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Pending,
    Future,
    Success,
    Failure,
    Interrupted,
    #[serde(rename = "not connected")]
    NotConnected,
    Faulty,
}

crate::simple_display! {
    ChainStatus {
        Pending => "pending",
        Future => "future",
        Success => "success",
        Failure => "failure",
        Interrupted => "interrupted",
        NotConnected => "not connected",
        Faulty => "faulty",
    }
}

impl ChainStatus {
    /// While the previous record in the chain carries one of these, the
    /// next record may not leave `future` (strict in-chain ordering).
    pub fn blocks_successor(&self) -> bool {
        matches!(
            self,
            ChainStatus::Pending
                | ChainStatus::Future
                | ChainStatus::Failure
                | ChainStatus::Interrupted
                | ChainStatus::NotConnected
        )
    }
}

/// Per-chain ledger entry.
///
/// Created at chain-expansion time, lives for the process lifetime.
/// Recurring chains are never persisted across restarts; they are re-derived
/// from the automatic job definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainEntry {
    /// Status of the most recently completed/attempted record;
    /// `None` until the first attempt.
    pub last_status: Option<ChainStatus>,
    /// Most recently touched record in the chain.
    pub last_job: Option<JobId>,
    /// Re-expand the chain after completion.
    pub redo: bool,
    /// Self-heal: re-expand even after the chain turns faulty.
    pub redo_on_error: bool,
    /// Recurrence schedule for automatic chains.
    pub recurrence: Option<Recurrence>,
    /// Execute the first occurrence immediately instead of waiting one
    /// full interval.
    pub start_with_init: bool,
    /// Created from a recurring definition.
    pub auto: bool,
}

impl ChainEntry {
    /// Fresh entry for a one-off (operator-initiated) chain.
    pub fn manual() -> Self {
        Self::default()
    }

    /// Reset rolling state before a (re-)expansion.
    pub fn reset(&mut self) {
        self.last_status = None;
        self.last_job = None;
    }

    /// Next-occurrence delay in minutes, per the configured recurrence.
    pub fn recurrence_minutes(&self, now: chrono::NaiveDateTime) -> i64 {
        self.recurrence.map(|r| r.delay_minutes(now)).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod tests;
