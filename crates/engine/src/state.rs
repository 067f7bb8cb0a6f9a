// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared engine state: job records, the chain ledger, and the exclusivity
//! guards, all behind one coarse mutex.
//!
//! Every check-then-act sequence (origin claim, record mutation plus log
//! flush) happens inside a single critical section, so workers can never
//! act on a stale read of each other's claims.

use dj_core::{ChainEntry, ChainId, JobId, JobRecord, JobStatus};
use dj_storage::JobLog;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// In-memory core of the orchestrator.
pub struct EngineState {
    pub records: HashMap<JobId, JobRecord>,
    pub chains: HashMap<ChainId, ChainEntry>,
    /// Origins with a command in flight.
    pub active_origins: HashSet<String>,
    /// Records currently in their execution phase (blocks deletion).
    pub active_jobs: HashSet<JobId>,
    log: JobLog,
}

impl EngineState {
    pub fn new(records: HashMap<JobId, JobRecord>, log: JobLog) -> Self {
        Self {
            records,
            chains: HashMap::new(),
            active_origins: HashSet::new(),
            active_jobs: HashSet::new(),
            log,
        }
    }

    /// Rewrite the job log to match the in-memory records.
    ///
    /// A failed flush is logged, not propagated: the in-memory map stays
    /// authoritative and the next mutation retries the write.
    pub fn persist(&self) {
        if let Err(e) = self.log.flush(&self.records) {
            tracing::error!(path = %self.log.path().display(), error = %e, "job log flush failed");
        }
    }

    /// Ledger entry for a chain, created on demand for records that
    /// predate this process (restart survivors being re-queued).
    pub fn chain_mut(&mut self, chain_id: &ChainId) -> &mut ChainEntry {
        self.chains.entry(chain_id.clone()).or_default()
    }

    /// Set a record's status and flush. Missing ids are ignored.
    pub fn set_status(&mut self, id: &JobId, status: JobStatus) {
        if let Some(record) = self.records.get_mut(id) {
            record.status = status;
            self.persist();
        }
    }

    /// Claim an origin for exclusive command execution.
    ///
    /// Returns false when another worker already holds it.
    pub fn try_claim_origin(&mut self, origin: &str) -> bool {
        self.active_origins.insert(origin.to_string())
    }

    pub fn release_origin(&mut self, origin: &str) {
        self.active_origins.remove(origin);
    }
}

/// Shared handle on [`EngineState`].
pub type SharedState = Arc<Mutex<EngineState>>;

/// Captured passthrough output, keyed origin → field name.
///
/// Populated by passthrough jobs that carry a `FIELDNAME`; read by
/// whatever operator surface wants the latest probe values.
#[derive(Clone, Default)]
pub struct FieldSink {
    inner: Arc<Mutex<HashMap<String, HashMap<String, String>>>>,
}

impl FieldSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, origin: &str, field: &str, value: &str) {
        self.inner
            .lock()
            .entry(origin.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    pub fn get(&self, origin: &str, field: &str) -> Option<String> {
        self.inner.lock().get(origin)?.get(field).cloned()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
