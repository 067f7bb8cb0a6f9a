// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job log: one JSON object keyed by job id, rewritten in full on every
//! mutation.
//!
//! The log is the durable half of the Job Record Store. The in-memory map is
//! authoritative during a run; the file exists so an operator can inspect
//! recent jobs and so a restart can cancel stale work. Recurring jobs are
//! never resumed from the log — they are re-derived from configuration — so
//! the file is fully droppable for auto records.

use dj_core::{JobId, JobRecord, JobStatus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handle on the job log file.
#[derive(Debug, Clone)]
pub struct JobLog {
    path: PathBuf,
}

impl JobLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted record map.
    ///
    /// A corrupt file is deleted and treated as empty — losing the log is
    /// recoverable, wedging startup on it is not.
    pub fn load(&self) -> Result<HashMap<JobId, JobRecord>, LogError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&text) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "corrupt job log found, deleting it; check remaining disk space or disk health"
                );
                std::fs::remove_file(&self.path)?;
                Ok(HashMap::new())
            }
        }
    }

    /// Rewrite the whole log atomically (temp file + rename).
    pub fn flush(&self, records: &HashMap<JobId, JobRecord>) -> Result<(), LogError> {
        let text = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Result of the startup sweep.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub cancelled: usize,
    pub purged: usize,
}

/// Startup sweep over a freshly loaded record map.
///
/// Auto records are purged outright (recurring chains are re-derived from
/// configuration, never resumed). Non-auto records stuck in a non-terminal
/// status are forcibly cancelled.
pub fn sweep(records: &mut HashMap<JobId, JobRecord>) -> SweepStats {
    let mut stats = SweepStats::default();
    records.retain(|id, record| {
        if record.auto {
            tracing::debug!(job = %id, "purging auto record on restart");
            stats.purged += 1;
            return false;
        }
        true
    });
    for (id, record) in records.iter_mut() {
        if record.status.is_stale_on_restart() {
            tracing::debug!(job = %id, status = %record.status, "cancelling outdated job");
            record.status = JobStatus::Cancelled;
            stats.cancelled += 1;
        }
    }
    stats
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
