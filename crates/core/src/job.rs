// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job records and their status vocabulary.

use crate::chain::ChainStatus;
use crate::id::{ChainId, JobId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What a job does against its device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Installation,
    Reboot,
    Restart,
    Stop,
    Start,
    Passthrough,
    SmartUpdate,
    /// Expansion marker: the template names an ordered subjob list.
    Chain,
}

crate::simple_display! {
    JobKind {
        Installation => "installation",
        Reboot => "reboot",
        Restart => "restart",
        Stop => "stop",
        Start => "start",
        Passthrough => "passthrough",
        SmartUpdate => "smart_update",
        Chain => "chain",
    }
}

impl FromStr for JobKind {
    type Err = String;

    /// Parse a template `TYPE` value.
    ///
    /// Accepts both the bare name (`"INSTALLATION"`) and the legacy dotted
    /// spelling (`"JobType.INSTALLATION"`) found in older command files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.rsplit('.').next().unwrap_or(s);
        match name.to_ascii_uppercase().as_str() {
            "INSTALLATION" => Ok(JobKind::Installation),
            "REBOOT" => Ok(JobKind::Reboot),
            "RESTART" => Ok(JobKind::Restart),
            "STOP" => Ok(JobKind::Stop),
            "START" => Ok(JobKind::Start),
            "PASSTHROUGH" => Ok(JobKind::Passthrough),
            "SMART_UPDATE" => Ok(JobKind::SmartUpdate),
            "CHAIN" => Ok(JobKind::Chain),
            _ => Err(format!("unknown job type '{}'", s)),
        }
    }
}

/// Persisted status of a job record.
///
/// The serialized strings are the log vocabulary; several contain spaces
/// (`"not connected"`) to stay readable in the operator surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Requeued,
    Starting,
    Processing,
    Success,
    Failure,
    #[serde(rename = "not connected")]
    NotConnected,
    Future,
    Interrupted,
    Terminated,
    Cancelled,
    #[serde(rename = "not required")]
    NotRequired,
    #[serde(rename = "not supported")]
    NotSupported,
    Faulty,
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Requeued => "requeued",
        Starting => "starting",
        Processing => "processing",
        Success => "success",
        Failure => "failure",
        NotConnected => "not connected",
        Future => "future",
        Interrupted => "interrupted",
        Terminated => "terminated",
        Cancelled => "cancelled",
        NotRequired => "not required",
        NotSupported => "not supported",
        Faulty => "faulty",
    }
}

impl JobStatus {
    /// Statuses forcibly cancelled for non-auto records on restart.
    ///
    /// `not required` counts as stale too; a chain that died mid-run must
    /// not resume from a short-circuited step.
    pub fn is_stale_on_restart(&self) -> bool {
        matches!(
            self,
            JobStatus::Pending
                | JobStatus::Requeued
                | JobStatus::Starting
                | JobStatus::Processing
                | JobStatus::NotConnected
                | JobStatus::Future
                | JobStatus::NotRequired
        )
    }

    /// Statuses eligible for the bulk "delete completed" operation.
    pub fn is_completed(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::NotRequired)
    }
}

/// One queued or executed command against one device.
///
/// Serde field names match the persisted job log keys, which mirror the
/// operator surface (`jobtype`, `globalid`, `processingdate`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub origin: String,
    #[serde(rename = "jobtype")]
    pub kind: JobKind,
    /// Payload: a file path for installs, a command string for passthrough,
    /// a package name for smart updates.
    pub file: String,
    /// Display label; defaults to `file` for standalone jobs and to the
    /// template name for chain subjobs.
    #[serde(rename = "jobname")]
    pub job_name: String,
    /// Output tag for captured passthrough results.
    #[serde(rename = "fieldname", default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(rename = "globalid")]
    pub chain_id: ChainId,
    pub status: JobStatus,
    /// Execution-attempt count.
    pub counter: u32,
    /// Minutes to delay before the first/next attempt.
    #[serde(rename = "waittime", default)]
    pub wait_time_min: i64,
    /// Absolute due timestamp; present only while the record is
    /// future-scheduled, absent once due.
    #[serde(rename = "processingdate", default, skip_serializing_if = "Option::is_none")]
    pub processing_at_ms: Option<u64>,
    /// Re-expand the chain after this record completes.
    #[serde(default)]
    pub redo: bool,
    /// Created by a recurring definition, not an operator action.
    #[serde(default)]
    pub auto: bool,
    /// Captured passthrough output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returning: Option<String>,
    /// Gating status of the most recent attempt, if any.
    #[serde(rename = "laststatus", default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<ChainStatus>,
    /// Epoch ms of the most recent execution start.
    #[serde(rename = "lastprocess", default, skip_serializing_if = "Option::is_none")]
    pub last_process_ms: Option<u64>,
}

impl JobRecord {
    /// Clear the due date, marking the record as due now.
    pub fn clear_due(&mut self) {
        self.processing_at_ms = None;
    }

    /// True while the record has a due date in the future.
    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.processing_at_ms {
            Some(at) => at <= now_ms,
            None => true,
        }
    }
}

/// Test builder for [`JobRecord`].
#[cfg(any(test, feature = "test-support"))]
pub struct JobRecordBuilder {
    record: JobRecord,
}

#[cfg(any(test, feature = "test-support"))]
impl JobRecordBuilder {
    pub fn new(id: impl Into<JobId>) -> Self {
        let id = id.into();
        let chain_id = ChainId::for_job(&id);
        Self {
            record: JobRecord {
                id,
                origin: "device-1".to_string(),
                kind: JobKind::Passthrough,
                file: "echo ok".to_string(),
                job_name: "echo ok".to_string(),
                field_name: None,
                chain_id,
                status: JobStatus::Pending,
                counter: 0,
                wait_time_min: 0,
                processing_at_ms: None,
                redo: false,
                auto: false,
                returning: None,
                last_attempt: None,
                last_process_ms: None,
            },
        }
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.record.origin = origin.into();
        self
    }

    pub fn kind(mut self, kind: JobKind) -> Self {
        self.record.kind = kind;
        self
    }

    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.record.file = file.into();
        self
    }

    pub fn chain(mut self, chain_id: impl Into<ChainId>) -> Self {
        self.record.chain_id = chain_id.into();
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.record.status = status;
        self
    }

    pub fn wait_time(mut self, minutes: i64) -> Self {
        self.record.wait_time_min = minutes;
        self
    }

    pub fn due_at(mut self, epoch_ms: u64) -> Self {
        self.record.processing_at_ms = Some(epoch_ms);
        self
    }

    pub fn redo(mut self, redo: bool) -> Self {
        self.record.redo = redo;
        self
    }

    pub fn auto(mut self, auto: bool) -> Self {
        self.record.auto = auto;
        self
    }

    pub fn build(self) -> JobRecord {
        self.record
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
