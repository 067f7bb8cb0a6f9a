// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration.
//!
//! Loaded from a TOML file in production; tests build it directly with
//! [`Pacing::immediate`] so worker loops spin without real sleeps.

use crate::error::EngineError;
use dj_core::JobOutcome;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Worker-loop pacing, all in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Delay before a worker takes its first job after startup.
    pub startup_delay_ms: u64,
    /// Re-poll delay after finding the target origin busy or a record
    /// not yet due.
    pub busy_retry_ms: u64,
    /// Poll delay while the dispatch queue is empty.
    pub idle_poll_ms: u64,
    /// Delay between connection attempts inside the execution loop.
    pub disconnect_retry_ms: u64,
    /// Pause after each finished job before the worker takes the next.
    pub inter_job_pause_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            startup_delay_ms: 10_000,
            busy_retry_ms: 1_000,
            idle_poll_ms: 2_000,
            disconnect_retry_ms: 5_000,
            inter_job_pause_ms: 10_000,
        }
    }
}

impl Pacing {
    /// All-zero pacing for tests.
    pub fn immediate() -> Self {
        Self {
            startup_delay_ms: 0,
            busy_retry_ms: 0,
            idle_poll_ms: 1,
            disconnect_retry_ms: 0,
            inter_job_pause_ms: 0,
        }
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn busy_retry(&self) -> Duration {
        Duration::from_millis(self.busy_retry_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn disconnect_retry(&self) -> Duration {
        Duration::from_millis(self.disconnect_retry_ms)
    }

    pub fn inter_job_pause(&self) -> Duration {
        Duration::from_millis(self.inter_job_pause_ms)
    }
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Number of concurrent worker tasks.
    pub worker_count: usize,
    /// Package controlled by restart/stop/start jobs.
    pub monitored_app: String,
    /// Directory holding operator-uploaded install files.
    pub upload_path: PathBuf,
    /// Minutes before retrying a job that exhausted its connection
    /// attempts. Zero marks the chain faulty instead.
    pub restart_notconnect_min: i64,
    /// Webhook endpoint for job status reports; absent disables
    /// notifications entirely.
    pub notify_url: Option<String>,
    /// Outcomes that trigger a notification.
    pub notify_outcomes: Vec<JobOutcome>,
    pub pacing: Pacing,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            monitored_app: "com.nianticlabs.pokemongo".to_string(),
            upload_path: PathBuf::from("upload"),
            restart_notconnect_min: 0,
            notify_url: None,
            notify_outcomes: vec![JobOutcome::Success],
            pacing: Pacing::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Load from a TOML file.
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Webhook notifier for the configured endpoint, if any.
    pub fn notifier(&self) -> Option<dj_adapters::WebhookNotifyAdapter> {
        self.notify_url
            .as_deref()
            .map(dj_adapters::WebhookNotifyAdapter::new)
    }

    /// Parse a `|`-delimited outcome allow-list (`"SUCCESS|FAILURE"`).
    ///
    /// Unknown segments are rejected rather than silently dropped.
    pub fn parse_notify_outcomes(raw: &str) -> Result<Vec<JobOutcome>, EngineError> {
        raw.split('|')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse().map_err(EngineError::Config))
            .collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
