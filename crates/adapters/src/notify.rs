// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort outbound notification of terminal job outcomes.

use async_trait::async_trait;
use dj_core::JobOutcome;
use serde::Serialize;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Terminal outcome report for one job.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobReport {
    pub origin: String,
    pub job_name: String,
    /// Captured passthrough output, `"-"` when absent.
    pub returning: String,
    pub outcome: JobOutcome,
    /// Next scheduled occurrence, if one exists.
    pub next_run_ms: Option<u64>,
}

/// Adapter for sending outcome notifications.
///
/// Callers treat failures as non-fatal: a lost notification never affects
/// job state.
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    async fn notify(&self, report: &JobReport) -> Result<(), NotifyError>;
}

/// Webhook adapter: POSTs the report as JSON to a configured endpoint.
#[derive(Clone)]
pub struct WebhookNotifyAdapter {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifyAdapter {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl NotifyAdapter for WebhookNotifyAdapter {
    async fn notify(&self, report: &JobReport) -> Result<(), NotifyError> {
        tracing::info!(origin = %report.origin, job = %report.job_name, "sending job status webhook");
        let response = self
            .client
            .post(&self.url)
            .json(report)
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake notification adapter recording every report.
    #[derive(Clone, Default)]
    pub struct FakeNotifyAdapter {
        reports: Arc<Mutex<Vec<JobReport>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl FakeNotifyAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent sends fail (reports are still recorded).
        pub fn fail_sends(&self) {
            *self.fail.lock() = true;
        }

        pub fn reports(&self) -> Vec<JobReport> {
            self.reports.lock().clone()
        }
    }

    #[async_trait]
    impl NotifyAdapter for FakeNotifyAdapter {
        async fn notify(&self, report: &JobReport) -> Result<(), NotifyError> {
            self.reports.lock().push(report.clone());
            if *self.fail.lock() {
                return Err(NotifyError::SendFailed("scripted failure".to_string()));
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifyAdapter;

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
