// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal classification of one execution pass.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How an execution pass ended.
///
/// `NotRequired` and `NotSupported` are benign short-circuits: the device
/// was reachable and the command simply had nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobOutcome {
    Unknown,
    Success,
    Noconnect,
    Failure,
    Terminated,
    NotRequired,
    NotSupported,
}

crate::simple_display! {
    JobOutcome {
        Unknown => "UNKNOWN",
        Success => "SUCCESS",
        Noconnect => "NOCONNECT",
        Failure => "FAILURE",
        Terminated => "TERMINATED",
        NotRequired => "NOT_REQUIRED",
        NotSupported => "NOT_SUPPORTED",
    }
}

impl JobOutcome {
    /// Success-class outcomes end the 3-attempt execution loop.
    pub fn is_success_class(&self) -> bool {
        matches!(
            self,
            JobOutcome::Success | JobOutcome::NotRequired | JobOutcome::NotSupported
        )
    }
}

impl FromStr for JobOutcome {
    type Err = String;

    /// Parse a notifier allow-list entry (`"SUCCESS|FAILURE|..."` segments).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" => Ok(JobOutcome::Unknown),
            "SUCCESS" => Ok(JobOutcome::Success),
            "NOCONNECT" => Ok(JobOutcome::Noconnect),
            "FAILURE" => Ok(JobOutcome::Failure),
            "TERMINATED" => Ok(JobOutcome::Terminated),
            "NOT_REQUIRED" => Ok(JobOutcome::NotRequired),
            "NOT_SUPPORTED" => Ok(JobOutcome::NotSupported),
            _ => Err(format!("unknown job outcome '{}'", s)),
        }
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
