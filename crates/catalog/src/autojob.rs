// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automatic (recurring) job definitions from `autocommands.json`.

use dj_core::{Recurrence, RecurrenceError};
use serde::{Deserialize, Serialize};

/// One recurring definition: a template to expand for each target origin
/// on a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoJobDef {
    /// `|`-delimited target origin list.
    pub origins: String,
    /// Command-template name to expand.
    pub job: String,
    /// Re-expand the chain after each completed occurrence.
    #[serde(default)]
    pub redo: bool,
    /// Recurrence type: `"loop"` or a time-of-day marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algotype: Option<String>,
    /// Interval in minutes, or `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algovalue: Option<serde_json::Value>,
    /// Run the first occurrence immediately instead of waiting one interval.
    #[serde(rename = "startwithinit", default)]
    pub start_with_init: bool,
    /// Self-heal: re-expand even after the chain turns faulty.
    #[serde(rename = "redoonerror", default)]
    pub redo_on_error: bool,
}

impl AutoJobDef {
    /// Split the `|`-delimited origin list, dropping empty segments.
    pub fn origin_list(&self) -> Vec<&str> {
        self.origins
            .split('|')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .collect()
    }

    /// Resolve the recurrence schedule.
    ///
    /// A definition with neither `algotype` nor `algovalue` recurs with a
    /// zero-minute loop (immediately due, gated only by `waittime`).
    pub fn recurrence(&self) -> Result<Recurrence, RecurrenceError> {
        let algotype = self.algotype.as_deref().unwrap_or("loop");
        let algovalue = match &self.algovalue {
            None => "0".to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
        };
        Recurrence::parse(algotype, &algovalue)
    }
}

#[cfg(test)]
#[path = "autojob_tests.rs"]
mod tests;
