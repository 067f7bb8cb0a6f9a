// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command templates: name → single spec or ordered subjob list.

use crate::autojob::AutoJobDef;
use dj_core::JobKind;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// One subjob inside a chain template.
///
/// Field names are the uppercase keys used in the command files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjobSpec {
    #[serde(rename = "TYPE", deserialize_with = "de_kind", serialize_with = "ser_kind")]
    pub kind: JobKind,
    /// File path or command string, depending on `kind`.
    #[serde(rename = "SYNTAX")]
    pub syntax: String,
    /// Minutes to delay before this subjob runs.
    #[serde(rename = "WAITTIME", default)]
    pub wait_time_min: i64,
    /// Output tag for captured passthrough results.
    #[serde(rename = "FIELDNAME", default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
}

/// Template `TYPE` values accept both `"INSTALLATION"` and the legacy
/// `"JobType.INSTALLATION"` spelling.
fn de_kind<'de, D>(deserializer: D) -> Result<JobKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn ser_kind<S>(kind: &JobKind, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&kind.to_string().to_ascii_uppercase())
}

/// A named command template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandTemplate {
    /// Ordered subjob list executed as one chain.
    Chain(Vec<SubjobSpec>),
    /// Single command.
    Single(SubjobSpec),
}

impl CommandTemplate {
    /// The ordered subjobs this template expands into.
    pub fn subjobs(&self) -> &[SubjobSpec] {
        match self {
            CommandTemplate::Chain(subjobs) => subjobs,
            CommandTemplate::Single(spec) => std::slice::from_ref(spec),
        }
    }
}

/// The loaded definition set.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Command templates in definition order.
    pub templates: IndexMap<String, CommandTemplate>,
    /// Recurring job definitions.
    pub autojobs: Vec<AutoJobDef>,
}

impl Catalog {
    pub fn template(&self, name: &str) -> Option<&CommandTemplate> {
        self.templates.get(name)
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
