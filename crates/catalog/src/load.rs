// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Definition-file loading and merging.
//!
//! `commands.json` is the base set; `personal_commands/*.json` files layer
//! on top. A duplicate template name is logged and skipped — the earlier
//! definition is never overwritten. A malformed personal file is logged and
//! skipped rather than failing the whole load.

use crate::autojob::AutoJobDef;
use crate::template::{Catalog, CommandTemplate};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the definition files live.
#[derive(Debug, Clone)]
pub struct CatalogPaths {
    pub commands: PathBuf,
    pub personal_dir: PathBuf,
    pub autocommands: PathBuf,
}

impl CatalogPaths {
    /// Conventional layout under one configuration directory.
    pub fn under(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            commands: dir.join("commands.json"),
            personal_dir: dir.join("personal_commands"),
            autocommands: dir.join("autocommands.json"),
        }
    }
}

/// Load the full definition set.
///
/// Missing files yield empty sets; only unreadable/corrupt *base* files are
/// errors.
pub fn load(paths: &CatalogPaths) -> Result<Catalog, CatalogError> {
    let mut templates: IndexMap<String, CommandTemplate> = match read_json_map(&paths.commands)? {
        Some(map) => map,
        None => IndexMap::new(),
    };

    for file in personal_files(&paths.personal_dir) {
        let parsed: IndexMap<String, CommandTemplate> = match std::fs::read_to_string(&file) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(map) => map,
                Err(e) => {
                    tracing::error!(file = %file.display(), error = %e, "skipping malformed personal command file");
                    continue;
                }
            },
            Err(e) => {
                tracing::error!(file = %file.display(), error = %e, "cannot read personal command file");
                continue;
            }
        };
        for (name, template) in parsed {
            if templates.contains_key(&name) {
                tracing::error!(command = %name, file = %file.display(), "command already exists - skipping");
            } else {
                tracing::info!(command = %name, "loading personal command");
                templates.insert(name, template);
            }
        }
    }

    let autojobs: Vec<AutoJobDef> = match read_json_map(&paths.autocommands)? {
        Some(defs) => defs,
        None => Vec::new(),
    };
    if autojobs.is_empty() {
        tracing::info!("did not find any automatic jobs");
    } else {
        tracing::info!(count = autojobs.len(), "found automatic jobs");
    }

    Ok(Catalog { templates, autojobs })
}

/// Read and parse a JSON file, returning `None` when it does not exist.
fn read_json_map<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, CatalogError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .map_err(|source| CatalogError::Io { path: path.to_path_buf(), source })?;
    let parsed = serde_json::from_str(&text)
        .map_err(|source| CatalogError::Json { path: path.to_path_buf(), source })?;
    Ok(Some(parsed))
}

/// Personal override files in deterministic (sorted) order.
fn personal_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
