// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown command template: {0}")]
    UnknownTemplate(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job is currently executing: {0}")]
    JobActive(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Catalog(#[from] dj_catalog::CatalogError),

    #[error(transparent)]
    Log(#[from] dj_storage::LogError),

    #[error(transparent)]
    Recurrence(#[from] dj_core::RecurrenceError),
}
