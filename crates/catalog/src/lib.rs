// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dj-catalog: job definition loading.
//!
//! Parses the static command-template set (`commands.json` plus any number
//! of personal override files) and the recurring job definitions
//! (`autocommands.json`) into the shapes the engine expands into job records.

mod autojob;
mod load;
mod template;

pub use autojob::AutoJobDef;
pub use load::{load, CatalogError, CatalogPaths};
pub use template::{Catalog, CommandTemplate, SubjobSpec};
