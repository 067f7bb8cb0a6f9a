// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and chain identifiers.
//!
//! Ids are minted by a process-wide monotonic [`IdGen`] rather than derived
//! from wall-clock seconds, so concurrently created records can never collide
//! and a chain's subjob ids sort in creation order without inter-record
//! delays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Define a newtype id wrapper around `SmolStr` with a type prefix.
///
/// Generates `from_string()`, `as_str()`, `suffix()`, `Display`, `From`,
/// `PartialEq<str>`, and `Borrow<str>` implementations. Ids are minted by
/// [`IdGen`], not by the type itself.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub smol_str::SmolStr);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Create an id from an existing string (for parsing/deserialization)
            pub fn from_string(id: impl Into<smol_str::SmolStr>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The id without its type prefix.
            pub fn suffix(&self) -> &str {
                self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one job record.
    ///
    /// Never reused while the record exists in the store.
    pub struct JobId("job-");
}

define_id! {
    /// Identifier of the chain a job record belongs to.
    ///
    /// A standalone job is its own chain; see [`ChainId::for_job`].
    pub struct ChainId("chn-");
}

impl ChainId {
    /// The chain id of a standalone job (same sequence number as the job id).
    pub fn for_job(job: &JobId) -> Self {
        Self::from_string(format!("{}{}", Self::PREFIX, job.suffix()))
    }
}

/// Monotonic id generator shared across the process.
///
/// One counter backs both job and chain ids, so the two namespaces never
/// carry the same sequence number. Ids are zero-padded decimal and therefore
/// sort lexicographically in allocation order.
#[derive(Clone, Debug)]
pub struct IdGen {
    next: Arc<AtomicU64>,
}

impl IdGen {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start the counter at `n` (used when resuming over an existing log).
    pub fn starting_at(n: u64) -> Self {
        Self { next: Arc::new(AtomicU64::new(n)) }
    }

    fn next_seq(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_job(&self) -> JobId {
        JobId::from_string(format!("{}{:012}", JobId::PREFIX, self.next_seq()))
    }

    pub fn next_chain(&self) -> ChainId {
        ChainId::from_string(format!("{}{:012}", ChainId::PREFIX, self.next_seq()))
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
