// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatch queue: job ids awaiting worker attention.
//!
//! Deferred and blocked records cycle through here repeatedly; ordering is
//! FIFO but carries no fairness guarantee beyond that.

use dj_core::JobId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct DispatchQueue {
    inner: Arc<Mutex<VecDeque<JobId>>>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, id: JobId) {
        self.inner.lock().push_back(id);
    }

    pub fn pop(&self) -> Option<JobId> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
