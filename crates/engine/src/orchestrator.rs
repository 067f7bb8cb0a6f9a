// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The orchestrator: bootstrap, worker lifecycle, and the operator
//! surface.

use crate::config::OrchestratorConfig;
use crate::error::EngineError;
use crate::ops;
use crate::queue::DispatchQueue;
use crate::state::{EngineState, FieldSink, SharedState};
use crate::worker::{self, WorkerCtx};
use dj_adapters::{DeviceGateway, NotifyAdapter, PackageStore};
use dj_catalog::Catalog;
use dj_core::{ChainId, Clock, IdGen, JobId, JobKind, JobRecord};
use dj_storage::{self as storage, JobLog};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Orchestrator<G, P, N, C> {
    config: Arc<OrchestratorConfig>,
    catalog: Arc<Catalog>,
    state: SharedState,
    queue: DispatchQueue,
    sink: FieldSink,
    ids: IdGen,
    gateway: G,
    store: P,
    notifier: Option<N>,
    clock: C,
    cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<G, P, N, C> Orchestrator<G, P, N, C>
where
    G: DeviceGateway,
    P: PackageStore,
    N: NotifyAdapter,
    C: Clock,
{
    /// Build the orchestrator over an existing job log.
    ///
    /// Loads and sweeps the log (stale non-auto work cancelled, auto
    /// records purged) and seeds the id generator past every surviving
    /// sequence number.
    pub fn new(
        config: OrchestratorConfig,
        catalog: Catalog,
        log: JobLog,
        gateway: G,
        store: P,
        notifier: Option<N>,
        clock: C,
    ) -> Result<Self, EngineError> {
        let mut records = log.load()?;
        let stats = storage::sweep(&mut records);
        if stats.cancelled > 0 || stats.purged > 0 {
            tracing::info!(
                cancelled = stats.cancelled,
                purged = stats.purged,
                "job log swept on startup"
            );
        }
        log.flush(&records)?;

        let max_seq = records
            .keys()
            .filter_map(|id| id.suffix().parse::<u64>().ok())
            .chain(
                records
                    .values()
                    .filter_map(|r| r.chain_id.suffix().parse::<u64>().ok()),
            )
            .max()
            .unwrap_or(0);

        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            state: Arc::new(Mutex::new(EngineState::new(records, log))),
            queue: DispatchQueue::new(),
            sink: FieldSink::new(),
            ids: IdGen::starting_at(max_seq + 1),
            gateway,
            store,
            notifier,
            clock,
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Expand the automatic job definitions and spawn the worker tasks.
    pub fn start(&self) {
        self.load_automatic_jobs();
        let mut workers = self.workers.lock();
        for index in 0..self.config.worker_count.max(1) {
            let ctx = self.worker_ctx();
            workers.push(tokio::spawn(worker::run(ctx, index)));
        }
    }

    /// Stop the workers. In-flight device commands finish first.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "worker task join failed");
            }
        }
        tracing::info!("orchestrator stopped");
    }

    fn worker_ctx(&self) -> WorkerCtx<G, P, N, C> {
        WorkerCtx {
            config: Arc::clone(&self.config),
            state: Arc::clone(&self.state),
            queue: self.queue.clone(),
            sink: self.sink.clone(),
            gateway: self.gateway.clone(),
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            clock: self.clock.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// One ledger entry plus a chain expansion per definition × origin.
    ///
    /// A definition with a bad recurrence or an unknown template is
    /// logged and skipped; one broken entry must not block the rest.
    fn load_automatic_jobs(&self) {
        let autojobs = self.catalog.autojobs.clone();
        if autojobs.is_empty() {
            tracing::info!("no automatic jobs defined");
            return;
        }
        tracing::info!(count = autojobs.len(), "adding automatic jobs");
        for def in &autojobs {
            let recurrence = match def.recurrence() {
                Ok(recurrence) => recurrence,
                Err(e) => {
                    tracing::error!(job = %def.job, error = %e, "skipping automatic job with bad schedule");
                    continue;
                }
            };
            for origin in def.origin_list() {
                let chain_id = self.ids.next_chain();
                let result = {
                    let mut state = self.state.lock();
                    let entry = state.chain_mut(&chain_id);
                    entry.redo = def.redo;
                    entry.redo_on_error = def.redo_on_error;
                    entry.recurrence = Some(recurrence);
                    entry.start_with_init = def.start_with_init;
                    entry.auto = true;
                    ops::preadd_job(
                        &mut state,
                        &self.queue,
                        &self.ids,
                        &self.catalog,
                        origin,
                        &def.job,
                        JobKind::Chain,
                        Some(chain_id),
                    )
                };
                if let Err(e) = result {
                    tracing::error!(job = %def.job, origin = %origin, error = %e,
                        "skipping automatic job");
                }
            }
        }
    }

    /// Submit a job for an origin.
    ///
    /// `JobKind::Chain` expands the named template; any other kind takes
    /// `job` as its payload directly.
    pub fn preadd_job(
        &self,
        origin: &str,
        job: &str,
        kind: JobKind,
    ) -> Result<ChainId, EngineError> {
        let mut state = self.state.lock();
        ops::preadd_job(
            &mut state,
            &self.queue,
            &self.ids,
            &self.catalog,
            origin,
            job,
            kind,
            None,
        )
    }

    /// Re-queue a finished or failed record; redo records are scheduled
    /// one recurrence interval out instead.
    pub fn restart_job(&self, id: &JobId) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        ops::restart_job(&mut state, &self.queue, &self.clock, id)
    }

    /// Delete one record. Rejected while the record is executing.
    pub fn delete_job(&self, id: &JobId) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.active_jobs.contains(id) {
            return Err(EngineError::JobActive(id.to_string()));
        }
        if state.records.remove(id).is_none() {
            return Err(EngineError::JobNotFound(id.to_string()));
        }
        state.persist();
        Ok(())
    }

    /// Bulk record deletion.
    ///
    /// `only_success` drops completed non-redo records; otherwise every
    /// non-redo record that is not currently executing goes.
    pub fn purge_log(&self, only_success: bool) {
        let mut state = self.state.lock();
        let active = state.active_jobs.clone();
        state.records.retain(|id, record| {
            if record.redo {
                return true;
            }
            if only_success {
                !record.status.is_completed()
            } else {
                active.contains(id)
            }
        });
        state.persist();
    }

    /// Record listing for the operator surface: automatic records when
    /// `autos`, operator-submitted ones otherwise.
    pub fn jobs(&self, autos: bool) -> Vec<JobRecord> {
        let state = self.state.lock();
        let mut jobs: Vec<JobRecord> = state
            .records
            .values()
            .filter(|r| r.auto == autos)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        jobs
    }

    /// Snapshot of one record.
    pub fn job(&self, id: &JobId) -> Option<JobRecord> {
        self.state.lock().records.get(id).cloned()
    }

    /// Available command template names, in definition order.
    pub fn commands(&self) -> Vec<String> {
        self.catalog.template_names().map(String::from).collect()
    }

    /// Latest captured passthrough value for an origin's field.
    pub fn returning(&self, origin: &str, field: &str) -> Option<String> {
        self.sink.get(origin, field)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
