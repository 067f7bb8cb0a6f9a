// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker loop: pull a job id, gate it, execute it, disposition the
//! result.
//!
//! Workers never hold the state mutex across an await point; every device
//! interaction runs against a snapshot taken inside a critical section.

use crate::config::OrchestratorConfig;
use crate::decision::{self, Disposition, GateView};
use crate::dispatch;
use crate::ops;
use crate::queue::DispatchQueue;
use crate::state::{FieldSink, SharedState};
use dj_adapters::{DeviceGateway, JobReport, NotifyAdapter, PackageStore};
use dj_core::{ChainEntry, ChainStatus, Clock, JobId, JobOutcome, JobRecord, JobStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything one worker task needs, cheaply cloneable.
pub(crate) struct WorkerCtx<G, P, N, C> {
    pub config: Arc<OrchestratorConfig>,
    pub state: SharedState,
    pub queue: DispatchQueue,
    pub sink: FieldSink,
    pub gateway: G,
    pub store: P,
    pub notifier: Option<N>,
    pub clock: C,
    pub cancel: CancellationToken,
}

impl<G: Clone, P: Clone, N: Clone, C: Clone> Clone for WorkerCtx<G, P, N, C> {
    fn clone(&self) -> Self {
        Self {
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
}

/// Sleep unless cancelled first; returns true on cancellation.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

pub(crate) async fn run<G, P, N, C>(ctx: WorkerCtx<G, P, N, C>, index: usize)
where
    G: DeviceGateway,
    P: PackageStore,
    N: NotifyAdapter,
    C: Clock,
{
    tracing::info!(worker = index, "starting device job worker");
    if pause(&ctx.cancel, ctx.config.pacing.startup_delay()).await {
        return;
    }
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let Some(id) = ctx.queue.pop() else {
            if pause(&ctx.cancel, ctx.config.pacing.idle_poll()).await {
                break;
            }
            continue;
        };
        step(&ctx, id).await;
    }
    tracing::info!(worker = index, "device job worker stopped");
}

/// Handle one dequeued id end to end.
async fn step<G, P, N, C>(ctx: &WorkerCtx<G, P, N, C>, id: JobId)
where
    G: DeviceGateway,
    P: PackageStore,
    N: NotifyAdapter,
    C: Clock,
{
    // Claim phase: record lookup and origin exclusivity in one critical
    // section. The guard must not outlive the block; the worker future
    // has to stay Send across the pauses below.
    let claimed = {
        let mut state = ctx.state.lock();
        let Some(record) = state.records.get(&id).cloned() else {
            // Dropped while queued (Disposition::Discard).
            return;
        };
        let origin = record.origin.clone();
        if state.try_claim_origin(&origin) {
            let chain = state.chain_mut(&record.chain_id).clone();
            Some((record, chain, origin))
        } else {
            None
        }
    };
    let Some((record, chain, origin)) = claimed else {
        // Disposition::Busy: another worker owns this origin.
        ctx.queue.push(id);
        pause(&ctx.cancel, ctx.config.pacing.busy_retry()).await;
        return;
    };

    let now_ms = ctx.clock.epoch_ms();
    let disposition = decision::evaluate(GateView { record: &record, chain: &chain, now_ms });

    match disposition {
        Disposition::Discard | Disposition::Busy => {
            // Produced only by the claim phase above.
        }
        Disposition::Abort => {
            tracing::error!(job = %id, origin = %origin, file = %record.file,
                "breaking up job, previous job in chain was faulty");
            {
                let mut state = ctx.state.lock();
                state.set_status(&id, JobStatus::Terminated);
                state.release_origin(&origin);
            }
            notify(ctx, &id, JobOutcome::Terminated).await;
        }
        Disposition::DeferFirstOccurrence => {
            let minutes =
                chain.recurrence_minutes(ctx.clock.local_now()) + record.wait_time_min;
            let due = now_ms + (minutes.max(0) as u64) * 60_000;
            tracing::debug!(job = %id, origin = %origin, due_ms = due,
                "recurring job queued for its first scheduled occurrence");
            let mut state = ctx.state.lock();
            if let Some(r) = state.records.get_mut(&id) {
                r.processing_at_ms = Some(due);
            }
            let entry = state.chain_mut(&record.chain_id);
            entry.last_job = Some(id.clone());
            entry.last_status = Some(ChainStatus::Future);
            ops::requeue(&mut state, &ctx.queue, &id, JobStatus::Future, record.counter);
            state.release_origin(&origin);
        }
        Disposition::DeferWait => {
            let due = now_ms + (record.wait_time_min.max(0) as u64) * 60_000;
            tracing::debug!(job = %id, origin = %origin, due_ms = due,
                "job deferred by its wait time");
            let mut state = ctx.state.lock();
            if let Some(r) = state.records.get_mut(&id) {
                r.processing_at_ms = Some(due);
            }
            let entry = state.chain_mut(&record.chain_id);
            entry.last_job = Some(id.clone());
            entry.last_status = Some(ChainStatus::Success);
            ops::requeue(&mut state, &ctx.queue, &id, JobStatus::Future, record.counter);
            state.release_origin(&origin);
        }
        Disposition::WaitForPredecessor => {
            tracing::debug!(job = %id, origin = %origin,
                "job re-queued, predecessor in chain not processed yet");
            let mut state = ctx.state.lock();
            ops::requeue(&mut state, &ctx.queue, &id, JobStatus::Future, record.counter);
            state.release_origin(&origin);
        }
        Disposition::NotDue => {
            {
                let mut state = ctx.state.lock();
                ops::requeue(&mut state, &ctx.queue, &id, JobStatus::Future, record.counter);
                state.release_origin(&origin);
            }
            pause(&ctx.cancel, ctx.config.pacing.busy_retry()).await;
        }
        Disposition::Execute => {
            execute(ctx, &id, &record, &chain, &origin).await;
        }
    }
}

/// The execution phase: up to three attempts against the device, then the
/// post-execution disposition.
async fn execute<G, P, N, C>(
    ctx: &WorkerCtx<G, P, N, C>,
    id: &JobId,
    record: &JobRecord,
    chain: &ChainEntry,
    origin: &str,
) where
    G: DeviceGateway,
    P: PackageStore,
    N: NotifyAdapter,
    C: Clock,
{
    tracing::info!(job = %id, origin = %origin, file = %record.file, "job started");
    {
        let mut state = ctx.state.lock();
        state.active_jobs.insert(id.clone());
        if let Some(r) = state.records.get_mut(id) {
            r.clear_due();
            r.status = JobStatus::Processing;
            r.last_process_ms = Some(ctx.clock.epoch_ms());
        }
        state.persist();
    }

    let mut outcome = JobOutcome::Unknown;
    let mut errors = 0;

    while !outcome.is_success_class() && errors < 3 {
        let Some(commander) = ctx.gateway.commander(origin).await else {
            errors += 1;
            tracing::error!(job = %id, origin = %origin, file = %record.file,
                "cannot start job, device not connected");
            {
                let mut state = ctx.state.lock();
                if let Some(r) = state.records.get_mut(id) {
                    r.last_attempt = Some(ChainStatus::NotConnected);
                }
                let entry = state.chain_mut(&record.chain_id);
                entry.last_status = Some(ChainStatus::NotConnected);
                entry.last_job = Some(id.clone());
                state.persist();
            }
            outcome = JobOutcome::Noconnect;
            tokio::time::sleep(ctx.config.pacing.disconnect_retry()).await;
            continue;
        };

        ctx.gateway.mark_busy(origin).await;
        ctx.state.lock().set_status(id, JobStatus::Starting);

        let result =
            dispatch::dispatch(record, &commander, &ctx.store, &ctx.sink, &ctx.config).await;

        match result {
            Ok(out) => {
                if let Some(returning) = &out.returning {
                    let mut state = ctx.state.lock();
                    if let Some(r) = state.records.get_mut(id) {
                        r.returning = Some(returning.clone());
                    }
                    state.persist();
                }
                if out.ok {
                    tracing::info!(job = %id, origin = %origin, file = %record.file,
                        "job executed successfully");
                    let final_status = out.short_circuit.unwrap_or(JobStatus::Success);
                    outcome = match final_status {
                        JobStatus::NotRequired => JobOutcome::NotRequired,
                        JobStatus::NotSupported => JobOutcome::NotSupported,
                        _ => JobOutcome::Success,
                    };
                    let mut state = ctx.state.lock();
                    if let Some(r) = state.records.get_mut(id) {
                        r.status = final_status;
                    }
                    let entry = state.chain_mut(&record.chain_id);
                    entry.last_status = Some(ChainStatus::Success);
                    entry.last_job = Some(id.clone());
                    state.persist();
                } else {
                    errors += 1;
                    tracing::error!(job = %id, origin = %origin, file = %record.file,
                        "job could not be executed successfully");
                    outcome = JobOutcome::Failure;
                    let mut state = ctx.state.lock();
                    if let Some(r) = state.records.get_mut(id) {
                        r.last_attempt = Some(ChainStatus::Failure);
                    }
                    let entry = state.chain_mut(&record.chain_id);
                    entry.last_status = Some(ChainStatus::Failure);
                    entry.last_job = Some(id.clone());
                    state.persist();
                }
            }
            Err(e) => {
                errors += 1;
                tracing::error!(job = %id, origin = %origin, file = %record.file, error = %e,
                    "job interrupted by a device fault");
                outcome = JobOutcome::Failure;
                let mut state = ctx.state.lock();
                if let Some(r) = state.records.get_mut(id) {
                    r.status = JobStatus::Interrupted;
                }
                let entry = state.chain_mut(&record.chain_id);
                entry.last_status = Some(ChainStatus::Interrupted);
                entry.last_job = Some(id.clone());
                state.persist();
            }
        }
        ctx.gateway.mark_free(origin).await;
    }

    disposition_after_execution(ctx, id, record, chain, origin, outcome).await;

    notify(ctx, id, outcome).await;

    {
        let mut state = ctx.state.lock();
        state.active_jobs.remove(id);
        state.release_origin(origin);
    }
    pause(&ctx.cancel, ctx.config.pacing.inter_job_pause()).await;
}

/// Post-execution disposition: mark faulty, restart for redo, or schedule
/// the no-connect retry.
async fn disposition_after_execution<G, P, N, C>(
    ctx: &WorkerCtx<G, P, N, C>,
    id: &JobId,
    record: &JobRecord,
    chain: &ChainEntry,
    origin: &str,
    outcome: JobOutcome,
) where
    G: DeviceGateway,
    P: PackageStore,
    N: NotifyAdapter,
    C: Clock,
{
    let budget = ctx.config.restart_notconnect_min;

    if outcome == JobOutcome::Noconnect && budget == 0 {
        tracing::error!(job = %id, origin = %origin, file = %record.file,
            "job failed 3 times in a row, aborting");
        let mut state = ctx.state.lock();
        if let Some(r) = state.records.get_mut(id) {
            r.status = JobStatus::Faulty;
        }
        state.chain_mut(&record.chain_id).last_status = Some(ChainStatus::Faulty);
        state.persist();

        if record.redo && chain.redo_on_error {
            tracing::info!(job = %id, origin = %origin, file = %record.file,
                "re-adding automatic job after fault");
            if let Err(e) = ops::restart_job(&mut state, &ctx.queue, &ctx.clock, id) {
                tracing::error!(job = %id, error = %e, "restart after fault failed");
            }
            let entry = state.chain_mut(&record.chain_id);
            entry.last_job = Some(id.clone());
            entry.last_status = Some(ChainStatus::Success);
        }
    } else if outcome.is_success_class() && record.redo {
        tracing::info!(job = %id, origin = %origin, file = %record.file,
            "re-adding automatic job");
        let mut state = ctx.state.lock();
        if let Err(e) = ops::restart_job(&mut state, &ctx.queue, &ctx.clock, id) {
            tracing::error!(job = %id, error = %e, "restart after success failed");
        }
    } else if outcome == JobOutcome::Noconnect && budget > 0 {
        tracing::error!(job = %id, origin = %origin, file = %record.file,
            "job failed 3 times in a row, re-queued");
        let due = ctx.clock.epoch_ms() + (budget.max(0) as u64) * 60_000;
        let mut state = ctx.state.lock();
        if let Some(r) = state.records.get_mut(id) {
            r.processing_at_ms = Some(due);
        }
        let entry = state.chain_mut(&record.chain_id);
        entry.last_job = Some(id.clone());
        entry.last_status = Some(ChainStatus::Future);
        ops::requeue(&mut state, &ctx.queue, id, JobStatus::Future, record.counter);
    }
}

/// Send the outcome report for automatic jobs whose outcome is on the
/// configured allow-list. Failures are logged and swallowed.
async fn notify<G, P, N, C>(ctx: &WorkerCtx<G, P, N, C>, id: &JobId, outcome: JobOutcome)
where
    G: DeviceGateway,
    P: PackageStore,
    N: NotifyAdapter,
    C: Clock,
{
    let Some(notifier) = &ctx.notifier else {
        return;
    };
    if !ctx.config.notify_outcomes.contains(&outcome) {
        return;
    }
    let report = {
        let state = ctx.state.lock();
        let Some(record) = state.records.get(id) else {
            return;
        };
        if !record.auto {
            return;
        }
        JobReport {
            origin: record.origin.clone(),
            job_name: record.job_name.clone(),
            returning: record.returning.clone().unwrap_or_else(|| "-".to_string()),
            outcome,
            next_run_ms: record.processing_at_ms,
        }
    };
    if let Err(e) = notifier.notify(&report).await {
        tracing::warn!(job = %id, error = %e, "job status notification failed");
    }
}
