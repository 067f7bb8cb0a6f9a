// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record-level operations shared by the operator surface and the workers:
//! chain expansion, the create-or-requeue upsert, and the redo-aware
//! restart.

use crate::error::EngineError;
use crate::queue::DispatchQueue;
use crate::state::EngineState;
use dj_catalog::Catalog;
use dj_core::{ChainId, Clock, IdGen, JobId, JobKind, JobRecord, JobStatus};

/// Insert a freshly minted record and queue it.
pub(crate) fn insert(state: &mut EngineState, queue: &DispatchQueue, record: JobRecord) {
    let id = record.id.clone();
    state.records.insert(id.clone(), record);
    state.persist();
    queue.push(id);
}

/// Re-queue an existing record, updating only status and counter.
pub(crate) fn requeue(
    state: &mut EngineState,
    queue: &DispatchQueue,
    id: &JobId,
    status: JobStatus,
    counter: u32,
) {
    if let Some(record) = state.records.get_mut(id) {
        record.status = status;
        record.counter = counter;
        state.persist();
        queue.push(id.clone());
    }
}

/// Expand a job submission into queued records.
///
/// `Chain` submissions expand the named template into one record per
/// subjob, all sharing the chain id; anything else produces exactly one
/// record whose payload is `job` itself. The chain's ledger entry is
/// reset so the new occurrence starts from a clean slate.
pub(crate) fn preadd_job(
    state: &mut EngineState,
    queue: &DispatchQueue,
    ids: &IdGen,
    catalog: &Catalog,
    origin: &str,
    job: &str,
    kind: JobKind,
    chain_id: Option<ChainId>,
) -> Result<ChainId, EngineError> {
    let chain_id = chain_id.unwrap_or_else(|| ids.next_chain());
    let entry = state.chain_mut(&chain_id);
    entry.reset();
    let redo = entry.redo;
    let auto = entry.auto;

    tracing::info!(origin = %origin, job = %job, kind = %kind, chain = %chain_id, "adding job");

    if kind == JobKind::Chain {
        let template = catalog
            .template(job)
            .ok_or_else(|| EngineError::UnknownTemplate(job.to_string()))?;
        for subjob in template.subjobs() {
            let record = JobRecord {
                id: ids.next_job(),
                origin: origin.to_string(),
                kind: subjob.kind,
                file: subjob.syntax.clone(),
                job_name: job.to_string(),
                field_name: subjob.field_name.clone(),
                chain_id: chain_id.clone(),
                status: JobStatus::Pending,
                counter: 0,
                wait_time_min: subjob.wait_time_min,
                processing_at_ms: None,
                redo,
                auto,
                returning: None,
                last_attempt: None,
                last_process_ms: None,
            };
            insert(state, queue, record);
        }
    } else {
        let id = ids.next_job();
        let record = JobRecord {
            id,
            origin: origin.to_string(),
            kind,
            file: job.to_string(),
            job_name: job.to_string(),
            field_name: None,
            chain_id: chain_id.clone(),
            status: JobStatus::Pending,
            counter: 0,
            wait_time_min: 0,
            processing_at_ms: None,
            redo,
            auto,
            returning: None,
            last_attempt: None,
            last_process_ms: None,
        };
        insert(state, queue, record);
    }
    Ok(chain_id)
}

/// Redo-aware restart.
///
/// A redo record is scheduled one recurrence interval (plus its own wait
/// time) out with a reset counter; a plain record is re-queued
/// immediately.
pub(crate) fn restart_job<C: Clock>(
    state: &mut EngineState,
    queue: &DispatchQueue,
    clock: &C,
    id: &JobId,
) -> Result<(), EngineError> {
    let (chain_id, redo, wait_time) = {
        let record = state
            .records
            .get(id)
            .ok_or_else(|| EngineError::JobNotFound(id.to_string()))?;
        (record.chain_id.clone(), record.redo, record.wait_time_min)
    };

    if redo {
        let minutes = state.chain_mut(&chain_id).recurrence_minutes(clock.local_now()) + wait_time;
        let due = clock.epoch_ms() + (minutes.max(0) as u64) * 60_000;
        if let Some(record) = state.records.get_mut(id) {
            record.processing_at_ms = Some(due);
        }
        requeue(state, queue, id, JobStatus::Future, 0);
    } else {
        if let Some(record) = state.records.get_mut(id) {
            record.clear_due();
        }
        requeue(state, queue, id, JobStatus::Requeued, 0);
    }
    Ok(())
}
