// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end orchestrator behavior against the fake device fleet.

use dj_adapters::{
    Arch, DeviceCall, FakeDeviceGateway, FakeNotifyAdapter, FakePackageStore, PackageMeta,
};
use dj_catalog::{Catalog, CatalogPaths};
use dj_core::{
    ChainStatus, Clock, FakeClock, JobId, JobKind, JobOutcome, JobRecordBuilder, JobStatus,
};
use dj_engine::{Orchestrator, OrchestratorConfig, Pacing};
use dj_storage::JobLog;
use std::time::Duration;

type Orch = Orchestrator<FakeDeviceGateway, FakePackageStore, FakeNotifyAdapter, FakeClock>;

struct Harness {
    orch: Orch,
    gateway: FakeDeviceGateway,
    store: FakePackageStore,
    notifier: FakeNotifyAdapter,
    clock: FakeClock,
    _dir: tempfile::TempDir,
}

fn config() -> OrchestratorConfig {
    OrchestratorConfig {
        worker_count: 1,
        pacing: Pacing::immediate(),
        ..OrchestratorConfig::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Write the definition files to disk and load them the way the daemon
/// does, so the full loader path is exercised.
fn harness_with(config: OrchestratorConfig, commands: &str, autocommands: Option<&str>) -> Harness {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("commands.json"), commands).unwrap();
    if let Some(autos) = autocommands {
        std::fs::write(dir.path().join("autocommands.json"), autos).unwrap();
    }
    let catalog: Catalog = dj_catalog::load(&CatalogPaths::under(dir.path())).unwrap();

    let gateway = FakeDeviceGateway::new();
    let store = FakePackageStore::new();
    let notifier = FakeNotifyAdapter::new();
    let clock = FakeClock::new();
    let orch = Orchestrator::new(
        config,
        catalog,
        JobLog::open(dir.path().join("update_log.json")),
        gateway.clone(),
        store.clone(),
        Some(notifier.clone()),
        clock.clone(),
    )
    .unwrap();
    Harness { orch, gateway, store, notifier, clock, _dir: dir }
}

fn harness() -> Harness {
    harness_with(config(), "{}", None)
}

async fn wait_for<F: Fn(&Orch) -> bool>(orch: &Orch, what: &str, done: F) {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !done(orch) {
        assert!(
            std::time::Instant::now() < deadline,
            "timed out waiting for {}",
            what
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn wait_for_status(orch: &Orch, id: &JobId, status: JobStatus) {
    wait_for(orch, &format!("{} to reach {}", id, status), |o| {
        o.job(id).map(|r| r.status) == Some(status)
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_command_at_a_time_per_origin() {
    let mut cfg = config();
    cfg.worker_count = 3;
    let h = harness_with(cfg, "{}", None);
    h.gateway.set_command_delay(Duration::from_millis(20));

    let mut ids = Vec::new();
    for command in ["echo one", "echo two", "echo three"] {
        h.orch
            .preadd_job("atlas-01", command, JobKind::Passthrough)
            .unwrap();
    }
    h.orch
        .preadd_job("atlas-02", "echo other", JobKind::Passthrough)
        .unwrap();
    for job in h.orch.jobs(false) {
        ids.push(job.id);
    }

    h.orch.start();
    for id in &ids {
        wait_for_status(&h.orch, id, JobStatus::Success).await;
    }
    h.orch.shutdown().await;

    assert_eq!(h.gateway.max_active("atlas-01"), 1);
    assert_eq!(h.gateway.max_active("atlas-02"), 1);
}

const CHAIN_COMMANDS: &str = r#"{
    "maintenance": [
        {"TYPE": "PASSTHROUGH", "SYNTAX": "step one"},
        {"TYPE": "PASSTHROUGH", "SYNTAX": "step two"},
        {"TYPE": "PASSTHROUGH", "SYNTAX": "step three"}
    ]
}"#;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn chain_subjobs_run_in_template_order() {
    let h = harness_with(config(), CHAIN_COMMANDS, None);
    h.orch
        .preadd_job("atlas-01", "maintenance", JobKind::Chain)
        .unwrap();
    let ids: Vec<JobId> = h.orch.jobs(false).into_iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 3);

    h.orch.start();
    for id in &ids {
        wait_for_status(&h.orch, id, JobStatus::Success).await;
    }
    h.orch.shutdown().await;

    let commands: Vec<String> = h
        .gateway
        .calls_for("atlas-01")
        .into_iter()
        .filter_map(|c| match c {
            DeviceCall::Passthrough { command, .. } => Some(command),
            _ => None,
        })
        .collect();
    assert_eq!(commands, vec!["step one", "step two", "step three"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn recurring_job_without_start_with_init_waits_one_interval() {
    let autos = r#"[
        {"origins": "atlas-01", "job": "ping", "redo": true,
         "algotype": "loop", "algovalue": 30}
    ]"#;
    let commands = r#"{"ping": [{"TYPE": "PASSTHROUGH", "SYNTAX": "echo ping"}]}"#;
    let h = harness_with(config(), commands, Some(autos));

    let start_ms = h.clock.epoch_ms();
    h.orch.start();

    // First occurrence is parked one full interval out, not executed.
    wait_for(&h.orch, "first occurrence deferral", |o| {
        o.jobs(true)
            .first()
            .map(|r| r.status == JobStatus::Future && r.processing_at_ms.is_some())
            .unwrap_or(false)
    })
    .await;
    let record = &h.orch.jobs(true)[0];
    assert_eq!(record.processing_at_ms, Some(start_ms + 30 * 60_000));
    assert!(h.gateway.calls_for("atlas-01").is_empty());
    let id = record.id.clone();

    // Once the interval elapses the job runs.
    h.clock.advance(Duration::from_secs(31 * 60));
    wait_for(&h.orch, "first occurrence execution", |o| {
        o.job(&id)
            .map(|r| r.status == JobStatus::Future && r.counter == 0 && r.returning.is_some())
            .unwrap_or(false)
            || o.job(&id).map(|r| r.status) == Some(JobStatus::Success)
    })
    .await;
    h.orch.shutdown().await;
    assert!(!h.gateway.calls_for("atlas-01").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_with_init_runs_immediately_and_reschedules() {
    let autos = r#"[
        {"origins": "atlas-01", "job": "ping", "redo": true, "startwithinit": true,
         "algotype": "loop", "algovalue": 30}
    ]"#;
    let commands = r#"{"ping": [{"TYPE": "PASSTHROUGH", "SYNTAX": "echo ping"}]}"#;
    let mut cfg = config();
    cfg.notify_outcomes = vec![JobOutcome::Success];
    let h = harness_with(cfg, commands, Some(autos));

    h.orch.start();
    // Runs without waiting, then the redo path parks the next occurrence.
    wait_for(&h.orch, "execution and reschedule", |o| {
        o.jobs(true)
            .first()
            .map(|r| r.status == JobStatus::Future && r.processing_at_ms.is_some())
            .unwrap_or(false)
    })
    .await;
    h.orch.shutdown().await;

    assert!(!h.gateway.calls_for("atlas-01").is_empty());
    // The outcome report carries the next occurrence.
    let reports = h.notifier.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, JobOutcome::Success);
    assert_eq!(reports[0].origin, "atlas-01");
    assert!(reports[0].next_run_ms.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn faulted_chain_terminates_its_successors() {
    let autos = r#"[
        {"origins": "atlas-01", "job": "upgrade", "startwithinit": true}
    ]"#;
    let commands = r#"{
        "upgrade": [
            {"TYPE": "REBOOT", "SYNTAX": "reboot"},
            {"TYPE": "PASSTHROUGH", "SYNTAX": "echo after"}
        ]
    }"#;
    let mut cfg = config();
    cfg.notify_outcomes = vec![JobOutcome::Noconnect, JobOutcome::Terminated];
    let h = harness_with(cfg, commands, Some(autos));
    h.gateway.set_default_available(false);

    h.orch.start();
    wait_for(&h.orch, "chain fault propagation", |o| {
        let jobs = o.jobs(true);
        jobs.len() == 2
            && jobs[0].status == JobStatus::Faulty
            && jobs[1].status == JobStatus::Terminated
    })
    .await;
    h.orch.shutdown().await;

    let jobs = h.orch.jobs(true);
    assert_eq!(jobs[0].last_attempt, Some(ChainStatus::NotConnected));
    // No device command was ever issued.
    assert!(h.gateway.calls_for("atlas-01").is_empty());

    let outcomes: Vec<JobOutcome> = h.notifier.reports().iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, vec![JobOutcome::Noconnect, JobOutcome::Terminated]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn redo_on_error_heals_a_faulted_chain() {
    let autos = r#"[
        {"origins": "atlas-01", "job": "ping", "redo": true, "startwithinit": true,
         "redoonerror": true, "algotype": "loop", "algovalue": 30}
    ]"#;
    let commands = r#"{"ping": [{"TYPE": "PASSTHROUGH", "SYNTAX": "echo ping"}]}"#;
    let h = harness_with(config(), commands, Some(autos));
    // Three failed connection attempts, then the device comes back.
    h.gateway.script_availability("atlas-01", &[false, false, false]);

    h.orch.start();
    // The fault is recorded, but the chain re-expands instead of sticking:
    // the next occurrence is parked one interval out.
    wait_for(&h.orch, "fault and re-expansion", |o| {
        o.jobs(true)
            .first()
            .map(|r| r.status == JobStatus::Future && r.processing_at_ms.is_some())
            .unwrap_or(false)
    })
    .await;
    let record = h.orch.jobs(true)[0].clone();
    assert_eq!(record.last_attempt, Some(ChainStatus::NotConnected));
    assert!(h.gateway.calls_for("atlas-01").is_empty());

    // Once due, the healed occurrence executes on the reconnected device.
    h.clock.advance(Duration::from_secs(31 * 60));
    wait_for(&h.orch, "healed occurrence execution", |o| {
        o.job(&record.id)
            .map(|r| r.returning.is_some())
            .unwrap_or(false)
    })
    .await;
    h.orch.shutdown().await;
    assert!(!h.gateway.calls_for("atlas-01").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_connection_attempts_with_budget_schedule_one_retry() {
    let mut cfg = config();
    cfg.restart_notconnect_min = 7;
    let h = harness_with(cfg, "{}", None);
    // Three failed connection attempts, then the device comes back.
    h.gateway.script_availability("atlas-01", &[false, false, false]);

    h.orch
        .preadd_job("atlas-01", "echo hello", JobKind::Passthrough)
        .unwrap();
    let id = h.orch.jobs(false)[0].id.clone();
    let start_ms = h.clock.epoch_ms();

    h.orch.start();
    wait_for(&h.orch, "retry scheduling", |o| {
        o.job(&id)
            .map(|r| r.status == JobStatus::Future && r.processing_at_ms.is_some())
            .unwrap_or(false)
    })
    .await;
    assert_eq!(
        h.orch.job(&id).unwrap().processing_at_ms,
        Some(start_ms + 7 * 60_000)
    );

    h.clock.advance(Duration::from_secs(8 * 60));
    wait_for_status(&h.orch, &id, JobStatus::Success).await;
    h.orch.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_sweep_cancels_stale_work_and_drops_autos() {
    let dir = tempfile::tempdir().unwrap();
    let log = JobLog::open(dir.path().join("update_log.json"));
    let mut records = std::collections::HashMap::new();
    for (suffix, status, auto) in [
        (1, JobStatus::Processing, false),
        (2, JobStatus::NotRequired, false),
        (3, JobStatus::Success, false),
        (4, JobStatus::Pending, true),
    ] {
        let record = JobRecordBuilder::new(format!("job-{:012}", suffix))
            .status(status)
            .auto(auto)
            .build();
        records.insert(record.id.clone(), record);
    }
    log.flush(&records).unwrap();

    let orch: Orch = Orchestrator::new(
        config(),
        Catalog::default(),
        log.clone(),
        FakeDeviceGateway::new(),
        FakePackageStore::new(),
        None,
        FakeClock::new(),
    )
    .unwrap();

    let jobs = orch.jobs(false);
    assert_eq!(jobs.len(), 3);
    assert_eq!(jobs[0].status, JobStatus::Cancelled);
    assert_eq!(jobs[1].status, JobStatus::Cancelled);
    assert_eq!(jobs[2].status, JobStatus::Success);
    assert!(orch.jobs(true).is_empty());

    // The sweep is durable, not just in-memory.
    let on_disk = log.load().unwrap();
    assert_eq!(on_disk.len(), 3);
    assert!(!on_disk.contains_key(&JobId::from("job-000000000004")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn smart_update_on_current_version_is_not_required() {
    let h = harness();
    h.gateway.script_passthrough("atlas-01", "[arm64-v8a]");
    h.gateway.script_passthrough("atlas-01", "versionName=0.257.0");
    h.store.insert(
        "com.nianticlabs.pokemongo",
        Arch::Arm64,
        PackageMeta {
            version: "0.257.0".to_string(),
            filename: Some("pogo.apk".to_string()),
            mimetype: "application/vnd.android.package-archive".to_string(),
        },
        vec![1, 2, 3],
    );

    h.orch
        .preadd_job("atlas-01", "com.nianticlabs.pokemongo", JobKind::SmartUpdate)
        .unwrap();
    let id = h.orch.jobs(false)[0].id.clone();

    h.orch.start();
    wait_for_status(&h.orch, &id, JobStatus::NotRequired).await;
    h.orch.shutdown().await;

    let installs = h
        .gateway
        .calls_for("atlas-01")
        .into_iter()
        .filter(|c| {
            matches!(
                c,
                DeviceCall::InstallPackage { .. } | DeviceCall::InstallBundle { .. }
            )
        })
        .count();
    assert_eq!(installs, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn passthrough_ko_reply_burns_all_attempts() {
    let h = harness();
    for _ in 0..3 {
        h.gateway.script_passthrough("atlas-01", "KO: permission denied");
    }

    h.orch
        .preadd_job("atlas-01", "rm /system/app", JobKind::Passthrough)
        .unwrap();
    let id = h.orch.jobs(false)[0].id.clone();

    h.orch.start();
    wait_for(&h.orch, "failure bookkeeping", |o| {
        o.job(&id).map(|r| r.last_attempt) == Some(Some(ChainStatus::Failure))
    })
    .await;
    h.orch.shutdown().await;

    let record = h.orch.job(&id).unwrap();
    assert_ne!(record.status, JobStatus::Success);
    // The reply is captured even though the command failed.
    assert_eq!(record.returning.as_deref(), Some("KO: permission denied"));
    let attempts = h
        .gateway
        .calls_for("atlas-01")
        .into_iter()
        .filter(|c| matches!(c, DeviceCall::Passthrough { .. }))
        .count();
    assert_eq!(attempts, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn passthrough_output_reaches_the_field_sink() {
    let commands = r#"{
        "probe": [
            {"TYPE": "PASSTHROUGH", "SYNTAX": "dumpsys battery", "FIELDNAME": "battery"}
        ]
    }"#;
    let h = harness_with(config(), commands, None);
    h.gateway.script_passthrough("atlas-01", "level:  87\n");

    h.orch.preadd_job("atlas-01", "probe", JobKind::Chain).unwrap();
    let id = h.orch.jobs(false)[0].id.clone();

    h.orch.start();
    wait_for_status(&h.orch, &id, JobStatus::Success).await;
    h.orch.shutdown().await;

    // Flattening strips line breaks and double spaces from the reply.
    assert_eq!(
        h.orch.returning("atlas-01", "battery").as_deref(),
        Some("level:87")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn manual_jobs_never_notify() {
    let mut cfg = config();
    cfg.notify_outcomes = vec![JobOutcome::Success];
    let h = harness_with(cfg, "{}", None);
    h.orch
        .preadd_job("atlas-01", "echo quiet", JobKind::Passthrough)
        .unwrap();
    let id = h.orch.jobs(false)[0].id.clone();

    h.orch.start();
    wait_for_status(&h.orch, &id, JobStatus::Success).await;
    h.orch.shutdown().await;

    assert!(h.notifier.reports().is_empty());
}
