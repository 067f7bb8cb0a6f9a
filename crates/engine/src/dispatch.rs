// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution: one job record against one connected device.
//!
//! Returns `Ok(outcome)` for anything the device answered, including
//! command failures; `Err` is reserved for transport faults mid-command,
//! which the worker records as an interruption.

use crate::config::OrchestratorConfig;
use crate::state::FieldSink;
use dj_adapters::{Arch, DeviceCommander, DeviceError, InstallPayload, PackageStore};
use dj_core::{JobKind, JobRecord, JobStatus};
use std::sync::LazyLock;
use std::time::Duration;

const PACKAGE_INSTALL_TIMEOUT: Duration = Duration::from_secs(300);
const BUNDLE_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

// Literal patterns, known to compile.
#[allow(clippy::unwrap_used)]
static ARCH_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\[(\S+)\]").unwrap());

#[allow(clippy::unwrap_used)]
static VERSION_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"versionName=([0-9.]+)").unwrap());

/// What one dispatch pass produced.
#[derive(Debug, Default, PartialEq)]
pub struct DispatchOutcome {
    /// Command-level success (a `false` costs one attempt).
    pub ok: bool,
    /// Benign terminal status claimed by the command itself
    /// (`not required` / `not supported`).
    pub short_circuit: Option<JobStatus>,
    /// Captured passthrough output.
    pub returning: Option<String>,
}

impl DispatchOutcome {
    fn success() -> Self {
        Self { ok: true, ..Self::default() }
    }

    fn failure() -> Self {
        Self::default()
    }

    fn done(status: JobStatus) -> Self {
        Self { ok: true, short_circuit: Some(status), ..Self::default() }
    }
}

/// Execute one record's command against its device.
pub async fn dispatch<D, P>(
    record: &JobRecord,
    commander: &D,
    store: &P,
    sink: &FieldSink,
    config: &OrchestratorConfig,
) -> Result<DispatchOutcome, DeviceError>
where
    D: DeviceCommander + ?Sized,
    P: PackageStore,
{
    match record.kind {
        JobKind::Installation => install(record, commander, config).await,
        JobKind::SmartUpdate => smart_update(record, commander, store).await,
        JobKind::Reboot => {
            let ok = commander.reboot().await?;
            Ok(DispatchOutcome { ok, ..DispatchOutcome::default() })
        }
        JobKind::Restart => {
            let ok = commander.restart_app(&config.monitored_app).await?;
            Ok(DispatchOutcome { ok, ..DispatchOutcome::default() })
        }
        JobKind::Stop => {
            let ok = commander.stop_app(&config.monitored_app).await?;
            Ok(DispatchOutcome { ok, ..DispatchOutcome::default() })
        }
        JobKind::Start => {
            let ok = commander.start_app(&config.monitored_app).await?;
            Ok(DispatchOutcome { ok, ..DispatchOutcome::default() })
        }
        JobKind::Passthrough => passthrough(record, commander, sink).await,
        JobKind::Chain => {
            // Chain records never reach dispatch; expansion replaced them
            // with their subjobs.
            tracing::error!(job = %record.id, "chain record reached dispatch");
            Ok(DispatchOutcome::failure())
        }
    }
}

/// File installation: extension picks the transfer mode and timeout.
async fn install<D>(
    record: &JobRecord,
    commander: &D,
    config: &OrchestratorConfig,
) -> Result<DispatchOutcome, DeviceError>
where
    D: DeviceCommander + ?Sized,
{
    let lower = record.file.to_lowercase();
    let path = config.upload_path.join(&record.file);
    let ok = if lower.ends_with(".apk") {
        commander
            .install_package(PACKAGE_INSTALL_TIMEOUT, InstallPayload::File(path))
            .await?
    } else if lower.ends_with(".zip") {
        commander
            .install_bundle(BUNDLE_INSTALL_TIMEOUT, InstallPayload::File(path))
            .await?
    } else {
        tracing::warn!(job = %record.id, file = %record.file, "unknown install file type");
        false
    };
    Ok(DispatchOutcome { ok, ..DispatchOutcome::default() })
}

/// Raw shell passthrough.
///
/// Output is flattened for the log (no CR/LF, double spaces collapsed)
/// and mirrored into the per-origin field sink when the record carries a
/// field name. A literal `KO` anywhere in the reply marks the command
/// failed.
async fn passthrough<D>(
    record: &JobRecord,
    commander: &D,
    sink: &FieldSink,
) -> Result<DispatchOutcome, DeviceError>
where
    D: DeviceCommander + ?Sized,
{
    let raw = commander.passthrough(&record.file).await?;
    let flattened = raw.replace('\r', "").replace('\n', "").replace("  ", "");
    if let Some(field) = &record.field_name {
        sink.set(&record.origin, field, &flattened);
    }
    let ok = !flattened.contains("KO");
    Ok(DispatchOutcome { ok, short_circuit: None, returning: Some(flattened) })
}

/// Conditional package update: probe the device, compare against the
/// stored build, install only when the store is ahead.
async fn smart_update<D, P>(
    record: &JobRecord,
    commander: &D,
    store: &P,
) -> Result<DispatchOutcome, DeviceError>
where
    D: DeviceCommander + ?Sized,
    P: PackageStore,
{
    let package = &record.file;

    let arch_reply = commander.passthrough("getprop ro.product.cpu.abi").await?;
    let Some(arch_raw) = first_capture(&ARCH_PATTERN, &arch_reply) else {
        tracing::warn!(origin = %record.origin, "unable to determine device architecture");
        return Ok(DispatchOutcome::failure());
    };
    let Some(mut arch) = Arch::from_probe(&arch_raw) else {
        tracing::warn!(origin = %record.origin, arch = %arch_raw, "unrecognized device architecture");
        return Ok(DispatchOutcome::failure());
    };

    let version_reply = commander
        .passthrough(&format!("dumpsys package {} | grep versionName", package))
        .await?;
    let device_version = match first_capture(&VERSION_PATTERN, &version_reply) {
        Some(version) => Some(version),
        None => {
            let first_line = version_reply.lines().next().unwrap_or("").trim();
            if first_line == "OK" {
                tracing::info!(origin = %record.origin, package = %package,
                    "no version information returned, assuming package is not installed");
                None
            } else {
                tracing::warn!(origin = %record.origin, package = %package,
                    reply = %version_reply, "unable to determine installed version");
                return Ok(DispatchOutcome::failure());
            }
        }
    };

    let Some(available) = store.current_package_info(package).await else {
        tracing::warn!(package = %package, "no stored package available");
        return Ok(DispatchOutcome::failure());
    };
    // Architecture-independent fallback when no arch-specific build exists.
    let meta = match available.get(&arch) {
        Some(meta) => meta,
        None => {
            arch = Arch::Noarch;
            match available.get(&arch) {
                Some(meta) => meta,
                None => {
                    tracing::warn!(package = %package, arch = %arch, "no stored package for architecture");
                    return Ok(DispatchOutcome::failure());
                }
            }
        }
    };
    if meta.filename.is_none() {
        tracing::warn!(package = %package, arch = %arch, "stored package has no file");
        return Ok(DispatchOutcome::failure());
    }

    if !store.is_supported_version(arch, &meta.version).await {
        return Ok(DispatchOutcome::done(JobStatus::NotSupported));
    }
    if !is_newer_version(&meta.version, device_version.as_deref()) {
        tracing::info!(origin = %record.origin, package = %package, version = %meta.version,
            "device already carries the stored version");
        return Ok(DispatchOutcome::done(JobStatus::NotRequired));
    }

    tracing::info!(origin = %record.origin, package = %package, version = %meta.version,
        "smart update installation starting");
    let bytes = match store.stream_package(package, arch).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(package = %package, arch = %arch, error = %e, "package stream failed");
            return Ok(DispatchOutcome::failure());
        }
    };
    let payload = InstallPayload::Bytes(bytes);
    let ok = if meta.mimetype == "application/zip" {
        commander.install_bundle(PACKAGE_INSTALL_TIMEOUT, payload).await?
    } else {
        commander.install_package(PACKAGE_INSTALL_TIMEOUT, payload).await?
    };
    Ok(if ok { DispatchOutcome::success() } else { DispatchOutcome::failure() })
}

fn first_capture(pattern: &regex::Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Dotted numeric version comparison; a missing device version means the
/// package is not installed and any stored build counts as newer.
fn is_newer_version(stored: &str, device: Option<&str>) -> bool {
    let Some(device) = device else {
        return true;
    };
    let parse = |v: &str| -> Vec<u64> {
        v.split('.').map(|s| s.parse().unwrap_or(0)).collect()
    };
    let stored = parse(stored);
    let device = parse(device);
    let len = stored.len().max(device.len());
    for i in 0..len {
        let s = stored.get(i).copied().unwrap_or(0);
        let d = device.get(i).copied().unwrap_or(0);
        if s != d {
            return s > d;
        }
    }
    false
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
