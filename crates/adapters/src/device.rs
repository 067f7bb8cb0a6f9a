// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-origin device command channel.
//!
//! The transport behind it (websocket session, ADB bridge, emulator API) is
//! out of scope; the engine only needs a commander handle per origin plus
//! the busy/free hooks that pause normal device operation during
//! maintenance commands.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from device channel operations
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device command failed: {0}")]
    Command(String),
    #[error("device connection lost: {0}")]
    ConnectionLost(String),
}

/// Installer payload: a file already on disk, or bytes streamed from the
/// package store.
#[derive(Debug, Clone)]
pub enum InstallPayload {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl InstallPayload {
    /// Display form for logs and call recording.
    pub fn describe(&self) -> String {
        match self {
            InstallPayload::File(path) => path.display().to_string(),
            InstallPayload::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

/// Command channel to one connected device.
#[async_trait]
pub trait DeviceCommander: Send + Sync {
    async fn install_package(
        &self,
        timeout: Duration,
        payload: InstallPayload,
    ) -> Result<bool, DeviceError>;
    async fn install_bundle(
        &self,
        timeout: Duration,
        payload: InstallPayload,
    ) -> Result<bool, DeviceError>;
    async fn reboot(&self) -> Result<bool, DeviceError>;
    async fn restart_app(&self, package: &str) -> Result<bool, DeviceError>;
    async fn stop_app(&self, package: &str) -> Result<bool, DeviceError>;
    async fn start_app(&self, package: &str) -> Result<bool, DeviceError>;
    async fn passthrough(&self, command: &str) -> Result<String, DeviceError>;
}

/// Gateway from origin to command channel.
#[async_trait]
pub trait DeviceGateway: Clone + Send + Sync + 'static {
    type Commander: DeviceCommander + Send + Sync;

    /// The device's command channel, or `None` while it has no live
    /// connection.
    async fn commander(&self, origin: &str) -> Option<Self::Commander>;

    /// Pause normal device operation for the duration of a maintenance
    /// command.
    async fn mark_busy(&self, origin: &str);

    /// Resume normal device operation.
    async fn mark_free(&self, origin: &str);
}

#[cfg(any(test, feature = "test-support"))]
#[allow(clippy::unwrap_used)]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    /// A recorded device interaction.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum DeviceCall {
        InstallPackage { origin: String, payload: String },
        InstallBundle { origin: String, payload: String },
        Reboot { origin: String },
        RestartApp { origin: String, package: String },
        StopApp { origin: String, package: String },
        StartApp { origin: String, package: String },
        Passthrough { origin: String, command: String },
        MarkBusy { origin: String },
        MarkFree { origin: String },
    }

    #[derive(Default)]
    struct FakeGatewayState {
        /// Scripted availability per origin; once the script runs out the
        /// origin falls back to `default_available`.
        availability: HashMap<String, VecDeque<bool>>,
        default_available: bool,
        /// Scripted passthrough responses per origin (fallback "OK").
        passthrough: HashMap<String, VecDeque<String>>,
        /// Scripted boolean results for non-passthrough commands
        /// (fallback true).
        results: HashMap<String, VecDeque<bool>>,
        calls: Vec<DeviceCall>,
        /// Currently executing commands per origin, and the per-origin
        /// high-water mark (for exclusivity assertions).
        active: HashMap<String, u32>,
        max_active: HashMap<String, u32>,
        command_delay: Duration,
    }

    /// Scriptable in-memory device fleet for tests.
    #[derive(Clone)]
    pub struct FakeDeviceGateway {
        inner: Arc<Mutex<FakeGatewayState>>,
    }

    impl Default for FakeDeviceGateway {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeGatewayState {
                    default_available: true,
                    ..FakeGatewayState::default()
                })),
            }
        }
    }

    impl FakeDeviceGateway {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue availability answers for an origin (consumed in order).
        pub fn script_availability(&self, origin: &str, answers: &[bool]) {
            self.inner
                .lock()
                .availability
                .entry(origin.to_string())
                .or_default()
                .extend(answers.iter().copied());
        }

        /// Make an origin permanently unavailable once its script runs out.
        pub fn set_default_available(&self, available: bool) {
            self.inner.lock().default_available = available;
        }

        /// Queue a passthrough response for an origin.
        pub fn script_passthrough(&self, origin: &str, response: &str) {
            self.inner
                .lock()
                .passthrough
                .entry(origin.to_string())
                .or_default()
                .push_back(response.to_string());
        }

        /// Queue a boolean result for the next non-passthrough command.
        pub fn script_result(&self, origin: &str, result: bool) {
            self.inner
                .lock()
                .results
                .entry(origin.to_string())
                .or_default()
                .push_back(result);
        }

        /// Hold every command open for `delay` (to surface interleaving).
        pub fn set_command_delay(&self, delay: Duration) {
            self.inner.lock().command_delay = delay;
        }

        pub fn calls(&self) -> Vec<DeviceCall> {
            self.inner.lock().calls.clone()
        }

        pub fn calls_for(&self, origin: &str) -> Vec<DeviceCall> {
            self.calls()
                .into_iter()
                .filter(|c| {
                    matches!(
                        c,
                        DeviceCall::InstallPackage { origin: o, .. }
                        | DeviceCall::InstallBundle { origin: o, .. }
                        | DeviceCall::Reboot { origin: o }
                        | DeviceCall::RestartApp { origin: o, .. }
                        | DeviceCall::StopApp { origin: o, .. }
                        | DeviceCall::StartApp { origin: o, .. }
                        | DeviceCall::Passthrough { origin: o, .. }
                        | DeviceCall::MarkBusy { origin: o }
                        | DeviceCall::MarkFree { origin: o }
                        if o == origin
                    )
                })
                .collect()
        }

        /// The most concurrent commands ever observed for an origin.
        pub fn max_active(&self, origin: &str) -> u32 {
            self.inner.lock().max_active.get(origin).copied().unwrap_or(0)
        }
    }

    impl FakeDeviceGateway {
        fn begin_command(&self, origin: &str, call: DeviceCall) -> Duration {
            let mut state = self.inner.lock();
            state.calls.push(call);
            let active = state.active.entry(origin.to_string()).or_insert(0);
            *active += 1;
            let current = *active;
            let high = state.max_active.entry(origin.to_string()).or_insert(0);
            if current > *high {
                *high = current;
            }
            state.command_delay
        }

        fn end_command(&self, origin: &str) {
            let mut state = self.inner.lock();
            if let Some(active) = state.active.get_mut(origin) {
                *active = active.saturating_sub(1);
            }
        }

        fn next_result(&self, origin: &str) -> bool {
            self.inner
                .lock()
                .results
                .get_mut(origin)
                .and_then(VecDeque::pop_front)
                .unwrap_or(true)
        }
    }

    /// Commander handle bound to one origin of the fake gateway.
    #[derive(Clone)]
    pub struct FakeDevice {
        gateway: FakeDeviceGateway,
        origin: String,
    }

    impl FakeDevice {
        async fn run_bool(&self, call: DeviceCall) -> Result<bool, DeviceError> {
            let delay = self.gateway.begin_command(&self.origin, call);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = self.gateway.next_result(&self.origin);
            self.gateway.end_command(&self.origin);
            Ok(result)
        }
    }

    #[async_trait]
    impl DeviceCommander for FakeDevice {
        async fn install_package(
            &self,
            _timeout: Duration,
            payload: InstallPayload,
        ) -> Result<bool, DeviceError> {
            self.run_bool(DeviceCall::InstallPackage {
                origin: self.origin.clone(),
                payload: payload.describe(),
            })
            .await
        }

        async fn install_bundle(
            &self,
            _timeout: Duration,
            payload: InstallPayload,
        ) -> Result<bool, DeviceError> {
            self.run_bool(DeviceCall::InstallBundle {
                origin: self.origin.clone(),
                payload: payload.describe(),
            })
            .await
        }

        async fn reboot(&self) -> Result<bool, DeviceError> {
            self.run_bool(DeviceCall::Reboot { origin: self.origin.clone() }).await
        }

        async fn restart_app(&self, package: &str) -> Result<bool, DeviceError> {
            self.run_bool(DeviceCall::RestartApp {
                origin: self.origin.clone(),
                package: package.to_string(),
            })
            .await
        }

        async fn stop_app(&self, package: &str) -> Result<bool, DeviceError> {
            self.run_bool(DeviceCall::StopApp {
                origin: self.origin.clone(),
                package: package.to_string(),
            })
            .await
        }

        async fn start_app(&self, package: &str) -> Result<bool, DeviceError> {
            self.run_bool(DeviceCall::StartApp {
                origin: self.origin.clone(),
                package: package.to_string(),
            })
            .await
        }

        async fn passthrough(&self, command: &str) -> Result<String, DeviceError> {
            let delay = self.gateway.begin_command(
                &self.origin,
                DeviceCall::Passthrough {
                    origin: self.origin.clone(),
                    command: command.to_string(),
                },
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let response = self
                .gateway
                .inner
                .lock()
                .passthrough
                .get_mut(&self.origin)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| "OK".to_string());
            self.gateway.end_command(&self.origin);
            Ok(response)
        }
    }

    #[async_trait]
    impl DeviceGateway for FakeDeviceGateway {
        type Commander = FakeDevice;

        async fn commander(&self, origin: &str) -> Option<FakeDevice> {
            let available = {
                let mut state = self.inner.lock();
                let scripted = state
                    .availability
                    .get_mut(origin)
                    .and_then(VecDeque::pop_front);
                scripted.unwrap_or(state.default_available)
            };
            if available {
                Some(FakeDevice { gateway: self.clone(), origin: origin.to_string() })
            } else {
                None
            }
        }

        async fn mark_busy(&self, origin: &str) {
            self.inner
                .lock()
                .calls
                .push(DeviceCall::MarkBusy { origin: origin.to_string() });
        }

        async fn mark_free(&self, origin: &str) {
            self.inner
                .lock()
                .calls
                .push(DeviceCall::MarkFree { origin: origin.to_string() });
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{DeviceCall, FakeDevice, FakeDeviceGateway};

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
