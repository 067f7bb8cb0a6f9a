// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dj-adapters: seams to the external collaborators.
//!
//! The device command channel, the package store, and the outbound notifier
//! are trait adapters so the engine stays testable without a device fleet.

pub mod device;
pub mod notify;
pub mod package;

pub use device::{DeviceCommander, DeviceError, DeviceGateway, InstallPayload};
pub use notify::{JobReport, NotifyAdapter, NotifyError, WebhookNotifyAdapter};
pub use package::{Arch, PackageError, PackageMeta, PackageStore};

#[cfg(any(test, feature = "test-support"))]
pub use device::{DeviceCall, FakeDevice, FakeDeviceGateway};
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use package::FakePackageStore;
