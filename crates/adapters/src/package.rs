// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The package store seam (APK storage/versioning subsystem).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Device CPU architecture, as probed via `getprop ro.product.cpu.abi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    Arm,
    Arm64,
    /// Architecture-independent build; also the lookup fallback when a
    /// store has no entry for the probed architecture.
    Noarch,
}

impl Arch {
    /// Map a raw probe value to an architecture.
    pub fn from_probe(raw: &str) -> Option<Self> {
        match raw {
            "armeabi-v7a" => Some(Arch::Arm),
            "arm64-v8a" => Some(Arch::Arm64),
            "noarch" => Some(Arch::Noarch),
            _ => None,
        }
    }
}

dj_core::simple_display! {
    Arch {
        Arm => "armeabi-v7a",
        Arm64 => "arm64-v8a",
        Noarch => "noarch",
    }
}

/// Latest known metadata for one package build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMeta {
    pub version: String,
    pub filename: Option<String>,
    /// `application/zip` installs as a bundle, anything else as a plain
    /// package.
    pub mimetype: String,
}

/// Errors from package store operations
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("package not available: {0}")]
    NotAvailable(String),
    #[error("package stream failed: {0}")]
    Stream(String),
}

/// The APK storage collaborator.
#[async_trait]
pub trait PackageStore: Clone + Send + Sync + 'static {
    /// Per-architecture metadata for the latest stored build of `package`,
    /// or `None` when the store has never seen it.
    async fn current_package_info(&self, package: &str)
        -> Option<HashMap<Arch, PackageMeta>>;

    /// The stored package bytes.
    async fn stream_package(&self, package: &str, arch: Arch)
        -> Result<Vec<u8>, PackageError>;

    /// Whether `version` is cleared for use on `arch`.
    async fn is_supported_version(&self, arch: Arch, version: &str) -> bool;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakePackageState {
        packages: HashMap<String, HashMap<Arch, PackageMeta>>,
        bytes: HashMap<(String, Arch), Vec<u8>>,
        unsupported: Vec<(Arch, String)>,
    }

    /// In-memory package store for tests.
    #[derive(Clone, Default)]
    pub struct FakePackageStore {
        inner: Arc<Mutex<FakePackageState>>,
    }

    impl FakePackageStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a stored build.
        pub fn insert(&self, package: &str, arch: Arch, meta: PackageMeta, bytes: Vec<u8>) {
            let mut state = self.inner.lock();
            state
                .packages
                .entry(package.to_string())
                .or_default()
                .insert(arch, meta);
            state.bytes.insert((package.to_string(), arch), bytes);
        }

        /// Mark a version as unsupported for an architecture.
        pub fn mark_unsupported(&self, arch: Arch, version: &str) {
            self.inner.lock().unsupported.push((arch, version.to_string()));
        }
    }

    #[async_trait]
    impl PackageStore for FakePackageStore {
        async fn current_package_info(
            &self,
            package: &str,
        ) -> Option<HashMap<Arch, PackageMeta>> {
            self.inner.lock().packages.get(package).cloned()
        }

        async fn stream_package(
            &self,
            package: &str,
            arch: Arch,
        ) -> Result<Vec<u8>, PackageError> {
            self.inner
                .lock()
                .bytes
                .get(&(package.to_string(), arch))
                .cloned()
                .ok_or_else(|| PackageError::NotAvailable(format!("{} [{}]", package, arch)))
        }

        async fn is_supported_version(&self, arch: Arch, version: &str) -> bool {
            !self
                .inner
                .lock()
                .unsupported
                .iter()
                .any(|(a, v)| *a == arch && v == version)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePackageStore;

#[cfg(test)]
#[path = "package_tests.rs"]
mod tests;
