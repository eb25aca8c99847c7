// Copyright 2024-2026 Local Models Updater Contributors
// SPDX-License-Identifier: Apache-2.0

//! The capability interface a component exposes to the distribution service.
//!
//! The service drives a fixed lifecycle (verify, custom install, ready,
//! uninstall) and reads static descriptors to address and authenticate the
//! component. Policies implement this trait; they never drive it themselves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::version::{BundleVersion, VersionError};
use crate::models::manifest::{BundleManifest, ManifestError};

/// Length in bytes of a component's identity hash (SHA-256 of its signing key).
pub const COMPONENT_HASH_LEN: usize = 32;

/// Key-value attributes that influence which variant the service delivers.
pub type InstallerAttributes = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Installation failed verification: {0}")]
    VerificationFailed(PathBuf),

    #[error("Custom install step failed: {0}")]
    CustomInstall(String),

    #[error("Version {offered} is not newer than installed version {current}")]
    NotNewer {
        offered: BundleVersion,
        current: BundleVersion,
    },

    #[error("Manifest does not declare a version")]
    MissingVersion,

    #[error("Unpacked bundle not found: {0}")]
    UnpackNotFound(PathBuf),

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Invalid version: {0}")]
    Version(#[from] VersionError),

    #[error("Install task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// True when the candidate itself was rejected (as opposed to a local I/O fault).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::VerificationFailed(_)
                | Self::NotNewer { .. }
                | Self::MissingVersion
                | Self::Manifest(_)
                | Self::Version(_)
        )
    }
}

/// Lifecycle hooks and descriptors required by the distribution service.
pub trait ComponentInstallerPolicy: Send + Sync {
    /// Read-only validity check of a candidate install. `false` discards it.
    fn verify_installation(&self, manifest: &BundleManifest, install_dir: &Path) -> bool;

    fn supports_group_policy_enabled_component_updates(&self) -> bool;

    fn requires_network_encryption(&self) -> bool;

    /// One-time side effect at install time. Must be idempotent per version.
    fn on_custom_install(
        &self,
        manifest: &BundleManifest,
        install_dir: &Path,
    ) -> Result<(), InstallError>;

    /// Best-effort teardown when a version is retired.
    fn on_custom_uninstall(&self);

    /// Called once the service has committed to `version` at `install_dir`.
    fn component_ready(
        &self,
        version: &BundleVersion,
        install_dir: &Path,
        manifest: BundleManifest,
    );

    /// Directory (relative to the components root) holding one subdirectory per version.
    fn relative_install_dir(&self) -> PathBuf;

    fn hash(&self) -> [u8; COMPONENT_HASH_LEN];

    fn name(&self) -> String;

    fn installer_attributes(&self) -> InstallerAttributes;

    fn is_brave_component(&self) -> bool;

    /// Stable 32-character identifier derived from [`hash`](Self::hash).
    fn component_id(&self) -> String {
        component_id_from_hash(&self.hash())
    }
}

/// Derive a component id from the first 16 bytes of its hash.
///
/// Each nibble maps to a letter in `a..=p`, yielding 32 lowercase characters.
pub fn component_id_from_hash(hash: &[u8]) -> String {
    hash.iter()
        .take(16)
        .flat_map(|byte| [byte >> 4, byte & 0x0f])
        .map(|nibble| char::from(b'a' + nibble))
        .collect()
}
