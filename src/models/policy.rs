// Copyright 2024-2026 Local Models Updater Contributors
// SPDX-License-Identifier: Apache-2.0

//! Installer policy for the local models component.
//!
//! Gatekeeper between the distribution service and [`UpdaterState`]: rejects
//! bundles that fail verification, writes derived install metadata, and is the
//! only writer of the active install directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::manifest::BundleManifest;
use super::names::NamedModel;
use super::state::UpdaterState;
use super::verify::{is_safe_relative_path, verify_bundle};
use crate::component::{
    component_id_from_hash, BundleVersion, ComponentInstallerPolicy, InstallError,
    InstallerAttributes, COMPONENT_HASH_LEN,
};
use crate::lifecycle_log;
use crate::telemetry::{self, LifecycleEvent};

/// Human-readable component name reported to the update service.
pub const COMPONENT_NAME: &str = "Local Models Updater";

/// SHA-256 of the public key the bundles are signed with.
///
/// The update service refuses to deliver if this does not match its record.
pub const COMPONENT_PUBLIC_KEY_SHA256: [u8; COMPONENT_HASH_LEN] = [
    0x4a, 0x9f, 0x37, 0x0b, 0xe2, 0x15, 0xc8, 0x6d, 0x91, 0x53, 0x0e, 0xaf, 0x72, 0xd4, 0x28,
    0xb6, 0x3c, 0x81, 0xf5, 0x09, 0x6e, 0xa2, 0x47, 0xd0, 0x1b, 0x8c, 0x5f, 0xe3, 0x94, 0x26,
    0x7a, 0xcd,
];

/// Derived metadata written into each install directory by `on_custom_install`.
pub const INSTALL_METADATA_FILE_NAME: &str = "install_metadata.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct InstalledFile {
    path: String,
    size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct InstallMetadata {
    component_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    files: Vec<InstalledFile>,
}

/// Policy the update service drives for the local models bundle.
#[derive(Debug)]
pub struct LocalModelsInstallerPolicy {
    state: &'static UpdaterState,
}

impl LocalModelsInstallerPolicy {
    pub fn new() -> Self {
        Self {
            state: UpdaterState::instance(),
        }
    }

    /// Component id derived from [`COMPONENT_PUBLIC_KEY_SHA256`].
    pub fn id() -> String {
        component_id_from_hash(&COMPONENT_PUBLIC_KEY_SHA256)
    }

    /// `<components_root>/<relative install dir>`: every version lives below it.
    pub fn component_dir(components_root: &Path) -> PathBuf {
        components_root.join(Self::id())
    }

    pub fn component_ready_for_testing(
        &self,
        version: &BundleVersion,
        install_dir: &Path,
        manifest: BundleManifest,
    ) {
        self.component_ready(version, install_dir, manifest);
    }

    /// Remove all on-disk state for this component.
    ///
    /// The active bundle is cleared first so lookups report "unavailable"
    /// before any file disappears. Returns `Ok(false)` if nothing was installed.
    /// No lock is held while files are removed.
    pub async fn delete_component(components_root: &Path) -> std::io::Result<bool> {
        let state = UpdaterState::instance();
        state.clear();

        let dir = Self::component_dir(components_root);
        let target = dir.clone();
        let removed = tokio::task::spawn_blocking(move || match std::fs::remove_dir_all(&target) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        })
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))??;

        Self::release_deleted(state, &dir);
        if removed {
            telemetry::record_deletion();
            let dir_str = dir.display().to_string();
            lifecycle_log!(
                LifecycleEvent::ComponentDeleted,
                "component files removed",
                "dir" => dir_str.as_str()
            );
        } else {
            tracing::debug!(dir = %dir.display(), "delete requested but nothing installed");
        }
        Ok(removed)
    }

    /// An activation may have landed between the first clear and the removal.
    fn release_deleted(state: &UpdaterState, component_dir: &Path) {
        if state.clear_if_within(component_dir) {
            tracing::warn!(
                dir = %component_dir.display(),
                "activation raced component deletion; state cleared"
            );
        }
    }

    fn build_metadata(
        manifest: &BundleManifest,
        install_dir: &Path,
    ) -> Result<InstallMetadata, InstallError> {
        let mut paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
        paths.extend(NamedModel::ALL.iter().map(|m| m.file_name()));
        paths.sort_unstable();
        paths.dedup();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            if !is_safe_relative_path(path) {
                return Err(InstallError::CustomInstall(format!("unsafe file path: {path}")));
            }
            let size = match std::fs::metadata(install_dir.join(path)) {
                Ok(meta) => meta.len(),
                // Absent files are reported by verification, not here.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(InstallError::CustomInstall(format!("cannot stat {path}: {e}")))
                }
            };
            files.push(InstalledFile {
                path: path.to_string(),
                size,
            });
        }

        Ok(InstallMetadata {
            component_id: Self::id(),
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            files,
        })
    }
}

impl Default for LocalModelsInstallerPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentInstallerPolicy for LocalModelsInstallerPolicy {
    fn verify_installation(&self, manifest: &BundleManifest, install_dir: &Path) -> bool {
        let dir_str = install_dir.display().to_string();
        match verify_bundle(manifest, install_dir) {
            Ok(()) => {
                telemetry::record_verification(true);
                lifecycle_log!(
                    LifecycleEvent::VerificationPassed,
                    "bundle verified",
                    "install_dir" => dir_str.as_str()
                );
                true
            }
            Err(e) => {
                telemetry::record_verification(false);
                telemetry::log_lifecycle_event(
                    e.event(),
                    &e.to_string(),
                    &[("install_dir", dir_str.as_str())],
                );
                false
            }
        }
    }

    fn supports_group_policy_enabled_component_updates(&self) -> bool {
        true
    }

    fn requires_network_encryption(&self) -> bool {
        false
    }

    fn on_custom_install(
        &self,
        manifest: &BundleManifest,
        install_dir: &Path,
    ) -> Result<(), InstallError> {
        if !install_dir.is_dir() {
            return Err(InstallError::CustomInstall(format!(
                "install directory missing: {}",
                install_dir.display()
            )));
        }

        let metadata = Self::build_metadata(manifest, install_dir)?;
        let rendered = serde_json::to_string_pretty(&metadata)
            .map_err(|e| InstallError::CustomInstall(e.to_string()))?;

        let target = install_dir.join(INSTALL_METADATA_FILE_NAME);
        if std::fs::read_to_string(&target).is_ok_and(|existing| existing == rendered) {
            tracing::debug!(path = %target.display(), "install metadata already current");
            return Ok(());
        }

        let mut tmp = tempfile::NamedTempFile::new_in(install_dir)?;
        tmp.write_all(rendered.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| InstallError::Io(e.error))?;
        tracing::debug!(path = %target.display(), "install metadata written");
        Ok(())
    }

    fn on_custom_uninstall(&self) {
        // Updater state may already point at a newer version; leave it alone.
        tracing::debug!(component_id = %Self::id(), "custom uninstall");
    }

    fn component_ready(
        &self,
        version: &BundleVersion,
        install_dir: &Path,
        _manifest: BundleManifest,
    ) {
        self.state.set_install_dir(install_dir);
        telemetry::record_activation();
        let version_str = version.to_string();
        let dir_str = install_dir.display().to_string();
        lifecycle_log!(
            LifecycleEvent::Activated,
            "model bundle ready",
            "version" => version_str.as_str(),
            "install_dir" => dir_str.as_str()
        );
    }

    fn relative_install_dir(&self) -> PathBuf {
        PathBuf::from(Self::id())
    }

    fn hash(&self) -> [u8; COMPONENT_HASH_LEN] {
        COMPONENT_PUBLIC_KEY_SHA256
    }

    fn name(&self) -> String {
        COMPONENT_NAME.to_string()
    }

    fn installer_attributes(&self) -> InstallerAttributes {
        InstallerAttributes::new()
    }

    fn is_brave_component(&self) -> bool {
        true
    }
}
