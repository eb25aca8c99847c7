// Copyright 2024-2026 Local Models Updater Contributors
// SPDX-License-Identifier: Apache-2.0

//! Local driver of the component install lifecycle.
//!
//! Stages a downloaded candidate into `<install_root>/<version>`, runs the
//! policy's custom install and verification, and only then signals
//! `component_ready`. A rejected candidate is removed and the previously
//! active version stays in effect. Lifecycle operations are serialized by a
//! single async mutex; filesystem work runs on the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::Instrument;

use super::policy::{ComponentInstallerPolicy, InstallError};
use super::version::BundleVersion;
use crate::models::manifest::BundleManifest;
use crate::telemetry::{self, InstallSpan, LifecycleEvent, SpanExt};

/// A version that has been verified and handed to `component_ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub version: BundleVersion,
    pub install_dir: PathBuf,
}

type Staged = (BundleVersion, PathBuf, BundleManifest);

/// Drives verify → custom install → ready for one component.
pub struct ComponentInstaller {
    policy: Arc<dyn ComponentInstallerPolicy>,
    install_root: PathBuf,
    keep_versions: usize,
    current: Mutex<Option<InstalledVersion>>,
}

impl ComponentInstaller {
    pub fn new(policy: Arc<dyn ComponentInstallerPolicy>, components_root: &Path) -> Self {
        let install_root = components_root.join(policy.relative_install_dir());
        Self {
            policy,
            install_root,
            keep_versions: 1,
            current: Mutex::new(None),
        }
    }

    /// Number of installed versions (active included) kept by cleanup. Floor: 1.
    pub fn with_keep_versions(mut self, keep: usize) -> Self {
        self.keep_versions = keep.max(1);
        self
    }

    /// Directory holding one subdirectory per installed version.
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub async fn current(&self) -> Option<InstalledVersion> {
        self.current.lock().await.clone()
    }

    /// Install the unpacked bundle at `unpack_dir`.
    ///
    /// Once staged, the candidate directory is moved into place and is
    /// consumed whether or not verification passes. Versions not newer than
    /// the active one are rejected before anything on disk changes. Before
    /// any version has been adopted, the newest valid installed version is
    /// the baseline.
    pub async fn install(&self, unpack_dir: &Path) -> Result<InstalledVersion, InstallError> {
        let span = InstallSpan::new(&self.policy.component_id(), "install");
        let result = self.install_inner(unpack_dir).instrument(span.clone()).await;
        span.record_result(&result);
        result
    }

    async fn install_inner(&self, unpack_dir: &Path) -> Result<InstalledVersion, InstallError> {
        let mut current = self.current.lock().await;

        // The directory may have been deleted out from under us.
        if current.as_ref().is_some_and(|c| !c.install_dir.is_dir()) {
            *current = None;
        }

        let current_version = current.as_ref().map(|c| c.version.clone());
        let policy = Arc::clone(&self.policy);
        let install_root = self.install_root.clone();
        let unpack_dir = unpack_dir.to_path_buf();

        let (version, install_dir, manifest) = run_blocking(move || {
            let baseline = match current_version {
                Some(version) => Some(version),
                None => find_newest_valid(policy.as_ref(), &install_root)?
                    .map(|(version, _, _)| version),
            };
            stage_candidate(
                policy.as_ref(),
                &install_root,
                &unpack_dir,
                baseline.as_ref(),
            )
        })
        .await?;
        tracing::Span::current().record("version", version.to_string().as_str());

        self.policy.component_ready(&version, &install_dir, manifest);
        let installed = InstalledVersion {
            version,
            install_dir,
        };
        *current = Some(installed.clone());

        self.retire_stale(&installed.version).await;
        Ok(installed)
    }

    /// Adopt the newest installed version that still verifies.
    ///
    /// Called at startup. Corrupt or mislabelled version directories are
    /// skipped, then removed by cleanup.
    pub async fn load_installed(&self) -> Result<Option<InstalledVersion>, InstallError> {
        let mut current = self.current.lock().await;
        let policy = Arc::clone(&self.policy);
        let install_root = self.install_root.clone();

        let found =
            run_blocking(move || find_newest_valid(policy.as_ref(), &install_root)).await?;
        let Some((version, install_dir, manifest)) = found else {
            tracing::debug!(install_root = %self.install_root.display(), "no installed version");
            *current = None;
            return Ok(None);
        };

        self.policy.component_ready(&version, &install_dir, manifest);
        let installed = InstalledVersion {
            version,
            install_dir,
        };
        *current = Some(installed.clone());

        self.retire_stale(&installed.version).await;
        Ok(Some(installed))
    }

    /// Newest installed version that still verifies, without activating it
    /// or removing anything.
    pub async fn inspect_installed(&self) -> Result<Option<InstalledVersion>, InstallError> {
        let _guard = self.current.lock().await;
        let policy = Arc::clone(&self.policy);
        let install_root = self.install_root.clone();

        let found =
            run_blocking(move || find_newest_valid(policy.as_ref(), &install_root)).await?;
        Ok(found.map(|(version, install_dir, _)| InstalledVersion {
            version,
            install_dir,
        }))
    }

    /// Remove version directories other than the active one and its kept predecessors.
    pub async fn cleanup_stale_versions(&self) -> Result<Vec<BundleVersion>, InstallError> {
        let current = self.current.lock().await;
        let Some(active) = current.as_ref().map(|c| c.version.clone()) else {
            return Ok(Vec::new());
        };
        let policy = Arc::clone(&self.policy);
        let install_root = self.install_root.clone();
        let keep = self.keep_versions;
        run_blocking(move || retire_versions(policy.as_ref(), &install_root, &active, keep)).await
    }

    async fn retire_stale(&self, active: &BundleVersion) {
        let policy = Arc::clone(&self.policy);
        let install_root = self.install_root.clone();
        let active = active.clone();
        let keep = self.keep_versions;
        let result =
            run_blocking(move || retire_versions(policy.as_ref(), &install_root, &active, keep))
                .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to clean up superseded versions");
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, InstallError>
where
    F: FnOnce() -> Result<T, InstallError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| InstallError::Task(e.to_string()))?
}

fn discard(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "failed to remove rejected candidate");
    }
}

fn stage_candidate(
    policy: &dyn ComponentInstallerPolicy,
    install_root: &Path,
    unpack_dir: &Path,
    current: Option<&BundleVersion>,
) -> Result<Staged, InstallError> {
    if !unpack_dir.is_dir() {
        return Err(InstallError::UnpackNotFound(unpack_dir.to_path_buf()));
    }
    let manifest = BundleManifest::from_dir(unpack_dir)?;
    let version = manifest
        .declared_version()?
        .ok_or(InstallError::MissingVersion)?;

    if let Some(current) = current {
        if version <= *current {
            return Err(InstallError::NotNewer {
                offered: version,
                current: current.clone(),
            });
        }
    }

    std::fs::create_dir_all(install_root)?;
    let install_dir = install_root.join(version.to_string());
    if install_dir.exists() {
        // Leftover from an aborted attempt at the same version.
        std::fs::remove_dir_all(&install_dir)?;
    }
    move_into_place(unpack_dir, install_root, &install_dir)?;

    if let Err(e) = policy.on_custom_install(&manifest, &install_dir) {
        discard(&install_dir);
        return Err(e);
    }
    if !policy.verify_installation(&manifest, &install_dir) {
        discard(&install_dir);
        return Err(InstallError::VerificationFailed(install_dir));
    }

    Ok((version, install_dir, manifest))
}

/// Rename `unpack_dir` to `install_dir`, copying through a staging directory
/// under `install_root` when the two live on different filesystems.
fn move_into_place(
    unpack_dir: &Path,
    install_root: &Path,
    install_dir: &Path,
) -> Result<(), InstallError> {
    match std::fs::rename(unpack_dir, install_dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            tracing::debug!(
                unpack_dir = %unpack_dir.display(),
                "candidate on another filesystem, copying"
            );
            copy_into_place(unpack_dir, install_root, install_dir)
        }
        Err(e) => Err(e.into()),
    }
}

fn copy_into_place(
    unpack_dir: &Path,
    install_root: &Path,
    install_dir: &Path,
) -> Result<(), InstallError> {
    // Removed on drop if anything below fails.
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(install_root)?;
    copy_dir_recursive(unpack_dir, staging.path())?;
    std::fs::rename(staging.path(), install_dir)?;

    if let Err(e) = std::fs::remove_dir_all(unpack_dir) {
        tracing::warn!(
            dir = %unpack_dir.display(),
            error = %e,
            "failed to remove copied candidate"
        );
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_symlink(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

// Links are recreated, not followed; verification decides whether they may stay.
#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(std::fs::read_link(src)?, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::copy(src, dst).map(|_| ())
}

/// Version directories under `install_root`, newest first.
fn list_versions(install_root: &Path) -> Result<Vec<(BundleVersion, PathBuf)>, InstallError> {
    let entries = match std::fs::read_dir(install_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(version) = name.to_str().and_then(|n| BundleVersion::parse(n).ok()) else {
            continue;
        };
        versions.push((version, entry.path()));
    }
    versions.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(versions)
}

fn find_newest_valid(
    policy: &dyn ComponentInstallerPolicy,
    install_root: &Path,
) -> Result<Option<Staged>, InstallError> {
    for (version, dir) in list_versions(install_root)? {
        let manifest = match BundleManifest::from_dir(&dir) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(version = %version, error = %e, "skipping installed version");
                continue;
            }
        };
        match manifest.declared_version() {
            Ok(Some(declared)) if declared != version => {
                tracing::warn!(
                    version = %version,
                    declared = %declared,
                    "manifest version does not match directory"
                );
                continue;
            }
            Err(e) => {
                tracing::warn!(version = %version, error = %e, "skipping installed version");
                continue;
            }
            _ => {}
        }
        if policy.verify_installation(&manifest, &dir) {
            return Ok(Some((version, dir, manifest)));
        }
    }
    Ok(None)
}

fn retire_versions(
    policy: &dyn ComponentInstallerPolicy,
    install_root: &Path,
    active: &BundleVersion,
    keep: usize,
) -> Result<Vec<BundleVersion>, InstallError> {
    let mut kept = 0usize;
    let mut retired = Vec::new();
    let mut failure = None;

    for (version, dir) in list_versions(install_root)? {
        if version <= *active && kept < keep {
            kept += 1;
            continue;
        }
        policy.on_custom_uninstall();
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            failure = Some(e);
            break;
        }
        let version_str = version.to_string();
        telemetry::log_lifecycle_event(
            LifecycleEvent::VersionRetired,
            "removed superseded version",
            &[("version", version_str.as_str())],
        );
        retired.push(version);
    }

    // Count what was removed even when a later removal failed.
    telemetry::record_versions_retired(retired.len());
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(retired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{InstallerAttributes, COMPONENT_HASH_LEN};
    use std::fs;

    #[test]
    fn test_copy_into_place_moves_whole_tree() {
        let src_parent = tempfile::tempdir().unwrap();
        let unpack = src_parent.path().join("incoming");
        fs::create_dir_all(unpack.join("vocab")).unwrap();
        fs::write(unpack.join("qa_model.bin"), "weights").unwrap();
        fs::write(unpack.join("vocab/tokens.txt"), "a b c").unwrap();

        let root = tempfile::tempdir().unwrap();
        let install_dir = root.path().join("1.0.0");
        copy_into_place(&unpack, root.path(), &install_dir).unwrap();

        assert_eq!(fs::read_to_string(install_dir.join("qa_model.bin")).unwrap(), "weights");
        assert_eq!(
            fs::read_to_string(install_dir.join("vocab/tokens.txt")).unwrap(),
            "a b c"
        );
        assert!(!unpack.exists());
        // Only the version directory is left behind; no staging leftovers.
        let names: Vec<_> = fs::read_dir(root.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("1.0.0")]);
    }

    #[test]
    fn test_copy_into_place_failure_leaves_no_staging_dir() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("never-unpacked");
        let install_dir = root.path().join("1.0.0");

        assert!(copy_into_place(&missing, root.path(), &install_dir).is_err());
        assert!(!install_dir.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_retire_reports_partial_failure() {
        use std::os::unix::fs::PermissionsExt;

        struct NoopPolicy;
        impl ComponentInstallerPolicy for NoopPolicy {
            fn verify_installation(&self, _: &BundleManifest, _: &Path) -> bool {
                true
            }
            fn supports_group_policy_enabled_component_updates(&self) -> bool {
                false
            }
            fn requires_network_encryption(&self) -> bool {
                false
            }
            fn on_custom_install(&self, _: &BundleManifest, _: &Path) -> Result<(), InstallError> {
                Ok(())
            }
            fn on_custom_uninstall(&self) {}
            fn component_ready(&self, _: &BundleVersion, _: &Path, _: BundleManifest) {}
            fn relative_install_dir(&self) -> PathBuf {
                PathBuf::from("noop")
            }
            fn hash(&self) -> [u8; COMPONENT_HASH_LEN] {
                [0; COMPONENT_HASH_LEN]
            }
            fn name(&self) -> String {
                "noop".into()
            }
            fn installer_attributes(&self) -> InstallerAttributes {
                Default::default()
            }
            fn is_brave_component(&self) -> bool {
                false
            }
        }

        let root = tempfile::tempdir().unwrap();
        for v in ["1.0", "2.0", "3.0"] {
            fs::create_dir_all(root.path().join(v).join("inner")).unwrap();
            fs::write(root.path().join(v).join("inner/f"), "x").unwrap();
        }
        // 1.0 cannot be emptied; 2.0 is removed first (newest-first order).
        let locked = root.path().join("1.0").join("inner");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();

        let active = BundleVersion::parse("3.0").unwrap();
        let result = retire_versions(&NoopPolicy, root.path(), &active, 1);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o700)).unwrap();

        // Running as root ignores directory permissions.
        if root.path().join("1.0").exists() {
            assert!(result.is_err());
            assert!(!root.path().join("2.0").exists());
        } else {
            assert_eq!(result.unwrap().len(), 2);
        }
        assert!(root.path().join("3.0").is_dir());
    }
}
