// Copyright 2024-2026 Local Models Updater Contributors
// SPDX-License-Identifier: Apache-2.0

//! Integrity verification of a candidate bundle directory.
//!
//! Checks run in manifest order and stop at the first failure. All checks are
//! read-only local filesystem operations.

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::manifest::{BundleManifest, ManifestError};
use super::names::NamedModel;
use crate::telemetry::LifecycleEvent;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Install directory not found: {0}")]
    MissingInstallDir(PathBuf),

    #[error("Unsafe file path in manifest: {0}")]
    UnsafePath(String),

    #[error("Required file missing: {0}")]
    MissingFile(PathBuf),

    #[error("Not a regular file inside the install directory: {0}")]
    NotAFile(PathBuf),

    #[error("Size mismatch for {path}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("Malformed sha256 for {path}: must be 64 hex characters")]
    MalformedDigest { path: String },

    #[error("Hash mismatch for {path}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Manifest rejected: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VerifyError {
    /// Lifecycle event this failure is reported as.
    pub fn event(&self) -> LifecycleEvent {
        match self {
            Self::DigestMismatch { .. } => LifecycleEvent::DigestMismatch,
            Self::UnsafePath(_) | Self::NotAFile(_) => LifecycleEvent::PathTraversalAttempt,
            _ => LifecycleEvent::VerificationFailed,
        }
    }
}

/// True if `path` is a plain relative path that cannot leave its base directory.
///
/// Manifest paths are `/`-separated; backslashes and drive prefixes are rejected.
pub fn is_safe_relative_path(path: &str) -> bool {
    if path.is_empty() || path.contains('\\') || path.contains(':') {
        return false;
    }
    let mut components = Path::new(path).components().peekable();
    if components.peek().is_none() {
        return false;
    }
    components.all(|c| matches!(c, Component::Normal(_)))
}

/// Lowercase hex SHA-256 digest of a file, streamed.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Resolve `relative` under `root` and require a regular file that stays inside `root`.
fn locate_file(
    canonical_root: &Path,
    install_dir: &Path,
    relative: &str,
) -> Result<PathBuf, VerifyError> {
    let joined = install_dir.join(relative);
    let canonical = match joined.canonicalize() {
        Ok(p) => p,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VerifyError::MissingFile(joined));
        }
        Err(source) => return Err(VerifyError::Io { path: joined, source }),
    };

    // Symlinks may point anywhere; only accept targets inside the bundle.
    if !canonical.starts_with(canonical_root) || !canonical.is_file() {
        return Err(VerifyError::NotAFile(joined));
    }
    Ok(canonical)
}

/// Verify `install_dir` against `manifest` and the named model table.
pub fn verify_bundle(manifest: &BundleManifest, install_dir: &Path) -> Result<(), VerifyError> {
    let canonical_root = install_dir
        .canonicalize()
        .ok()
        .filter(|p| p.is_dir())
        .ok_or_else(|| VerifyError::MissingInstallDir(install_dir.to_path_buf()))?;

    manifest.declared_version()?;

    for entry in &manifest.files {
        if !is_safe_relative_path(&entry.path) {
            return Err(VerifyError::UnsafePath(entry.path.clone()));
        }
        let file = locate_file(&canonical_root, install_dir, &entry.path)?;

        if let Some(expected) = entry.size {
            let actual = std::fs::metadata(&file)
                .map_err(|source| VerifyError::Io {
                    path: file.clone(),
                    source,
                })?
                .len();
            if actual != expected {
                return Err(VerifyError::SizeMismatch {
                    path: entry.path.clone(),
                    expected,
                    actual,
                });
            }
        }

        if let Some(expected) = &entry.sha256 {
            if !is_hex_digest(expected) {
                return Err(VerifyError::MalformedDigest {
                    path: entry.path.clone(),
                });
            }
            let actual = sha256_file(&file).map_err(|source| VerifyError::Io {
                path: file.clone(),
                source,
            })?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(VerifyError::DigestMismatch {
                    path: entry.path.clone(),
                    expected: expected.to_ascii_lowercase(),
                    actual,
                });
            }
        }
    }

    for model in NamedModel::ALL {
        if !manifest.declares(model.file_name()) {
            locate_file(&canonical_root, install_dir, model.file_name())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::manifest::ManifestFile;
    use crate::models::names::UNIVERSAL_QA_MODEL_NAME;
    use std::fs;

    fn bundle_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn entry(path: &str, sha256: Option<String>, size: Option<u64>) -> ManifestFile {
        ManifestFile {
            path: path.to_string(),
            sha256,
            size,
        }
    }

    #[test]
    fn test_safe_relative_paths() {
        assert!(is_safe_relative_path("qa_model.bin"));
        assert!(is_safe_relative_path("vocab/tokens.txt"));
        assert!(!is_safe_relative_path(""));
        assert!(!is_safe_relative_path("../escape.bin"));
        assert!(!is_safe_relative_path("models/../../etc/passwd"));
        assert!(!is_safe_relative_path("/etc/passwd"));
        assert!(!is_safe_relative_path("C:\\Windows\\System32"));
        assert!(!is_safe_relative_path("./qa_model.bin"));
    }

    #[test]
    fn test_sha256_of_known_content() {
        let dir = bundle_with(&[("a.bin", "abc")]);
        let digest = sha256_file(&dir.path().join("a.bin")).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_accepts_complete_bundle_with_extra_files() {
        let dir = bundle_with(&[
            (UNIVERSAL_QA_MODEL_NAME, "weights"),
            ("vocab/tokens.txt", "a b c"),
            ("README", "not declared"),
        ]);
        let manifest = BundleManifest::default()
            .with_file(UNIVERSAL_QA_MODEL_NAME)
            .with_file("vocab/tokens.txt");
        verify_bundle(&manifest, dir.path()).unwrap();
    }

    #[test]
    fn test_named_model_required_even_if_undeclared() {
        let dir = bundle_with(&[("vocab/tokens.txt", "a b c")]);
        let manifest = BundleManifest::default().with_file("vocab/tokens.txt");
        assert!(matches!(
            verify_bundle(&manifest, dir.path()),
            Err(VerifyError::MissingFile(_))
        ));
    }

    #[test]
    fn test_missing_declared_file() {
        let dir = bundle_with(&[(UNIVERSAL_QA_MODEL_NAME, "weights")]);
        let manifest = BundleManifest::default().with_file("tokenizer.json");
        assert!(matches!(
            verify_bundle(&manifest, dir.path()),
            Err(VerifyError::MissingFile(_))
        ));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = bundle_with(&[("qa_model.bin/inner", "x")]);
        let manifest = BundleManifest::default();
        assert!(matches!(
            verify_bundle(&manifest, dir.path()),
            Err(VerifyError::NotAFile(_))
        ));
    }

    #[test]
    fn test_digest_and_size_checks() {
        let dir = bundle_with(&[(UNIVERSAL_QA_MODEL_NAME, "abc")]);
        let good = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";

        let mut manifest = BundleManifest::default();
        manifest.files = vec![entry(UNIVERSAL_QA_MODEL_NAME, Some(good.to_string()), Some(3))];
        verify_bundle(&manifest, dir.path()).unwrap();

        manifest.files = vec![entry(UNIVERSAL_QA_MODEL_NAME, Some("0".repeat(64)), None)];
        let err = verify_bundle(&manifest, dir.path()).unwrap_err();
        assert!(matches!(err, VerifyError::DigestMismatch { .. }));
        assert_eq!(err.event(), LifecycleEvent::DigestMismatch);

        manifest.files = vec![entry(UNIVERSAL_QA_MODEL_NAME, Some("abcd".into()), None)];
        assert!(matches!(
            verify_bundle(&manifest, dir.path()),
            Err(VerifyError::MalformedDigest { .. })
        ));

        manifest.files = vec![entry(UNIVERSAL_QA_MODEL_NAME, None, Some(4))];
        assert!(matches!(
            verify_bundle(&manifest, dir.path()),
            Err(VerifyError::SizeMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_traversal_entry_rejected() {
        let dir = bundle_with(&[(UNIVERSAL_QA_MODEL_NAME, "abc")]);
        let manifest = BundleManifest::default().with_file("../outside.bin");
        let err = verify_bundle(&manifest, dir.path()).unwrap_err();
        assert!(matches!(err, VerifyError::UnsafePath(_)));
        assert_eq!(err.event(), LifecycleEvent::PathTraversalAttempt);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escaping_bundle_rejected() {
        let outside = bundle_with(&[("secret.bin", "x")]);
        let dir = bundle_with(&[]);
        std::os::unix::fs::symlink(
            outside.path().join("secret.bin"),
            dir.path().join(UNIVERSAL_QA_MODEL_NAME),
        )
        .unwrap();
        assert!(matches!(
            verify_bundle(&BundleManifest::default(), dir.path()),
            Err(VerifyError::NotAFile(_))
        ));
    }

    #[test]
    fn test_missing_install_dir() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert!(matches!(
            verify_bundle(&BundleManifest::default(), &gone),
            Err(VerifyError::MissingInstallDir(_))
        ));
    }

    #[test]
    fn test_invalid_manifest_version() {
        let dir = bundle_with(&[(UNIVERSAL_QA_MODEL_NAME, "abc")]);
        let manifest = BundleManifest {
            version: Some("1.x".into()),
            ..BundleManifest::default()
        };
        assert!(matches!(
            verify_bundle(&manifest, dir.path()),
            Err(VerifyError::Manifest(_))
        ));
    }
}
