// Copyright 2024-2026 Local Models Updater Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bundle manifest parsing.
//!
//! A manifest is a key-value JSON document shipped as `manifest.json` inside
//! each bundle. Only `name`, `version` and `files` are interpreted; every other
//! key is carried through untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::component::{BundleVersion, VersionError};

/// File name of the manifest inside a bundle directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid manifest version: {0}")]
    Version(#[from] VersionError),
}

/// A file the bundle declares it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Path relative to the bundle root.
    pub path: String,
    /// Expected SHA-256 digest (64 hex characters), if the publisher pinned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Expected size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Declarative description of a bundle's expected contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ManifestFile>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl BundleManifest {
    /// Load the manifest from `dir/manifest.json`.
    pub fn from_dir(dir: &Path) -> Result<Self, ManifestError> {
        Self::from_file(&dir.join(MANIFEST_FILE_NAME))
    }

    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parsed `version`, or `None` if the manifest does not declare one.
    pub fn declared_version(&self) -> Result<Option<BundleVersion>, ManifestError> {
        self.version
            .as_deref()
            .map(BundleVersion::parse)
            .transpose()
            .map_err(ManifestError::from)
    }

    /// Builder-style helper used when assembling manifests programmatically.
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.push(ManifestFile {
            path: path.into(),
            sha256: None,
            size: None,
        });
        self
    }

    pub fn declares(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }
}
