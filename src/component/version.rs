// Copyright 2024-2026 Local Models Updater Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bundle version identifiers assigned by the distribution service.
//!
//! Versions are dotted sequences of non-negative integers. Ordering is numeric
//! per component; missing trailing components compare as zero.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Version string is empty")]
    Empty,

    #[error("Invalid version component '{component}' in '{input}'")]
    InvalidComponent { input: String, component: String },
}

/// Monotonically comparable bundle version (e.g. "1.0.0", "2024.5.1.7").
#[derive(Debug, Clone)]
pub struct BundleVersion {
    components: Vec<u32>,
}

impl BundleVersion {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                // Reject signs and whitespace that u32::from_str would tolerate or mangle.
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersionError::InvalidComponent {
                        input: input.to_string(),
                        component: part.to_string(),
                    });
                }
                part.parse::<u32>().map_err(|_| VersionError::InvalidComponent {
                    input: input.to_string(),
                    component: part.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }

    pub fn components(&self) -> &[u32] {
        &self.components
    }

    fn significant(&self) -> &[u32] {
        let len = self
            .components
            .iter()
            .rposition(|c| *c != 0)
            .map_or(0, |i| i + 1);
        &self.components[..len]
    }
}

impl PartialEq for BundleVersion {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for BundleVersion {}

impl std::hash::Hash for BundleVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl Ord for BundleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for BundleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BundleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for BundleVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for BundleVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BundleVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> BundleVersion {
        BundleVersion::parse(s).unwrap()
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("1.1.0") > v("1.0.0"));
        assert!(v("2") > v("1.99.99"));
    }

    #[test]
    fn test_trailing_zeros_are_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1.0").cmp(&v("1.0.0.0")), Ordering::Equal);
        assert!(v("1.0.0.1") > v("1.0"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(BundleVersion::parse(""), Err(VersionError::Empty));
        assert!(BundleVersion::parse("1..0").is_err());
        assert!(BundleVersion::parse("1.a.0").is_err());
        assert!(BundleVersion::parse("+1.0").is_err());
        assert!(BundleVersion::parse("1.0.").is_err());
        assert!(BundleVersion::parse("99999999999").is_err());
    }

    #[test]
    fn test_display_preserves_components() {
        assert_eq!(v("2024.5.1.7").to_string(), "2024.5.1.7");
        assert_eq!(v(" 1.2 ").to_string(), "1.2");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("1.1.0")).unwrap();
        assert_eq!(json, "\"1.1.0\"");
        let back: BundleVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.1.0"));
        assert!(serde_json::from_str::<BundleVersion>("\"x\"").is_err());
    }
}
