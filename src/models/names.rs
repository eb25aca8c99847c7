//! Named model references: stable logical names for files inside a bundle.

use std::fmt;
use std::path::{Path, PathBuf};

/// Relative file name of the universal question-answering model.
pub const UNIVERSAL_QA_MODEL_NAME: &str = "qa_model.bin";

/// Logical model names resolved against the active install directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamedModel {
    UniversalQa,
}

impl NamedModel {
    /// Every reference. Each one is a required file in every bundle.
    pub const ALL: &'static [NamedModel] = &[NamedModel::UniversalQa];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::UniversalQa => UNIVERSAL_QA_MODEL_NAME,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UniversalQa => "universal_qa",
        }
    }

    pub fn resolve(self, install_dir: &Path) -> PathBuf {
        install_dir.join(self.file_name())
    }
}

impl fmt::Display for NamedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_under_dir() {
        let dir = Path::new("/data/components/x/1.0.0");
        let path = NamedModel::UniversalQa.resolve(dir);
        assert_eq!(path, dir.join("qa_model.bin"));
        assert!(path.starts_with(dir));
    }

    #[test]
    fn test_all_has_unique_files() {
        let mut names: Vec<_> = NamedModel::ALL.iter().map(|m| m.file_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), NamedModel::ALL.len());
    }
}
