// Copyright 2024-2026 Local Models Updater Contributors
// SPDX-License-Identifier: Apache-2.0

//! Process-wide record of the active model bundle.
//!
//! Uses parking_lot::RwLock around an `Arc` snapshot: writers build the new
//! snapshot outside the lock and swap the pointer, readers clone the `Arc`.
//! No filesystem I/O happens here, not even at construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::names::NamedModel;

/// One consistent view of the active install directory and its resolved model paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveBundle {
    install_dir: PathBuf,
    models: BTreeMap<NamedModel, PathBuf>,
}

impl ActiveBundle {
    fn resolve(install_dir: &Path) -> Self {
        let models = NamedModel::ALL
            .iter()
            .map(|model| (*model, model.resolve(install_dir)))
            .collect();
        Self {
            install_dir: install_dir.to_path_buf(),
            models,
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn model_path(&self, model: NamedModel) -> Option<&Path> {
        self.models.get(&model).map(PathBuf::as_path)
    }
}

static INSTANCE: OnceLock<UpdaterState> = OnceLock::new();

/// Single source of truth for where the local model files currently live.
#[derive(Debug)]
pub struct UpdaterState {
    active: RwLock<Option<Arc<ActiveBundle>>>,
}

impl UpdaterState {
    /// The process-wide instance, constructed on first access and never dropped.
    pub fn instance() -> &'static UpdaterState {
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        Self {
            active: RwLock::new(None),
        }
    }

    /// Activate `install_dir`, recomputing every named model path in one swap.
    pub fn set_install_dir(&self, install_dir: &Path) {
        let next = Arc::new(ActiveBundle::resolve(install_dir));
        let previous = {
            let mut active = self.active.write();
            active.replace(next)
        };

        match previous {
            Some(prev) if prev.install_dir() == install_dir => {
                tracing::debug!(install_dir = %install_dir.display(), "install dir unchanged");
            }
            Some(prev) => tracing::info!(
                previous = %prev.install_dir().display(),
                install_dir = %install_dir.display(),
                "active model bundle switched"
            ),
            None => tracing::info!(
                install_dir = %install_dir.display(),
                "active model bundle set"
            ),
        }
    }

    /// Drop the active bundle; lookups return the empty sentinel afterwards.
    pub fn clear(&self) {
        let previous = self.active.write().take();
        if let Some(prev) = previous {
            tracing::info!(install_dir = %prev.install_dir().display(), "active model bundle cleared");
        }
    }

    /// Drop the active bundle only if it lives under `dir`. Returns whether it did.
    pub fn clear_if_within(&self, dir: &Path) -> bool {
        let previous = {
            let mut active = self.active.write();
            if !active.as_ref().is_some_and(|a| a.install_dir().starts_with(dir)) {
                return false;
            }
            active.take()
        };
        if let Some(prev) = previous {
            tracing::info!(
                install_dir = %prev.install_dir().display(),
                "active model bundle cleared"
            );
        }
        true
    }

    pub fn snapshot(&self) -> Option<Arc<ActiveBundle>> {
        self.active.read().clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.read().is_some()
    }

    /// Active install directory, or an empty path before any activation.
    pub fn install_dir(&self) -> PathBuf {
        self.snapshot()
            .map(|s| s.install_dir().to_path_buf())
            .unwrap_or_default()
    }

    pub fn model_path(&self, model: NamedModel) -> Option<PathBuf> {
        self.snapshot()
            .and_then(|s| s.model_path(model).map(Path::to_path_buf))
    }

    /// Path to the universal QA model, or an empty path when no bundle is active.
    ///
    /// An empty path means "model unavailable", not a filesystem error.
    pub fn universal_qa_model(&self) -> PathBuf {
        self.model_path(NamedModel::UniversalQa).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn fresh() -> UpdaterState {
        UpdaterState::new()
    }

    #[test]
    fn test_clear_if_within_only_clears_matching_dir() {
        let state = fresh();
        let root = PathBuf::from("/components/abcd");
        state.set_install_dir(&PathBuf::from("/components/other/1.0"));
        assert!(!state.clear_if_within(&root));
        assert!(state.is_active());

        state.set_install_dir(&root.join("2.0.0"));
        assert!(state.clear_if_within(&root));
        assert_eq!(state.universal_qa_model(), PathBuf::new());
        assert!(!state.clear_if_within(&root));
    }

    #[test]
    fn test_uninitialized_returns_sentinels() {
        let state = fresh();
        assert!(!state.is_active());
        assert_eq!(state.install_dir(), PathBuf::new());
        assert_eq!(state.universal_qa_model(), PathBuf::new());
        assert!(state.model_path(NamedModel::UniversalQa).is_none());
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn test_last_writer_wins() {
        let state = fresh();
        let dirs: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("/b/{i}"))).collect();
        for dir in &dirs {
            state.set_install_dir(dir);
        }
        let last = dirs.last().unwrap();
        assert_eq!(&state.install_dir(), last);
        for model in NamedModel::ALL {
            let path = state.model_path(*model).unwrap();
            assert!(path.starts_with(last));
            for older in &dirs[..dirs.len() - 1] {
                assert!(!path.starts_with(older));
            }
        }
    }

    #[test]
    fn test_same_dir_is_idempotent() {
        let state = fresh();
        state.set_install_dir(Path::new("/b/1"));
        let first = state.snapshot().unwrap();
        state.set_install_dir(Path::new("/b/1"));
        assert_eq!(*state.snapshot().unwrap(), *first);
    }

    #[test]
    fn test_clear_returns_to_uninitialized() {
        let state = fresh();
        state.set_install_dir(Path::new("/b/1"));
        state.clear();
        assert_eq!(state.universal_qa_model(), PathBuf::new());
        state.clear();
        assert!(!state.is_active());
    }

    #[test]
    fn test_snapshot_outlives_swap() {
        let state = fresh();
        state.set_install_dir(Path::new("/b/1"));
        let held = state.snapshot().unwrap();
        state.set_install_dir(Path::new("/b/2"));
        assert_eq!(held.install_dir(), Path::new("/b/1"));
        assert_eq!(
            held.model_path(NamedModel::UniversalQa),
            Some(Path::new("/b/1/qa_model.bin"))
        );
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_snapshot() {
        let state: &'static UpdaterState = Box::leak(Box::new(fresh()));
        let old = PathBuf::from("/bundles/old");
        let new = PathBuf::from("/bundles/new");
        state.set_install_dir(&old);

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let (old, new) = (old.clone(), new.clone());
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snap = state.snapshot().unwrap();
                        let qa = snap.model_path(NamedModel::UniversalQa).unwrap();
                        let root = snap.install_dir();
                        assert!(root == old || root == new);
                        assert_eq!(qa.parent(), Some(root));
                    }
                })
            })
            .collect();

        for i in 0..500 {
            let dir = if i % 2 == 0 { &new } else { &old };
            state.set_install_dir(dir);
        }
        for r in readers {
            r.join().unwrap();
        }
    }
}
