//! Local Models Updater
//!
//! Lifecycle manager for a versioned bundle of machine-learning model files
//! delivered by an external update-distribution service.
//!
//! # Responsibilities
//!
//! - **Verify**: reject a candidate bundle with missing, misplaced or tampered
//!   files before it becomes visible.
//! - **Activate**: atomically switch the active install directory and every
//!   named model path derived from it.
//! - **Look up**: answer "where is model X right now" without touching disk.
//! - **Delete**: remove the component's on-disk state on demand.
//!
//! # Boundaries
//!
//! - Downloads, update checks and scheduling belong to the distribution service.
//! - Model file contents are never parsed here.
//! - A missing model is never fatal: lookups return an empty path and callers
//!   degrade gracefully.
//!
//! ```no_run
//! use local_models_updater::models::UpdaterState;
//!
//! let path = UpdaterState::instance().universal_qa_model();
//! if path.as_os_str().is_empty() {
//!     // model unavailable, feature disabled
//! }
//! ```

pub mod component;
pub mod config;
pub mod models;
pub mod telemetry;

pub use component::{
    BundleVersion, ComponentInstaller, ComponentInstallerPolicy, ComponentRegistry,
    ComponentUpdateService, InstallError,
};
pub use models::{
    manage_registration, register_local_models_component, BundleManifest,
    LocalModelsInstallerPolicy, NamedModel, UpdaterState,
};
