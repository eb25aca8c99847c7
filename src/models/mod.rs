//! Local model bundle management.
//!
//! Handles manifest parsing, bundle verification, the installer policy the
//! update service drives, and the process-wide record of the active bundle.

pub mod manifest;
pub mod names;
pub mod policy;
pub mod registration;
pub mod state;
pub mod verify;

pub use manifest::{BundleManifest, ManifestError, ManifestFile, MANIFEST_FILE_NAME};
pub use names::{NamedModel, UNIVERSAL_QA_MODEL_NAME};
pub use policy::{
    LocalModelsInstallerPolicy, COMPONENT_NAME, COMPONENT_PUBLIC_KEY_SHA256,
    INSTALL_METADATA_FILE_NAME,
};
pub use registration::{manage_registration, register_local_models_component, RegistrationOutcome};
pub use state::{ActiveBundle, UpdaterState};
pub use verify::{is_safe_relative_path, sha256_file, verify_bundle, VerifyError};
