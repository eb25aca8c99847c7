//! Boundary with the update-distribution service.
//!
//! Defines the policy trait the service drives, the registration handle it
//! exposes, bundle versions, and a local driver of the install lifecycle.

pub mod installer;
pub mod policy;
pub mod service;
pub mod version;

pub use installer::{ComponentInstaller, InstalledVersion};
pub use policy::{
    component_id_from_hash, ComponentInstallerPolicy, InstallError, InstallerAttributes,
    COMPONENT_HASH_LEN,
};
pub use service::{ComponentRegistration, ComponentRegistry, ComponentUpdateService};
pub use version::{BundleVersion, VersionError};
