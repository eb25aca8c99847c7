// Copyright 2024-2026 Local Models Updater Contributors
// SPDX-License-Identifier: Apache-2.0

//! Startup registration of the local models component.

use crate::component::{ComponentRegistration, ComponentUpdateService};
use crate::config::EnvConfig;
use crate::lifecycle_log;
use crate::telemetry::LifecycleEvent;

use super::policy::LocalModelsInstallerPolicy;

/// What [`manage_registration`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    AlreadyRegistered,
    /// Component disabled; on-disk state removed (or nothing was installed).
    Deleted,
}

/// Hand the component descriptor to the service and request an update check.
///
/// Re-registration with the same service is ignored.
pub fn register_local_models_component(service: &dyn ComponentUpdateService) {
    register(service);
}

fn register(service: &dyn ComponentUpdateService) -> RegistrationOutcome {
    let policy = LocalModelsInstallerPolicy::new();
    let registration = ComponentRegistration::from_policy(&policy);
    let id = registration.id.clone();

    if !service.register_component(registration) {
        return RegistrationOutcome::AlreadyRegistered;
    }
    lifecycle_log!(LifecycleEvent::Registered, "component registered", "component_id" => id.as_str());
    service.on_demand_update(&id);
    RegistrationOutcome::Registered
}

/// Register when enabled, otherwise delete any installed bundle.
pub async fn manage_registration(
    service: &dyn ComponentUpdateService,
    config: &EnvConfig,
) -> RegistrationOutcome {
    if config.enabled {
        return register(service);
    }

    service.unregister_component(&LocalModelsInstallerPolicy::id());
    if let Err(e) = LocalModelsInstallerPolicy::delete_component(&config.components_dir).await {
        tracing::warn!(error = %e, "failed to delete disabled component");
    }
    RegistrationOutcome::Deleted
}
