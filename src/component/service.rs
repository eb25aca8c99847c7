// Copyright 2024-2026 Local Models Updater Contributors
// SPDX-License-Identifier: Apache-2.0

//! Registration boundary with the update-distribution service.

use std::path::PathBuf;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::policy::{ComponentInstallerPolicy, InstallerAttributes};

/// Descriptor handed to the service so it can address and authenticate a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRegistration {
    pub id: String,
    pub name: String,
    pub hash: Vec<u8>,
    pub relative_install_dir: PathBuf,
    pub installer_attributes: InstallerAttributes,
    pub supports_group_policy: bool,
    pub requires_network_encryption: bool,
    pub is_brave_component: bool,
}

impl ComponentRegistration {
    pub fn from_policy(policy: &dyn ComponentInstallerPolicy) -> Self {
        Self {
            id: policy.component_id(),
            name: policy.name(),
            hash: policy.hash().to_vec(),
            relative_install_dir: policy.relative_install_dir(),
            installer_attributes: policy.installer_attributes(),
            supports_group_policy: policy.supports_group_policy_enabled_component_updates(),
            requires_network_encryption: policy.requires_network_encryption(),
            is_brave_component: policy.is_brave_component(),
        }
    }
}

/// Handle to the distribution service's registration registry.
pub trait ComponentUpdateService: Send + Sync {
    /// Register a component. Returns `false` if the id is already registered.
    fn register_component(&self, registration: ComponentRegistration) -> bool;

    /// Returns `false` if the id was not registered.
    fn unregister_component(&self, id: &str) -> bool;

    /// Ask the service to check for an update of `id` as soon as possible.
    fn on_demand_update(&self, id: &str);
}

/// In-process registry implementing [`ComponentUpdateService`].
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: DashMap<String, ComponentRegistration>,
    on_demand: DashMap<String, u64>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<ComponentRegistration> {
        self.components.get(id).map(|r| r.value().clone())
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.components.len()
    }

    /// Number of on-demand update requests received for `id`.
    pub fn on_demand_requests(&self, id: &str) -> u64 {
        self.on_demand.get(id).map_or(0, |c| *c)
    }
}

impl ComponentUpdateService for ComponentRegistry {
    fn register_component(&self, registration: ComponentRegistration) -> bool {
        match self.components.entry(registration.id.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(component_id = %registration.id, "component already registered");
                false
            }
            Entry::Vacant(slot) => {
                tracing::info!(
                    component_id = %registration.id,
                    name = %registration.name,
                    "component registered"
                );
                slot.insert(registration);
                true
            }
        }
    }

    fn unregister_component(&self, id: &str) -> bool {
        self.components.remove(id).is_some()
    }

    fn on_demand_update(&self, id: &str) {
        *self.on_demand.entry(id.to_string()).or_insert(0) += 1;
        tracing::debug!(component_id = %id, "on-demand update requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(id: &str) -> ComponentRegistration {
        ComponentRegistration {
            id: id.to_string(),
            name: "Test Component".to_string(),
            hash: vec![0; 32],
            relative_install_dir: PathBuf::from(id),
            installer_attributes: InstallerAttributes::new(),
            supports_group_policy: true,
            requires_network_encryption: false,
            is_brave_component: true,
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = ComponentRegistry::new();
        assert!(registry.register_component(registration("abc")));
        assert!(!registry.register_component(registration("abc")));
        assert_eq!(registry.count(), 1);
        assert!(registry.is_registered("abc"));
    }

    #[test]
    fn test_unregister() {
        let registry = ComponentRegistry::new();
        registry.register_component(registration("abc"));
        assert!(registry.unregister_component("abc"));
        assert!(!registry.unregister_component("abc"));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_on_demand_counter() {
        let registry = ComponentRegistry::new();
        assert_eq!(registry.on_demand_requests("abc"), 0);
        registry.on_demand_update("abc");
        registry.on_demand_update("abc");
        assert_eq!(registry.on_demand_requests("abc"), 2);
    }
}
