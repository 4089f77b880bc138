use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dsops_domain::ProviderConfig;
use tracing::warn;

use super::model::{
    PrincipalsDocument, RotationPoliciesDocument, ServiceInstanceDef, ServiceInstancesDocument,
    ServiceTypeDef, ServiceTypesDocument,
};
use crate::service::Service;
use crate::services_builtin::build_service;

/// The data-driven half of the service registry (§4.C / §9): four documents
/// under a directory, cross-referenced against each other before any
/// [`Service`] is built from them.
#[derive(Debug, Default, Clone)]
pub struct DataDrivenRegistry {
    pub service_types: Vec<ServiceTypeDef>,
    pub instances: Vec<ServiceInstanceDef>,
}

fn read_document<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T, String> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    serde_yaml::from_str(&content).map_err(|e| format!("parsing {}: {e}", path.display()))
}

impl DataDrivenRegistry {
    /// Load and cross-reference all four documents from `dir`. Per §9, any
    /// failure (missing schema fields, dangling references) degrades to an
    /// empty registry with a logged warning rather than a fatal error, so
    /// diagnostic commands stay usable even with a broken data directory.
    pub fn load(dir: &Path) -> Self {
        match Self::try_load(dir) {
            Ok(registry) => registry,
            Err(message) => {
                warn!(dir = %dir.display(), error = %message, "data-driven service registry failed to load, using empty registry");
                Self::default()
            }
        }
    }

    fn try_load(dir: &Path) -> Result<Self, String> {
        let types: ServiceTypesDocument = read_document(&dir.join("service-types.yaml"))?;
        let instances: ServiceInstancesDocument = read_document(&dir.join("service-instances.yaml"))?;
        let policies: RotationPoliciesDocument = read_document(&dir.join("rotation-policies.yaml"))?;
        let principals: PrincipalsDocument = read_document(&dir.join("principals.yaml"))?;

        let type_names: HashMap<&str, &ServiceTypeDef> =
            types.service_types.iter().map(|t| (t.name.as_str(), t)).collect();
        let policy_names: std::collections::HashSet<&str> =
            policies.rotation_policies.iter().map(|p| p.name.as_str()).collect();
        let principal_names: std::collections::HashSet<&str> =
            principals.principals.iter().map(|p| p.name.as_str()).collect();

        for instance in &instances.service_instances {
            let service_type = type_names.get(instance.service_type.as_str()).ok_or_else(|| {
                format!("service instance '{}' references unknown service type '{}'", instance.name, instance.service_type)
            })?;
            if !service_type.credential_kinds.is_empty()
                && !service_type.credential_kinds.contains(&instance.credential_kind)
            {
                return Err(format!(
                    "service instance '{}' declares credential kind '{}' not on type '{}'",
                    instance.name, instance.credential_kind, instance.service_type
                ));
            }
            if !policy_names.contains(instance.rotation_policy.as_str()) {
                return Err(format!(
                    "service instance '{}' references unknown rotation policy '{}'",
                    instance.name, instance.rotation_policy
                ));
            }
            for principal in &instance.principals {
                if !principal_names.contains(principal.as_str()) {
                    return Err(format!(
                        "service instance '{}' references unknown principal '{}'",
                        instance.name, principal
                    ));
                }
            }
        }

        Ok(Self { service_types: types.service_types, instances: instances.service_instances })
    }

    /// Build a live [`Service`] for every instance whose type's strategy is
    /// known, skipping (with a warning) any whose strategy factory rejects
    /// its config or is itself unknown.
    pub fn build_services(&self) -> Vec<(String, Arc<dyn Service>)> {
        let type_names: HashMap<&str, &ServiceTypeDef> =
            self.service_types.iter().map(|t| (t.name.as_str(), t)).collect();

        self.instances
            .iter()
            .filter_map(|instance| {
                let service_type = type_names.get(instance.service_type.as_str())?;
                let cfg = ProviderConfig {
                    type_name: service_type.strategy.clone(),
                    timeout_ms: None,
                    config: instance.config.clone(),
                };
                match build_service(&instance.name, &cfg) {
                    Ok(Some(service)) => Some((instance.name.clone(), service)),
                    Ok(None) => None,
                    Err(e) => {
                        warn!(service = %instance.name, error = %e, "data-driven service instance failed to build");
                        None
                    }
                }
            })
            .collect()
    }
}
