use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dsops_config::Config;
use dsops_domain::Reference;

use crate::data_driven::DataDrivenRegistry;
use crate::error::RegistryError;
use crate::provider::Provider;
use crate::secret_stores::build_secret_store;
use crate::service::Service;
use crate::services_builtin::build_service;

/// The two-tier provider/service registry (§4.B, §4.C): built-in factories
/// registered from the config document's `secretStores`/`services`/legacy
/// `providers` blocks, supplemented by a data-driven service repository.
pub struct Registry {
    providers: HashMap<String, Arc<dyn Provider>>,
    services: HashMap<String, Arc<dyn Service>>,
}

impl Registry {
    /// Build a registry from a loaded [`Config`]. Unknown provider/service
    /// types are skipped with a warning (§4.B "unknown type name"), never a
    /// hard failure, so the rest of the document keeps working.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let mut providers = HashMap::new();
        for (name, cfg) in config.document().secret_stores.iter() {
            if let Some(provider) = build_secret_store(name, cfg)? {
                providers.insert(name.clone(), provider);
            }
        }
        for (name, cfg) in config.document().providers.iter() {
            if let Some(provider) = build_secret_store(name, cfg)? {
                providers.insert(name.clone(), provider);
            }
        }

        let mut services = HashMap::new();
        for (name, cfg) in config.document().services.iter() {
            if let Some(service) = build_service(name, cfg)? {
                services.insert(name.clone(), service);
            }
        }

        Ok(Self { providers, services })
    }

    /// Merge in services built from a data-driven repository loaded from
    /// `data_dir` (§4.C, §9). A service instance whose name collides with
    /// one already registered from the config document loses — config
    /// document entries take precedence.
    pub fn with_data_driven_services(mut self, data_dir: &Path) -> Self {
        let repo = DataDrivenRegistry::load(data_dir);
        for (name, service) in repo.build_services() {
            self.services.entry(name).or_insert(service);
        }
        self
    }

    pub fn get_provider(&self, name: &str) -> Result<Arc<dyn Provider>, RegistryError> {
        self.providers.get(name).cloned().ok_or_else(|| RegistryError::ProviderNotRegistered(name.to_string()))
    }

    pub fn get_service(&self, name: &str) -> Result<Arc<dyn Service>, RegistryError> {
        self.services.get(name).cloned().ok_or_else(|| RegistryError::ServiceNotRegistered(name.to_string()))
    }

    /// Resolve a [`Reference`] to its owning provider, rejecting a
    /// `Reference::Service` (services are rotation targets, not secret
    /// stores — §4.A / §4.B "ServiceNotAProvider").
    pub fn provider_for(&self, reference: &Reference) -> Result<Arc<dyn Provider>, RegistryError> {
        let name = reference.effective_provider();
        if reference.is_service_reference() {
            return if self.services.contains_key(name) {
                Err(RegistryError::ServiceNotAProvider(name.to_string()))
            } else {
                Err(RegistryError::ProviderNotRegistered(name.to_string()))
            };
        }
        self.get_provider(name)
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}
