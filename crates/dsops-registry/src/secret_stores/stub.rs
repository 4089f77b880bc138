use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::{Capabilities, Reference};

use crate::error::ProviderError;
use crate::provider::Provider;

/// Registered for a known-but-not-implemented built-in type name (e.g.
/// `bitwarden`, `aws.secretsmanager`). Exercises registry/capability/
/// validation plumbing end-to-end without requiring live third-party
/// credentials; any actual `get` fails with a `Transport` error naming the
/// gap rather than panicking or silently returning an empty value.
pub struct StubProvider {
    name: String,
    type_name: String,
}

impl StubProvider {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self { name: name.into(), type_name: type_name.into() }
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_versioning: false,
            supports_metadata: false,
            requires_auth: true,
            auth_methods: vec![],
        }
    }

    async fn validate(&self, _timeout: Duration) -> Result<(), ProviderError> {
        Err(ProviderError::Transport(format!(
            "provider type '{}' is registered but not implemented in this build",
            self.type_name
        )))
    }

    async fn get(
        &self,
        _reference: &Reference,
        _timeout: Duration,
    ) -> Result<(String, HashMap<String, String>), ProviderError> {
        Err(ProviderError::Transport(format!(
            "provider type '{}' is registered but not implemented in this build",
            self.type_name
        )))
    }
}
