use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::{Capabilities, Reference};
use tokio::time::sleep;

use crate::error::ProviderError;
use crate::provider::Provider;

/// `type: mock` — a test double driven entirely by its config: `values` is
/// returned verbatim, `not_found` paths always raise `NotFound`, `latency_ms`
/// simulates a slow backend for timeout/concurrency tests, and `fail_auth`
/// makes every call raise `Auth` regardless of path.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    name: String,
    values: HashMap<String, String>,
    not_found: Vec<String>,
    latency: Duration,
    fail_auth: bool,
}

impl MockProvider {
    pub fn new(
        name: impl Into<String>,
        values: HashMap<String, String>,
        not_found: Vec<String>,
        latency: Duration,
        fail_auth: bool,
    ) -> Self {
        Self { name: name.into(), values, not_found, latency, fail_auth }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_versioning: true,
            supports_metadata: true,
            requires_auth: false,
            auth_methods: vec!["mock".to_string()],
        }
    }

    async fn validate(&self, _timeout: Duration) -> Result<(), ProviderError> {
        if self.fail_auth {
            return Err(ProviderError::Auth("mock provider configured to fail auth".to_string()));
        }
        Ok(())
    }

    async fn get(
        &self,
        reference: &Reference,
        _timeout: Duration,
    ) -> Result<(String, HashMap<String, String>), ProviderError> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        if self.fail_auth {
            return Err(ProviderError::Auth("mock provider configured to fail auth".to_string()));
        }
        let secret_ref = reference
            .to_secret_ref()
            .map_err(|e| ProviderError::InvalidReference(e.to_string()))?;
        if self.not_found.iter().any(|p| p == &secret_ref.path) {
            return Err(ProviderError::NotFound(secret_ref.path));
        }
        let mut metadata = HashMap::new();
        if let Some(version) = &secret_ref.version {
            metadata.insert("version".to_string(), version.clone());
        }
        self.values
            .get(&secret_ref.path)
            .cloned()
            .map(|v| (v, metadata))
            .ok_or_else(|| ProviderError::NotFound(secret_ref.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn respects_not_found_list() {
        let provider = MockProvider::new("m", HashMap::new(), vec!["gone".into()], Duration::ZERO, false);
        let reference = Reference::Legacy { provider: "m".into(), key: "gone".into(), version: None };
        let err = provider.get(&reference, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn fail_auth_overrides_everything() {
        let mut values = HashMap::new();
        values.insert("k".into(), "v".into());
        let provider = MockProvider::new("m", values, vec![], Duration::ZERO, true);
        let reference = Reference::Legacy { provider: "m".into(), key: "k".into(), version: None };
        let err = provider.get(&reference, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth(_)));
    }
}
