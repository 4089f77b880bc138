use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::{Capabilities, Reference};

use crate::error::ProviderError;
use crate::provider::Provider;

/// `type: literal` — an in-process store whose entries are declared inline in
/// the config document's `config.values` map. Used for trivial configs and
/// as the simplest possible `Reference::Store` target in tests.
pub struct LiteralProvider {
    name: String,
    values: HashMap<String, String>,
}

impl LiteralProvider {
    pub fn new(name: impl Into<String>, values: HashMap<String, String>) -> Self {
        Self { name: name.into(), values }
    }
}

#[async_trait]
impl Provider for LiteralProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_versioning: false,
            supports_metadata: false,
            requires_auth: false,
            auth_methods: vec![],
        }
    }

    async fn validate(&self, _timeout: Duration) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn get(
        &self,
        reference: &Reference,
        _timeout: Duration,
    ) -> Result<(String, HashMap<String, String>), ProviderError> {
        let secret_ref = reference
            .to_secret_ref()
            .map_err(|e| ProviderError::InvalidReference(e.to_string()))?;
        self.values
            .get(&secret_ref.path)
            .cloned()
            .map(|v| (v, HashMap::new()))
            .ok_or_else(|| ProviderError::NotFound(secret_ref.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_value() {
        let mut values = HashMap::new();
        values.insert("db/creds".to_string(), "hunter2".to_string());
        let provider = LiteralProvider::new("lit", values);
        let reference = Reference::Legacy { provider: "lit".into(), key: "db/creds".into(), version: None };
        let (value, _) = provider.get(&reference, Duration::from_secs(1)).await.unwrap();
        assert_eq!(value, "hunter2");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let provider = LiteralProvider::new("lit", HashMap::new());
        let reference = Reference::Legacy { provider: "lit".into(), key: "missing".into(), version: None };
        let err = provider.get(&reference, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }
}
