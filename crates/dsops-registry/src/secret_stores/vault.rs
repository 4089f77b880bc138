use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::{Capabilities, Reference};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ProviderError;
use crate::provider::Provider;

/// `type: vault` — a thin HTTP client against a HashiCorp Vault-compatible KV
/// v2 engine. `base_url` and the underlying `reqwest::Client` are both
/// swappable for testing, the same way the GCP/AWS driver clients in this
/// workspace's cloud layer are.
pub struct VaultProvider {
    name: String,
    base_url: String,
    token: Option<String>,
    mount: String,
    client: reqwest::Client,
}

impl VaultProvider {
    pub fn new(name: impl Into<String>, base_url: String, token: Option<String>, mount: String) -> Self {
        Self { name: name.into(), base_url, token, mount, client: reqwest::Client::new() }
    }

    fn secret_url(&self, path: &str) -> String {
        format!("{}/v1/{}/data/{}", self.base_url.trim_end_matches('/'), self.mount, path)
    }
}

#[derive(Deserialize)]
struct VaultReadResponse {
    data: VaultReadData,
}

#[derive(Deserialize)]
struct VaultReadData {
    data: HashMap<String, Value>,
    metadata: Option<VaultMetadata>,
}

#[derive(Deserialize)]
struct VaultMetadata {
    version: Option<u64>,
}

#[async_trait]
impl Provider for VaultProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_versioning: true,
            supports_metadata: true,
            requires_auth: true,
            auth_methods: vec!["token".to_string()],
        }
    }

    async fn validate(&self, timeout: Duration) -> Result<(), ProviderError> {
        let url = format!("{}/v1/sys/health", self.base_url.trim_end_matches('/'));
        let mut req = self.client.get(&url);
        if let Some(token) = &self.token {
            req = req.header("X-Vault-Token", token);
        }
        let resp = tokio::time::timeout(timeout, req.send())
            .await
            .map_err(|_| ProviderError::Timeout(timeout))?
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if resp.status().is_client_error() && resp.status().as_u16() == 403 {
            return Err(ProviderError::Auth("vault rejected token during health check".to_string()));
        }
        Ok(())
    }

    async fn get(
        &self,
        reference: &Reference,
        timeout: Duration,
    ) -> Result<(String, HashMap<String, String>), ProviderError> {
        let secret_ref = reference
            .to_secret_ref()
            .map_err(|e| ProviderError::InvalidReference(e.to_string()))?;

        let mut url = self.secret_url(&secret_ref.path);
        if let Some(version) = &secret_ref.version {
            url = format!("{url}?version={version}");
        }

        let mut req = self.client.get(&url);
        if let Some(token) = &self.token {
            req = req.header("X-Vault-Token", token);
        }

        let resp = tokio::time::timeout(timeout, req.send())
            .await
            .map_err(|_| ProviderError::Timeout(timeout))?
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        match resp.status().as_u16() {
            404 => return Err(ProviderError::NotFound(secret_ref.path)),
            401 | 403 => return Err(ProviderError::Auth("vault denied access".to_string())),
            s if s >= 500 => return Err(ProviderError::Transport(format!("vault returned {s}"))),
            _ => {}
        }

        let parsed: VaultReadResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("decoding vault response: {e}")))?;

        let field = secret_ref.field.as_deref().unwrap_or("value");
        let raw = parsed.data.data.get(field).ok_or_else(|| {
            ProviderError::NotFound(format!("{}#{field}", secret_ref.path))
        })?;
        let value = match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        let mut metadata = HashMap::new();
        if let Some(meta) = parsed.data.metadata {
            if let Some(version) = meta.version {
                metadata.insert("version".to_string(), version.to_string());
            }
        }
        if metadata.is_empty() {
            warn!(store = %self.name, "vault response carried no version metadata");
        }
        Ok((value, metadata))
    }
}
