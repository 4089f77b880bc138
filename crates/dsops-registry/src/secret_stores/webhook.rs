use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::{Capabilities, Reference};

use crate::error::ProviderError;
use crate::provider::Provider;

/// A generic webhook-backed secret store: `GET {base_url}/{path}` returns the
/// secret body as plain text, optionally gated by a bearer token. Used both
/// as a standalone `type` and as the implementation pattern the stubbed
/// cloud-backed types would follow once given real credentials.
pub struct WebhookProvider {
    name: String,
    base_url: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl WebhookProvider {
    pub fn new(name: impl Into<String>, base_url: String, bearer_token: Option<String>) -> Self {
        Self { name: name.into(), base_url, bearer_token, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl Provider for WebhookProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_versioning: false,
            supports_metadata: false,
            requires_auth: self.bearer_token.is_some(),
            auth_methods: vec!["bearer".to_string()],
        }
    }

    async fn validate(&self, timeout: Duration) -> Result<(), ProviderError> {
        let mut req = self.client.get(&self.base_url);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }
        tokio::time::timeout(timeout, req.send())
            .await
            .map_err(|_| ProviderError::Timeout(timeout))?
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
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
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), secret_ref.path);
        let mut req = self.client.get(&url);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }
        let resp = tokio::time::timeout(timeout, req.send())
            .await
            .map_err(|_| ProviderError::Timeout(timeout))?
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        match resp.status().as_u16() {
            404 => return Err(ProviderError::NotFound(secret_ref.path)),
            401 | 403 => return Err(ProviderError::Auth("webhook store denied access".to_string())),
            s if s >= 500 => return Err(ProviderError::Transport(format!("webhook store returned {s}"))),
            _ => {}
        }

        let body = resp.text().await.map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok((body, HashMap::new()))
    }
}
