use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::Capabilities;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;

use crate::error::ServiceError;
use crate::service::{PlanStep, RotationPlan, RotationRequest, RotationResult, Service};

/// `strategy: generic` — a single-phase cutover against any HTTP endpoint
/// that accepts `{"value": "..."}` on `PUT {base_url}/credential` and
/// reports current health on `GET {base_url}/health`. The fallback strategy
/// for target systems with no dedicated client, in the same spirit as
/// [`crate::secret_stores::webhook::WebhookProvider`] on the provider side.
pub struct GenericService {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl GenericService {
    pub fn new(name: impl Into<String>, base_url: String) -> Self {
        Self { name: name.into(), base_url, client: reqwest::Client::new() }
    }

    fn generate_value(&self) -> String {
        rand::thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
    }

    async fn put_value(&self, value: &str, timeout: Duration) -> Result<(), ServiceError> {
        let url = format!("{}/credential", self.base_url.trim_end_matches('/'));
        let resp = tokio::time::timeout(
            timeout,
            self.client.put(&url).json(&json!({ "value": value })).send(),
        )
        .await
        .map_err(|_| ServiceError::Timeout(timeout))?
        .map_err(|e| ServiceError::Execute(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ServiceError::Execute(format!("target rejected new credential: {}", resp.status())));
        }
        Ok(())
    }
}

#[async_trait]
impl Service for GenericService {
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

    async fn validate(&self, timeout: Duration) -> Result<(), ServiceError> {
        let url = format!("{}/health", self.base_url.trim_end_matches('/'));
        tokio::time::timeout(timeout, self.client.get(&url).send())
            .await
            .map_err(|_| ServiceError::Timeout(timeout))?
            .map_err(|e| ServiceError::Plan(e.to_string()))?;
        Ok(())
    }

    async fn plan(&self, request: &RotationRequest) -> Result<RotationPlan, ServiceError> {
        Ok(RotationPlan {
            service_name: request.service_name.clone(),
            strategy: "generic".to_string(),
            steps: vec![PlanStep {
                description: format!("PUT new credential to {}/credential", self.base_url),
                estimated_duration: Some(Duration::from_secs(2)),
            }],
            target_version: None,
            on_conflict: request.on_conflict,
            artifacts: Default::default(),
        })
    }

    async fn execute(
        &self,
        _plan: &RotationPlan,
        request: &RotationRequest,
    ) -> Result<RotationResult, ServiceError> {
        let new_value = request.new_value.clone().unwrap_or_else(|| self.generate_value());
        self.put_value(&new_value, Duration::from_secs(10)).await?;
        Ok(RotationResult {
            service_name: request.service_name.clone(),
            old_version: None,
            new_version: Some(new_value),
            duration: Duration::from_secs(2),
            steps: vec!["updated credential at target".to_string()],
        })
    }

    async fn verify(&self, _result: &RotationResult, timeout: Duration) -> Result<(), ServiceError> {
        self.validate(timeout).await.map_err(|e| match e {
            ServiceError::Plan(msg) => ServiceError::Verification(msg),
            other => other,
        })
    }

    async fn rollback(&self, result: &RotationResult) -> Result<(), ServiceError> {
        match &result.old_version {
            Some(old) => self.put_value(old, Duration::from_secs(10)).await.map_err(|e| match e {
                ServiceError::Execute(msg) => ServiceError::Rollback(msg),
                other => other,
            }),
            None => Err(ServiceError::Rollback("no prior value recorded to roll back to".to_string())),
        }
    }
}
