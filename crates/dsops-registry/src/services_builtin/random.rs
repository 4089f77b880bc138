use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::Capabilities;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::ServiceError;
use crate::service::{PlanStep, RotationPlan, RotationRequest, RotationResult, Service};

/// `strategy: random` — generates a new value with no target-system cutover.
/// Verification and rollback are no-ops; intended for secrets whose
/// "rotation" is simply replacing the stored value (API keys with no
/// dual-credential window, shared tokens, etc).
pub struct RandomService {
    name: String,
    length: usize,
}

impl RandomService {
    pub fn new(name: impl Into<String>, length: usize) -> Self {
        Self { name: name.into(), length: length.max(8) }
    }

    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

#[async_trait]
impl Service for RandomService {
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

    async fn validate(&self, _timeout: Duration) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn plan(&self, request: &RotationRequest) -> Result<RotationPlan, ServiceError> {
        Ok(RotationPlan {
            service_name: request.service_name.clone(),
            strategy: "random".to_string(),
            steps: vec![PlanStep {
                description: "generate a new random value".to_string(),
                estimated_duration: Some(Duration::from_millis(1)),
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
        let new_value = request.new_value.clone().unwrap_or_else(|| self.generate());
        Ok(RotationResult {
            service_name: request.service_name.clone(),
            old_version: None,
            new_version: Some(new_value),
            duration: Duration::from_millis(1),
            steps: vec!["generated new value".to_string()],
        })
    }

    async fn verify(&self, _result: &RotationResult, _timeout: Duration) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn rollback(&self, _result: &RotationResult) -> Result<(), ServiceError> {
        Ok(())
    }
}
