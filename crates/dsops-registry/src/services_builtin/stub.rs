use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::Capabilities;

use crate::error::ServiceError;
use crate::service::{RotationPlan, RotationRequest, RotationResult, Service};

/// Registered for a known strategy name with no built-in client in this
/// build (`postgres`, `mysql`, `mongodb`, `stripe`, `github`, `certificate`).
/// Plan succeeds so capability discovery and CLI dry-runs work end-to-end;
/// `execute` fails immediately rather than performing a partial rotation.
pub struct StubService {
    name: String,
    strategy: String,
}

impl StubService {
    pub fn new(name: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self { name: name.into(), strategy: strategy.into() }
    }
}

#[async_trait]
impl Service for StubService {
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

    async fn validate(&self, _timeout: Duration) -> Result<(), ServiceError> {
        Err(ServiceError::Plan(format!(
            "strategy '{}' is registered but not implemented in this build",
            self.strategy
        )))
    }

    async fn plan(&self, request: &RotationRequest) -> Result<RotationPlan, ServiceError> {
        Err(ServiceError::Plan(format!(
            "strategy '{}' is registered but not implemented in this build (service '{}')",
            self.strategy, request.service_name
        )))
    }

    async fn execute(&self, _plan: &RotationPlan, request: &RotationRequest) -> Result<RotationResult, ServiceError> {
        Err(ServiceError::Execute(format!(
            "strategy '{}' is registered but not implemented in this build (service '{}')",
            self.strategy, request.service_name
        )))
    }

    async fn verify(&self, _result: &RotationResult, _timeout: Duration) -> Result<(), ServiceError> {
        Err(ServiceError::Verification(format!(
            "strategy '{}' is registered but not implemented in this build",
            self.strategy
        )))
    }

    async fn rollback(&self, _result: &RotationResult) -> Result<(), ServiceError> {
        Err(ServiceError::Rollback(format!(
            "strategy '{}' is registered but not implemented in this build",
            self.strategy
        )))
    }
}
