use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::{Capabilities, RotationStatus, SecretRef, SecretType};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Advisory hint threaded from the CLI's `--on-conflict` flag onto a
/// [`RotationPlan`] (§9 Open Questions, resolved): the engine's own
/// conflict detection (one rotation in flight per service, minimum interval)
/// is unconditional and does not change based on this value, since no
/// current strategy defines `skip` vs `fail` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnConflict {
    #[default]
    Fail,
    Skip,
    Rollback,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationConstraints {
    pub min_rotation_interval: Option<chrono::Duration>,
    pub grace_period: Option<chrono::Duration>,
}

/// A request to rotate a single secret against its target service (§4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationRequest {
    pub service_name: String,
    pub provider_name: String,
    pub reference: SecretRef,
    pub secret_type: Option<SecretType>,
    pub metadata: HashMap<String, String>,
    pub strategy: String,
    pub new_value: Option<String>,
    pub dry_run: bool,
    pub force: bool,
    pub on_conflict: OnConflict,
    pub constraints: RotationConstraints,
}

impl RotationRequest {
    /// Resolve the effective secret type: the request's explicit value, else
    /// inferred from the strategy name then the reference path (§4.E).
    pub fn effective_secret_type(&self) -> SecretType {
        self.secret_type
            .unwrap_or_else(|| SecretType::infer(&self.strategy, &self.reference.path))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    pub estimated_duration: Option<Duration>,
}

/// Produced by [`Service::plan`]; returned directly to the caller when
/// `dry_run` is set, with no state or history written (§4.E step 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationPlan {
    pub service_name: String,
    pub strategy: String,
    pub steps: Vec<PlanStep>,
    pub target_version: Option<String>,
    pub on_conflict: OnConflict,
    pub artifacts: HashMap<String, String>,
}

/// Produced by [`Service::execute`]; fed into [`Service::verify`] and, on
/// failure, [`Service::rollback`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationResult {
    pub service_name: String,
    pub old_version: Option<String>,
    pub new_version: Option<String>,
    pub duration: Duration,
    pub steps: Vec<String>,
}

/// The runtime object for a rotation target (§3 "Service").
#[async_trait]
pub trait Service: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    async fn validate(&self, timeout: Duration) -> Result<(), ServiceError>;

    async fn plan(&self, request: &RotationRequest) -> Result<RotationPlan, ServiceError>;

    async fn execute(&self, plan: &RotationPlan, request: &RotationRequest) -> Result<RotationResult, ServiceError>;

    async fn verify(&self, result: &RotationResult, timeout: Duration) -> Result<(), ServiceError>;

    async fn rollback(&self, result: &RotationResult) -> Result<(), ServiceError>;

    /// A service-reported view of its own status; distinct from the engine's
    /// persisted [`RotationStatus`], which the rotation engine maintains
    /// independently of what any one service reports.
    async fn get_status(&self) -> Result<Option<RotationStatus>, ServiceError> {
        Ok(None)
    }
}
