use std::sync::Arc;

use async_trait::async_trait;
use dsops_domain::{HistoryAction, HistoryEntry, HistoryStatus, RollbackPolicy, SecretType};
use tracing::{info, warn};

use crate::error::RotationError;
use crate::storage::RotationStorage;

/// The pair of effects a manual rollback drives (§4.E "Manual rollback"):
/// restore the previous credential value, then confirm the target accepts
/// it. Supplied by the caller (normally the CLI, wired to a [`dsops_registry::Service`])
/// rather than owned by the engine itself.
#[async_trait]
pub trait RollbackAction: Send + Sync {
    async fn restore(&self) -> Result<(), String>;
    async fn verify(&self) -> Result<(), String>;
}

/// A manual rollback request (§4.E), distinct from the automatic rollback
/// the engine runs inline after a failed verification.
pub struct RollbackRequest {
    pub service_name: String,
    pub environment: String,
    pub reason: String,
    pub previous_version: Option<String>,
    pub failed_version: Option<String>,
    pub action: Arc<dyn RollbackAction>,
    pub initiated_by: Option<String>,
    pub dry_run: bool,
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct RollbackPlan {
    pub service_name: String,
    pub environment: String,
    pub reason: String,
    pub previous_version: Option<String>,
    pub failed_version: Option<String>,
}

impl std::fmt::Display for RollbackPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rollback {} ({}): {} -> {} [{}]",
            self.service_name,
            self.environment,
            self.failed_version.as_deref().unwrap_or("unknown"),
            self.previous_version.as_deref().unwrap_or("unknown"),
            self.reason,
        )
    }
}

/// Drives manual rollbacks: displays a plan, requires confirmation unless
/// `force`, retries the restore/verify pair per [`RollbackPolicy`], and
/// records the outcome in history and status (§4.E "Manual rollback").
pub struct RollbackManager {
    storage: Arc<RotationStorage>,
}

impl RollbackManager {
    pub fn new(storage: Arc<RotationStorage>) -> Self {
        Self { storage }
    }

    pub fn plan(&self, request: &RollbackRequest) -> RollbackPlan {
        RollbackPlan {
            service_name: request.service_name.clone(),
            environment: request.environment.clone(),
            reason: request.reason.clone(),
            previous_version: request.previous_version.clone(),
            failed_version: request.failed_version.clone(),
        }
    }

    /// Execute `request`. Callers are expected to have already obtained
    /// confirmation when `!force`; this function does not prompt.
    pub async fn execute(&self, request: RollbackRequest, policy: &RollbackPolicy) -> Result<HistoryEntry, RotationError> {
        if request.reason.trim().is_empty() {
            return Err(RotationError::Rollback("rollback reason is required".to_string()));
        }

        let plan = self.plan(&request);
        info!(plan = %plan, dry_run = request.dry_run, "manual rollback requested");

        if request.dry_run {
            return Ok(self.history_entry(&request, HistoryStatus::Success, 0, Some("dry run, no changes made".to_string())));
        }

        let started = std::time::Instant::now();
        let mut last_error = None;

        for attempt in 0..policy.max_retries.max(1) + 1 {
            if attempt > 0 {
                warn!(service = %request.service_name, attempt, "retrying manual rollback");
                tokio::time::sleep(std::time::Duration::from_secs(2u64.pow(attempt.min(4)))).await;
            }

            let outcome = tokio::time::timeout(std::time::Duration::from_secs(policy.timeout_secs), async {
                request.action.restore().await?;
                request.action.verify().await
            })
            .await;

            match outcome {
                Ok(Ok(())) => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    let entry = self.history_entry(&request, HistoryStatus::Success, duration_ms, None);
                    self.storage.append_history(&entry)?;
                    self.mark_active(&request)?;
                    return Ok(entry);
                }
                Ok(Err(e)) => last_error = Some(e),
                Err(_) => last_error = Some("rollback timed out".to_string()),
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let entry = self.history_entry(&request, HistoryStatus::Failed, duration_ms, last_error.clone());
        self.storage.append_history(&entry)?;
        Err(RotationError::Rollback(last_error.unwrap_or_else(|| "unknown rollback failure".to_string())))
    }

    fn mark_active(&self, request: &RollbackRequest) -> Result<(), RotationError> {
        let mut status = self.storage.load_status(&request.service_name)?;
        status.status = dsops_domain::RotationState::Active;
        status.metadata.insert("last_rollback_reason".to_string(), request.reason.clone());
        status.metadata.insert("current_version".to_string(), request.previous_version.clone().unwrap_or_default());
        self.storage.save_status(&status)?;
        Ok(())
    }

    fn history_entry(
        &self,
        request: &RollbackRequest,
        status: HistoryStatus,
        duration_ms: u64,
        error: Option<String>,
    ) -> HistoryEntry {
        HistoryEntry {
            id: history_id(&request.service_name),
            timestamp: chrono::Utc::now(),
            service_name: request.service_name.clone(),
            credential_type: SecretType::Generic,
            action: HistoryAction::Rollback,
            status,
            duration_ms,
            error,
            user: request.initiated_by.clone(),
            old_version: request.failed_version.clone(),
            new_version: request.previous_version.clone(),
            strategy: "manual".to_string(),
            steps: vec![request.reason.clone()],
            metadata: Default::default(),
        }
    }
}

fn history_id(service_name: &str) -> String {
    format!("{service_name}-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingAction;

    #[async_trait]
    impl RollbackAction for FailingAction {
        async fn restore(&self) -> Result<(), String> {
            Err("restore backend unreachable".to_string())
        }
        async fn verify(&self) -> Result<(), String> {
            Ok(())
        }
    }

    struct SucceedingAction;

    #[async_trait]
    impl RollbackAction for SucceedingAction {
        async fn restore(&self) -> Result<(), String> {
            Ok(())
        }
        async fn verify(&self) -> Result<(), String> {
            Ok(())
        }
    }

    fn request(action: Arc<dyn RollbackAction>) -> RollbackRequest {
        RollbackRequest {
            service_name: "db-primary".to_string(),
            environment: "production".to_string(),
            reason: "bad credential pushed".to_string(),
            previous_version: Some("v1".to_string()),
            failed_version: Some("v2".to_string()),
            action,
            initiated_by: Some("oncall".to_string()),
            dry_run: false,
            force: true,
        }
    }

    #[tokio::test]
    async fn empty_reason_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(RotationStorage::new(dir.path().to_path_buf()));
        let manager = RollbackManager::new(storage);
        let mut req = request(Arc::new(SucceedingAction));
        req.reason = "".to_string();
        assert!(manager.execute(req, &RollbackPolicy::default()).await.is_err());
    }

    #[tokio::test]
    async fn successful_rollback_marks_service_active() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(RotationStorage::new(dir.path().to_path_buf()));
        let manager = RollbackManager::new(storage.clone());
        let req = request(Arc::new(SucceedingAction));
        manager.execute(req, &RollbackPolicy::default()).await.unwrap();
        let status = storage.load_status("db-primary").unwrap();
        assert_eq!(status.status, dsops_domain::RotationState::Active);
    }

    #[tokio::test]
    async fn exhausted_retries_return_rollback_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(RotationStorage::new(dir.path().to_path_buf()));
        let manager = RollbackManager::new(storage);
        let policy = RollbackPolicy { max_retries: 1, ..RollbackPolicy::default() };
        let req = request(Arc::new(FailingAction));
        assert!(manager.execute(req, &policy).await.is_err());
    }
}
