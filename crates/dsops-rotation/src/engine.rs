use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dsops_domain::{HistoryAction, HistoryEntry, HistoryStatus, Policies, RotationState, RotationStatus};
use dsops_registry::{RotationPlan, RotationRequest, RotationResult, Service};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

use crate::error::RotationError;
use crate::notifier::{NotificationEvent, Notifier};
use crate::storage::RotationStorage;

const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of [`RotationEngine::rotate`]. `result`/`history` are `None` for
/// a `dry_run` request, which writes no state (§4.E step 2).
pub struct RotationOutcome {
    pub plan: RotationPlan,
    pub result: Option<RotationResult>,
    pub history: Option<HistoryEntry>,
    pub notifications: Vec<crate::notifier::DeliveryResult>,
}

/// Drives the rotation state machine: `never_rotated`/`active` ->
/// `rotating` -> `active` (success) or `failed` (exhausted rollback) per
/// service, enforcing at most one in-flight rotation per service and the
/// request's own conflict constraints (§4.E).
pub struct RotationEngine {
    storage: Arc<RotationStorage>,
    notifier: Notifier,
    locks: std::sync::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RotationEngine {
    pub fn new(storage: Arc<RotationStorage>) -> Self {
        Self { storage, notifier: Notifier::new(), locks: std::sync::Mutex::new(HashMap::new()) }
    }

    fn lock_for(&self, service_name: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("rotation lock map poisoned");
        locks.entry(service_name.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    #[instrument(skip(self, service, request, policies), fields(service = %request.service_name))]
    pub async fn rotate(
        &self,
        service: &dyn Service,
        request: RotationRequest,
        policies: &Policies,
    ) -> Result<RotationOutcome, RotationError> {
        let plan = service.plan(&request).await?;

        if request.dry_run {
            info!("dry run: plan computed, no state written");
            return Ok(RotationOutcome { plan, result: None, history: None, notifications: Vec::new() });
        }

        let lock = self.lock_for(&request.service_name);
        let _guard = lock.lock().await;

        let mut status = self.storage.load_status(&request.service_name)?;
        if status.status == RotationState::Rotating {
            return Err(RotationError::Conflict {
                service: request.service_name.clone(),
                reason: "a rotation is already in flight for this service".to_string(),
            });
        }
        if !request.force {
            self.check_constraints(&request, &status)?;
        }

        status.status = RotationState::Rotating;
        self.storage.save_status(&status)?;

        let started = std::time::Instant::now();
        let execute_outcome = service.execute(&plan, &request).await;

        let (result, history, notification_event) = match execute_outcome {
            Err(e) => {
                status.status = RotationState::Failed;
                status.failure_count += 1;
                status.last_error = Some(e.to_string());
                self.storage.save_status(&status)?;

                let history = self.history_entry(
                    &request,
                    HistoryAction::Rotate,
                    HistoryStatus::Failed,
                    started.elapsed(),
                    None,
                    None,
                    vec!["execute".to_string()],
                    Some(e.to_string()),
                );
                self.storage.append_history(&history)?;
                (None, history, ("rotate", false, format!("execute failed: {e}")))
            }
            Ok(result) => self.verify_and_settle(service, &request, &mut status, &result, started.elapsed(), policies).await?,
        };

        let notifications = if let Some(policy) = policies.notification.as_ref() {
            self.notifier
                .notify(
                    policy,
                    &NotificationEvent {
                        service_name: request.service_name.clone(),
                        action: notification_event.0,
                        success: notification_event.1,
                        message: notification_event.2,
                    },
                )
                .await
        } else {
            Vec::new()
        };

        Ok(RotationOutcome { plan, result, history: Some(history), notifications })
    }

    async fn verify_and_settle(
        &self,
        service: &dyn Service,
        request: &RotationRequest,
        status: &mut RotationStatus,
        result: &RotationResult,
        execute_elapsed: Duration,
        policies: &Policies,
    ) -> Result<(Option<RotationResult>, HistoryEntry, (&'static str, bool, String)), RotationError> {
        let verify_timeout = DEFAULT_VERIFY_TIMEOUT;
        let verify_outcome = tokio::time::timeout(verify_timeout, service.verify(result, verify_timeout)).await;

        match verify_outcome {
            Ok(Ok(())) => {
                status.status = RotationState::Active;
                status.rotation_count += 1;
                status.success_count += 1;
                status.last_rotation = Some(chrono::Utc::now());
                status.last_error = None;
                status.last_result = Some("success".to_string());
                self.storage.save_status(status)?;

                let history = self.history_entry(
                    request,
                    HistoryAction::Rotate,
                    HistoryStatus::Success,
                    execute_elapsed,
                    result.old_version.clone(),
                    result.new_version.clone(),
                    result.steps.clone(),
                    None,
                );
                self.storage.append_history(&history)?;
                Ok((Some(result.clone()), history, ("rotate", true, "rotation verified".to_string())))
            }
            verify_failure => {
                let verify_error = match verify_failure {
                    Ok(Err(e)) => e.to_string(),
                    Err(_) => "verification timed out".to_string(),
                    Ok(Ok(())) => unreachable!(),
                };
                warn!(service = %request.service_name, error = %verify_error, "rotation verify failed");

                let rollback_policy = policies.rollback.clone().unwrap_or_default();
                let rollback_outcome = if rollback_policy.auto_rollback_on_verify_failure {
                    Some(self.rollback_with_retries(service, result, &rollback_policy).await)
                } else {
                    None
                };

                status.failure_count += 1;
                status.last_error = Some(verify_error.clone());
                status.last_result = Some("failed".to_string());
                let (history_status, message) = match rollback_outcome {
                    Some(Ok(())) => {
                        status.status = RotationState::Active;
                        (HistoryStatus::RolledBack, format!("verify failed ({verify_error}); rolled back"))
                    }
                    Some(Err(rollback_error)) => {
                        status.status = RotationState::Failed;
                        (HistoryStatus::Failed, format!("verify failed ({verify_error}); rollback also failed: {rollback_error}"))
                    }
                    None => {
                        status.status = RotationState::Failed;
                        (HistoryStatus::Failed, format!("verify failed ({verify_error}); rollback disabled"))
                    }
                };
                self.storage.save_status(status)?;

                let history = self.history_entry(
                    request,
                    HistoryAction::Rotate,
                    history_status,
                    execute_elapsed,
                    result.old_version.clone(),
                    result.new_version.clone(),
                    result.steps.clone(),
                    Some(message.clone()),
                );
                self.storage.append_history(&history)?;
                Ok((None, history, ("rotate", false, message)))
            }
        }
    }

    async fn rollback_with_retries(
        &self,
        service: &dyn Service,
        result: &RotationResult,
        policy: &dsops_domain::RollbackPolicy,
    ) -> Result<(), String> {
        let mut last_error = String::new();
        for attempt in 0..policy.max_retries.max(1) {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempt.min(4)))).await;
            }
            match tokio::time::timeout(Duration::from_secs(policy.timeout_secs), service.rollback(result)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = "rollback timed out".to_string(),
            }
        }
        Err(last_error)
    }

    fn check_constraints(&self, request: &RotationRequest, status: &RotationStatus) -> Result<(), RotationError> {
        if let (Some(min_interval), Some(last_rotation)) = (request.constraints.min_rotation_interval, status.last_rotation) {
            let elapsed = chrono::Utc::now() - last_rotation;
            if elapsed < min_interval {
                let remaining = (min_interval - elapsed).num_seconds().max(0);
                return Err(RotationError::Conflict {
                    service: request.service_name.clone(),
                    reason: format!("minimum rotation interval not elapsed ({remaining}s remaining)"),
                });
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn history_entry(
        &self,
        request: &RotationRequest,
        action: HistoryAction,
        status: HistoryStatus,
        duration: Duration,
        old_version: Option<String>,
        new_version: Option<String>,
        steps: Vec<String>,
        error: Option<String>,
    ) -> HistoryEntry {
        HistoryEntry {
            id: format!("{}-{}", request.service_name, chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()),
            timestamp: chrono::Utc::now(),
            service_name: request.service_name.clone(),
            credential_type: request.effective_secret_type(),
            action,
            status,
            duration_ms: duration.as_millis() as u64,
            error,
            user: None,
            old_version,
            new_version,
            strategy: request.strategy.clone(),
            steps,
            metadata: request.metadata.clone(),
        }
    }

    pub fn storage(&self) -> &RotationStorage {
        &self.storage
    }
}
