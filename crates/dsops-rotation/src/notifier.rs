use dsops_domain::{BackoffStrategy, NotificationPolicy, RetryPolicy};
use serde::Serialize;
use tracing::warn;

/// Outcome of a single delivery attempt to one channel (§4.E "Notifications").
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub channel: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub success: bool,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub service_name: String,
    pub action: &'static str,
    pub success: bool,
    pub message: String,
}

/// Dispatches rotation outcomes to Slack/email/PagerDuty/generic webhooks
/// configured on [`NotificationPolicy`]. Delivery is best-effort: a failed
/// notification never fails the rotation itself (§4.E step 7).
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }

    /// Send `event` to every channel configured on `policy`, retrying each
    /// per its [`RetryPolicy`]. Individual channel failures are logged, not
    /// propagated — the caller always gets back the full set of attempts.
    pub async fn notify(&self, policy: &NotificationPolicy, event: &NotificationEvent) -> Vec<DeliveryResult> {
        let mut results = Vec::new();

        if let Some(webhook) = &policy.slack_webhook {
            results.push(self.deliver_with_retry("slack", webhook, event, &policy.retry).await);
        }
        for webhook in &policy.webhooks {
            results.push(self.deliver_with_retry("webhook", webhook, event, &policy.retry).await);
        }
        if let Some(routing_key) = &policy.pagerduty_routing_key {
            if !event.success {
                results.push(self.deliver_pagerduty(routing_key, event, &policy.retry).await);
            }
        }
        if !policy.email_to.is_empty() {
            // No outbound SMTP dependency is grounded anywhere in the corpus;
            // email delivery is recorded as a no-op channel rather than faked.
            for to in &policy.email_to {
                warn!(to, "email notification channel is configured but not implemented");
                results.push(DeliveryResult {
                    channel: format!("email:{to}"),
                    timestamp: chrono::Utc::now(),
                    success: false,
                    details: "email delivery not implemented".to_string(),
                });
            }
        }

        results
    }

    async fn deliver_with_retry(
        &self,
        channel: &str,
        url: &str,
        event: &NotificationEvent,
        retry: &RetryPolicy,
    ) -> DeliveryResult {
        let body = serde_json::json!({
            "service": event.service_name,
            "action": event.action,
            "success": event.success,
            "message": event.message,
        });

        let mut last_error = String::new();
        for attempt in 0..retry.max_attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(retry.backoff, attempt)).await;
            }
            let request = self
                .client
                .post(url)
                .timeout(std::time::Duration::from_secs(retry.timeout_secs))
                .json(&body);
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    return DeliveryResult {
                        channel: channel.to_string(),
                        timestamp: chrono::Utc::now(),
                        success: true,
                        details: format!("delivered on attempt {}", attempt + 1),
                    };
                }
                Ok(resp) => last_error = format!("status {}", resp.status()),
                Err(e) => last_error = e.to_string(),
            }
        }

        warn!(channel, url, error = %last_error, "notification delivery exhausted retries");
        DeliveryResult {
            channel: channel.to_string(),
            timestamp: chrono::Utc::now(),
            success: false,
            details: last_error,
        }
    }

    async fn deliver_pagerduty(&self, routing_key: &str, event: &NotificationEvent, retry: &RetryPolicy) -> DeliveryResult {
        let body = serde_json::json!({
            "routing_key": routing_key,
            "event_action": "trigger",
            "payload": {
                "summary": event.message,
                "source": event.service_name,
                "severity": "error",
            }
        });

        let mut last_error = String::new();
        for attempt in 0..retry.max_attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(retry.backoff, attempt)).await;
            }
            let request = self
                .client
                .post("https://events.pagerduty.com/v2/enqueue")
                .timeout(std::time::Duration::from_secs(retry.timeout_secs))
                .json(&body);
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    return DeliveryResult {
                        channel: "pagerduty".to_string(),
                        timestamp: chrono::Utc::now(),
                        success: true,
                        details: format!("delivered on attempt {}", attempt + 1),
                    };
                }
                Ok(resp) => last_error = format!("status {}", resp.status()),
                Err(e) => last_error = e.to_string(),
            }
        }

        warn!(error = %last_error, "pagerduty delivery exhausted retries");
        DeliveryResult {
            channel: "pagerduty".to_string(),
            timestamp: chrono::Utc::now(),
            success: false,
            details: last_error,
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

fn backoff_delay(strategy: BackoffStrategy, attempt: u32) -> std::time::Duration {
    match strategy {
        BackoffStrategy::Linear => std::time::Duration::from_millis(500 * attempt as u64),
        BackoffStrategy::Exponential => std::time::Duration::from_millis(250 * 2u64.pow(attempt.min(8))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_grows() {
        let first = backoff_delay(BackoffStrategy::Exponential, 1);
        let second = backoff_delay(BackoffStrategy::Exponential, 2);
        assert!(second > first);
    }

    #[test]
    fn linear_backoff_is_proportional() {
        assert_eq!(backoff_delay(BackoffStrategy::Linear, 2), std::time::Duration::from_millis(1000));
    }
}
