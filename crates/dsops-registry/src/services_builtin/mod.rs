mod generic;
mod random;
mod stub;
mod two_key;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dsops_domain::ProviderConfig;
use serde_json::Value;
use tracing::warn;

pub use generic::GenericService;
pub use random::RandomService;
pub use stub::StubService;
pub use two_key::TwoKeyService;

use crate::error::RegistryError;
use crate::service::Service;

const STUBBED_STRATEGIES: &[&str] =
    &["postgres", "mysql", "mongodb", "stripe", "github", "certificate"];

fn string_field(config: &HashMap<String, Value>, key: &str) -> Option<String> {
    config.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Build a live [`Service`] for a `services` config entry, dispatching on
/// `cfg.type` (the rotation strategy name).
///
/// Returns `Ok(None)` for an unknown strategy name (logged as a warning),
/// mirroring [`crate::secret_stores::build_secret_store`]'s handling of
/// unknown provider types.
pub fn build_service(name: &str, cfg: &ProviderConfig) -> Result<Option<Arc<dyn Service>>, RegistryError> {
    let service: Arc<dyn Service> = match cfg.type_name.as_str() {
        "random" => {
            let length = cfg.config.get("length").and_then(Value::as_u64).unwrap_or(32) as usize;
            Arc::new(RandomService::new(name, length))
        }
        "generic" => {
            let base_url = string_field(&cfg.config, "base_url").ok_or_else(|| {
                RegistryError::InvalidProviderConfig {
                    name: name.to_string(),
                    message: "generic service requires config.base_url".to_string(),
                }
            })?;
            Arc::new(GenericService::new(name, base_url))
        }
        "two-key" => {
            let base_url = string_field(&cfg.config, "base_url").ok_or_else(|| {
                RegistryError::InvalidProviderConfig {
                    name: name.to_string(),
                    message: "two-key service requires config.base_url".to_string(),
                }
            })?;
            let grace_ms = cfg.config.get("grace_period_ms").and_then(Value::as_u64).unwrap_or(5_000);
            Arc::new(TwoKeyService::new(name, base_url, Duration::from_millis(grace_ms)))
        }
        t if STUBBED_STRATEGIES.contains(&t) => Arc::new(StubService::new(name, t)),
        unknown => {
            warn!(service = name, strategy = unknown, "unknown rotation strategy, skipping registration");
            return Ok(None);
        }
    };
    Ok(Some(service))
}
