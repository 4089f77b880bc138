mod json_store;
mod keychain;
mod literal;
mod mock;
mod stub;
mod vault;
mod webhook;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dsops_domain::ProviderConfig;
use serde_json::Value;
use tracing::warn;

use crate::error::RegistryError;
use crate::provider::Provider;

pub use json_store::JsonFileProvider;
pub use keychain::KeychainProvider;
pub use literal::LiteralProvider;
pub use mock::MockProvider;
pub use stub::StubProvider;
pub use vault::VaultProvider;
pub use webhook::WebhookProvider;

/// Built-in types implemented as thin HTTP/OS-API clients behind stub
/// factories (§4.B): registered so capability/validation behavior is
/// exercised end-to-end, but `get` always fails until a real client is
/// wired in.
const STUBBED_TYPES: &[&str] = &[
    "bitwarden",
    "onepassword",
    "aws.secretsmanager",
    "aws.ssm",
    "aws.sts",
    "aws.sso",
    "gcp.secretmanager",
    "azure.keyvault",
    "azure.identity",
    "doppler",
    "pass",
    "infisical",
    "akeyless",
    "aws",
    "gcp",
    "azure",
];

fn string_field(config: &HashMap<String, Value>, key: &str) -> Option<String> {
    config.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn string_map_field(config: &HashMap<String, Value>, key: &str) -> HashMap<String, String> {
    config
        .get(key)
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn string_list_field(config: &HashMap<String, Value>, key: &str) -> Vec<String> {
    config
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Build a live [`Provider`] for a `secretStores`/`providers` config entry.
///
/// Returns `Ok(None)` for a genuinely unknown type name (logged as a
/// warning, not a hard error, per §4.B) so CLI diagnostics keep working.
pub fn build_secret_store(
    name: &str,
    cfg: &ProviderConfig,
) -> Result<Option<Arc<dyn Provider>>, RegistryError> {
    let provider: Arc<dyn Provider> = match cfg.type_name.as_str() {
        "literal" => Arc::new(LiteralProvider::new(name, string_map_field(&cfg.config, "values"))),
        "mock" => {
            let latency_ms = cfg.config.get("latency_ms").and_then(Value::as_u64).unwrap_or(0);
            Arc::new(MockProvider::new(
                name,
                string_map_field(&cfg.config, "values"),
                string_list_field(&cfg.config, "not_found"),
                Duration::from_millis(latency_ms),
                cfg.config.get("fail_auth").and_then(Value::as_bool).unwrap_or(false),
            ))
        }
        "json" => {
            let file = string_field(&cfg.config, "file").ok_or_else(|| {
                RegistryError::InvalidProviderConfig {
                    name: name.to_string(),
                    message: "json store requires config.file".to_string(),
                }
            })?;
            Arc::new(JsonFileProvider::new(name, file.into()))
        }
        "vault" => {
            let base_url = string_field(&cfg.config, "base_url")
                .unwrap_or_else(|| "https://127.0.0.1:8200".to_string());
            let token = string_field(&cfg.config, "token").or_else(|| std::env::var("VAULT_TOKEN").ok());
            let mount = string_field(&cfg.config, "mount").unwrap_or_else(|| "secret".to_string());
            Arc::new(VaultProvider::new(name, base_url, token, mount))
        }
        "keychain" => Arc::new(KeychainProvider::new(name, string_field(&cfg.config, "account_prefix"))),
        "webhook" => {
            let base_url = string_field(&cfg.config, "base_url").ok_or_else(|| {
                RegistryError::InvalidProviderConfig {
                    name: name.to_string(),
                    message: "webhook store requires config.base_url".to_string(),
                }
            })?;
            Arc::new(WebhookProvider::new(name, base_url, string_field(&cfg.config, "bearer_token")))
        }
        t if STUBBED_TYPES.contains(&t) => Arc::new(StubProvider::new(name, t)),
        unknown => {
            warn!(provider = name, type_name = unknown, "unknown secret-store type, skipping registration");
            return Ok(None);
        }
    };
    Ok(Some(provider))
}
