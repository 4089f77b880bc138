use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw YAML shape of the whole configuration document. Mirrors the document
/// exactly as it appears on disk (including the legacy `providers:` block and
/// both reference forms for `from`); `loader::convert` is the single seam
/// where this is turned into typed `dsops_domain` structs.
#[derive(Debug, Deserialize, Serialize)]
pub struct RawConfigDocument {
    pub version: u32,
    #[serde(default, rename = "secretStores")]
    pub secret_stores: HashMap<String, RawProviderConfig>,
    #[serde(default)]
    pub services: HashMap<String, RawProviderConfig>,
    #[serde(default)]
    pub providers: HashMap<String, RawProviderConfig>,
    #[serde(default)]
    pub envs: HashMap<String, HashMap<String, RawVariable>>,
    #[serde(default)]
    pub policies: Option<RawPolicies>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawProviderConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, rename = "timeoutMs")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawVariable {
    pub literal: Option<String>,
    pub from: Option<RawReference>,
    #[serde(default)]
    pub optional: bool,
    pub transform: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// `from:` is either a bare URI string (`store://...` / `svc://...`) or the
/// legacy object form `{provider, key, version}`. `loader::parse_reference`
/// decides which URI variant a string is by scheme.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawReference {
    Uri(String),
    Legacy { provider: String, key: String, version: Option<String> },
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawPolicies {
    pub notification: Option<RawNotificationPolicy>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<RawOutputPathPolicy>,
    pub rollback: Option<RawRollbackPolicy>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawNotificationPolicy {
    #[serde(default)]
    pub slack_webhook: Option<String>,
    #[serde(default)]
    pub email_to: Vec<String>,
    #[serde(default)]
    pub pagerduty_routing_key: Option<String>,
    #[serde(default)]
    pub webhooks: Vec<String>,
    #[serde(default)]
    pub retry: Option<RawRetryPolicy>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawRetryPolicy {
    pub max_attempts: Option<u32>,
    pub backoff: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawOutputPathPolicy {
    #[serde(default)]
    pub allowed_dirs: Vec<String>,
    #[serde(default)]
    pub denied_dirs: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawRollbackPolicy {
    pub auto_rollback_on_verify_failure: Option<bool>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
}
