use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

// ── Configuration document ────────────────────────────────────────────────────

/// The top-level parsed and validated configuration document (version 0).
///
/// Produced by `dsops_config::load`; immutable for the lifetime of a single
/// operation (§3 Lifecycles).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub version: u32,
    #[serde(default)]
    pub secret_stores: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub services: HashMap<String, ProviderConfig>,
    /// Legacy `providers:` block, retained for backward compatibility.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub envs: HashMap<String, Environment>,
    #[serde(default)]
    pub policies: Option<Policies>,
}

impl ConfigDocument {
    /// The merged flat namespace over `secretStores ∪ services ∪ providers`.
    ///
    /// Callers that only need names/configs (not live instances) use this;
    /// `dsops-registry` is the only place that turns entries into running
    /// providers and services.
    pub fn list_all_providers(&self) -> HashMap<String, ProviderConfig> {
        let mut out = HashMap::with_capacity(
            self.secret_stores.len() + self.services.len() + self.providers.len(),
        );
        for (name, cfg) in &self.secret_stores {
            out.insert(name.clone(), cfg.clone());
        }
        for (name, cfg) in &self.services {
            out.insert(name.clone(), cfg.clone());
        }
        for (name, cfg) in &self.providers {
            out.insert(name.clone(), cfg.clone());
        }
        out
    }
}

/// Configuration for one secret store or service entry (`{type, timeoutMs, config}`).
/// Shared shape across `secretStores`, `services`, and legacy `providers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, rename = "timeoutMs")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 30_000;

impl ProviderConfig {
    /// `timeoutMs` if positive, else the default (30,000 ms). Zero and
    /// negative values (represented here as absent or non-positive) both
    /// fall back to the default (§8 boundary behaviors).
    pub fn effective_timeout_ms(&self) -> u64 {
        match self.timeout_ms {
            Some(ms) if ms > 0 => ms,
            _ => DEFAULT_PROVIDER_TIMEOUT_MS,
        }
    }
}

/// A named environment: a mapping of variable name to [`Variable`].
pub type Environment = HashMap<String, Variable>;

// ── Variable & Reference ──────────────────────────────────────────────────────

/// A single entry in an environment. Discriminated by which of `literal` or
/// `from` is set — never both, never neither (enforced at load time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub literal: Option<String>,
    pub from: Option<Reference>,
    #[serde(default)]
    pub optional: bool,
    pub transform: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Variable {
    pub fn validate(&self, name: &str) -> Result<(), DomainError> {
        match (&self.literal, &self.from) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(DomainError::AmbiguousVariable(name.to_string())),
        }
    }
}

/// A sum type over the three mutually exclusive reference variants (§3).
///
/// `Store` and `Service` are constructed from URIs; `Legacy` is the pre-URI
/// `{provider, key, version}` form retained for backward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Store {
        store: String,
        path: String,
        field: Option<String>,
        version: Option<String>,
    },
    Service {
        service_type: String,
        id: String,
        #[serde(default)]
        params: HashMap<String, String>,
    },
    Legacy {
        provider: String,
        key: String,
        version: Option<String>,
    },
}

impl Reference {
    pub fn is_store_reference(&self) -> bool {
        matches!(self, Reference::Store { .. })
    }

    pub fn is_service_reference(&self) -> bool {
        matches!(self, Reference::Service { .. })
    }

    pub fn is_legacy_format(&self) -> bool {
        matches!(self, Reference::Legacy { .. })
    }

    /// The provider/store/service name this reference points at, regardless
    /// of variant.
    pub fn effective_provider(&self) -> &str {
        match self {
            Reference::Store { store, .. } => store,
            Reference::Service { service_type, .. } => service_type,
            Reference::Legacy { provider, .. } => provider,
        }
    }

    /// `{store, path, field, version}` for store/legacy variants; an error
    /// for service references, which have no `SecretRef` form.
    pub fn to_secret_ref(&self) -> Result<SecretRef, DomainError> {
        match self {
            Reference::Store { store, path, field, version } => Ok(SecretRef {
                store: store.clone(),
                path: path.clone(),
                field: field.clone(),
                version: version.clone(),
            }),
            Reference::Legacy { provider, key, version } => Ok(SecretRef {
                store: provider.clone(),
                path: key.clone(),
                field: None,
                version: version.clone(),
            }),
            Reference::Service { .. } => Err(DomainError::InvalidReference(
                "service references have no SecretRef form".to_string(),
            )),
        }
    }

    /// Render this reference in `store://` URI form. Total for store and
    /// legacy variants; legacy-to-URI is the canonical conversion direction
    /// (the reverse is partial — see `parse_store_uri` in dsops-config).
    pub fn to_store_uri(&self) -> Result<String, DomainError> {
        let r = self.to_secret_ref()?;
        let mut uri = format!(
            "store://{}/{}",
            r.store,
            percent_encode_path(&r.path)
        );
        if let Some(field) = &r.field {
            uri.push('#');
            uri.push_str(field);
        }
        if let Some(version) = &r.version {
            uri.push_str("?version=");
            uri.push_str(version);
        }
        Ok(uri)
    }
}

fn percent_encode_path(path: &str) -> String {
    // Path segments are percent-decoded on parse; re-encoding only needs to
    // protect the `#`/`?` delimiters this URI form reserves.
    path.replace('#', "%23").replace('?', "%3F")
}

/// Flat view of a reference to a specific object within a secret store,
/// independent of which `Reference` variant produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    pub store: String,
    pub path: String,
    pub field: Option<String>,
    pub version: Option<String>,
}

// ── Provider capabilities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub supports_versioning: bool,
    pub supports_metadata: bool,
    pub requires_auth: bool,
    pub auth_methods: Vec<String>,
}

// ── Resolved variable ──────────────────────────────────────────────────────────

/// A lightweight, cloneable description of an error attached to one resolved
/// variable. Mirrors the taxonomy in §7 without pulling in every crate's
/// concrete error type (which would create a dependency cycle back into
/// `dsops-domain`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveErrorInfo {
    pub kind: ResolveErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveErrorKind {
    NotFound,
    Auth,
    Timeout,
    Transport,
    InvalidReference,
    InvalidTransform,
    Cancelled,
    UnknownProvider,
}

/// The outcome of resolving one variable (§3 invariants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedVariable {
    pub name: String,
    pub source: String,
    pub transform: Option<String>,
    pub optional: bool,
    pub value: String,
    pub error: Option<ResolveErrorInfo>,
    pub metadata: HashMap<String, String>,
}

// ── Rotation status & history ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationState {
    NeverRotated,
    Active,
    Rotating,
    Failed,
    NeedsRotation,
}

impl std::fmt::Display for RotationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RotationState::NeverRotated => "never_rotated",
            RotationState::Active => "active",
            RotationState::Rotating => "rotating",
            RotationState::Failed => "failed",
            RotationState::NeedsRotation => "needs_rotation",
        };
        write!(f, "{}", s)
    }
}

/// Per-service persisted rotation status (§3). Never carries a secret value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationStatus {
    pub service_name: String,
    pub status: RotationState,
    pub last_rotation: Option<chrono::DateTime<chrono::Utc>>,
    pub next_rotation: Option<chrono::DateTime<chrono::Utc>>,
    pub last_result: Option<String>,
    pub last_error: Option<String>,
    pub rotation_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub rotation_interval: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RotationStatus {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            status: RotationState::NeverRotated,
            last_rotation: None,
            next_rotation: None,
            last_result: None,
            last_error: None,
            rotation_count: 0,
            success_count: 0,
            failure_count: 0,
            rotation_interval: None,
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Rotate,
    Rollback,
    Verify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Success,
    Failed,
    Partial,
    RolledBack,
}

/// Inferred or declared category of a rotated secret. Used by strategies to
/// pick defaults (e.g. generated-value length/charset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    Password,
    ApiKey,
    Certificate,
    Generic,
}

impl SecretType {
    /// Infer from a strategy name first, then a variable key, per §4.E.
    pub fn infer(strategy: &str, key: &str) -> Self {
        let strategy = strategy.to_lowercase();
        if strategy.contains("certificate") {
            return SecretType::Certificate;
        }
        let key = key.to_lowercase();
        if key.contains("password") {
            SecretType::Password
        } else if key.contains("api_key") || key.contains("apikey") || key.contains("token") {
            SecretType::ApiKey
        } else if key.contains("cert") || key.contains("certificate") {
            SecretType::Certificate
        } else {
            SecretType::Generic
        }
    }
}

/// A persisted, append-only record of one rotation or rollback event (§3).
/// Never carries a secret value — only opaque version labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub service_name: String,
    pub credential_type: SecretType,
    pub action: HistoryAction,
    pub status: HistoryStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub user: Option<String>,
    pub old_version: Option<String>,
    pub new_version: Option<String>,
    pub strategy: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

// ── Policies ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policies {
    pub notification: Option<NotificationPolicy>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<OutputPathPolicy>,
    pub rollback: Option<RollbackPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPolicy {
    #[serde(default)]
    pub slack_webhook: Option<String>,
    #[serde(default)]
    pub email_to: Vec<String>,
    #[serde(default)]
    pub pagerduty_routing_key: Option<String>,
    #[serde(default)]
    pub webhooks: Vec<String>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    pub timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: BackoffStrategy::Exponential, timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Linear,
    Exponential,
}

/// Allow-list policy gating where rendered output files may be written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputPathPolicy {
    #[serde(default)]
    pub allowed_dirs: Vec<String>,
    #[serde(default)]
    pub denied_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackPolicy {
    #[serde(default = "default_true")]
    pub auto_rollback_on_verify_failure: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_rollback_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    2
}

fn default_rollback_timeout() -> u64 {
    30
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        Self {
            auto_rollback_on_verify_failure: true,
            max_retries: default_max_retries(),
            timeout_secs: default_rollback_timeout(),
        }
    }
}
