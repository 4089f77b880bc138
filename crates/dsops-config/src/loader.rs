use std::collections::HashMap;
use std::path::Path;

use dsops_domain::{
    BackoffStrategy, ConfigDocument, Environment, NotificationPolicy, OutputPathPolicy,
    Policies, ProviderConfig, RetryPolicy, RollbackPolicy, Variable,
};
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::{
    RawConfigDocument, RawNotificationPolicy, RawOutputPathPolicy, RawPolicies, RawProviderConfig,
    RawReference, RawRollbackPolicy, RawVariable,
};
use crate::uri::parse_reference_uri;

const SUPPORTED_VERSION: u32 = 0;

/// A loaded, validated configuration document with typed lookup methods.
///
/// Construction happens once per invocation (§3 Lifecycles): `Config::load`
/// reads and validates the whole file, collecting every issue it can before
/// returning, per §4.A's "single pass" contract.
#[derive(Debug, Clone)]
pub struct Config {
    doc: ConfigDocument,
}

impl Config {
    /// Read and parse `path`, returning a distinct error for a missing file,
    /// malformed YAML, or an unsupported version (§4.A).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound { path: path.display().to_string() });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str(&content, path)
    }

    /// Parse from an in-memory YAML document. Exposed separately from
    /// [`Config::load`] so tests can exercise conversion without touching the
    /// filesystem.
    pub fn from_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfigDocument =
            serde_yaml::from_str(content).map_err(|e| ConfigError::YamlParse {
                path: path.display().to_string(),
                source: e,
            })?;

        if raw.version != SUPPORTED_VERSION {
            return Err(ConfigError::UnsupportedVersion { found: raw.version });
        }

        let doc = convert(raw)?;
        debug!(
            envs = doc.envs.len(),
            secret_stores = doc.secret_stores.len(),
            services = doc.services.len(),
            providers = doc.providers.len(),
            "loaded config document"
        );
        Ok(Self { doc })
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.doc
    }

    pub fn get_environment(&self, name: &str) -> Result<&Environment, ConfigError> {
        self.doc.envs.get(name).ok_or_else(|| ConfigError::NotFoundNamed {
            kind: "environment",
            name: name.to_string(),
            suggestion: ConfigError::suggest(self.doc.envs.keys().cloned().collect()),
        })
    }

    /// Look up a name in the merged `secretStores ∪ services ∪ providers`
    /// namespace, regardless of which block declared it.
    pub fn get_provider(&self, name: &str) -> Result<ProviderConfig, ConfigError> {
        self.doc
            .secret_stores
            .get(name)
            .or_else(|| self.doc.services.get(name))
            .or_else(|| self.doc.providers.get(name))
            .cloned()
            .ok_or_else(|| ConfigError::NotFoundNamed {
                kind: "provider",
                name: name.to_string(),
                suggestion: ConfigError::suggest(self.doc.list_all_providers().into_keys().collect()),
            })
    }

    pub fn get_secret_store(&self, name: &str) -> Result<&ProviderConfig, ConfigError> {
        self.doc.secret_stores.get(name).ok_or_else(|| ConfigError::NotFoundNamed {
            kind: "secret store",
            name: name.to_string(),
            suggestion: ConfigError::suggest(self.doc.secret_stores.keys().cloned().collect()),
        })
    }

    pub fn get_service(&self, name: &str) -> Result<&ProviderConfig, ConfigError> {
        self.doc.services.get(name).ok_or_else(|| ConfigError::NotFoundNamed {
            kind: "service",
            name: name.to_string(),
            suggestion: ConfigError::suggest(self.doc.services.keys().cloned().collect()),
        })
    }

    pub fn list_all_providers(&self) -> HashMap<String, ProviderConfig> {
        self.doc.list_all_providers()
    }

    pub fn policies(&self) -> Option<&Policies> {
        self.doc.policies.as_ref()
    }
}

/// The single seam (§4.A "Raw-to-typed conversion") where every validation
/// issue across the document is collected into one combined error rather than
/// failing on the first bad field.
fn convert(raw: RawConfigDocument) -> Result<ConfigDocument, ConfigError> {
    let mut issues = Vec::new();

    let secret_stores = convert_provider_map(raw.secret_stores);
    let services = convert_provider_map(raw.services);
    let providers = convert_provider_map(raw.providers);

    check_unique_namespace(&secret_stores, &services, &providers, &mut issues);

    let mut envs = HashMap::with_capacity(raw.envs.len());
    for (env_name, vars) in raw.envs {
        let mut converted: Environment = HashMap::with_capacity(vars.len());
        for (var_name, raw_var) in vars {
            match convert_variable(&var_name, raw_var) {
                Ok(v) => {
                    converted.insert(var_name, v);
                }
                Err(e) => issues.push(format!("envs.{env_name}.{var_name}: {e}")),
            }
        }
        envs.insert(env_name, converted);
    }

    if !issues.is_empty() {
        return Err(ConfigError::Multiple(issues));
    }

    let policies = raw.policies.map(convert_policies);

    Ok(ConfigDocument { version: raw.version, secret_stores, services, providers, envs, policies })
}

fn convert_provider_map(raw: HashMap<String, RawProviderConfig>) -> HashMap<String, ProviderConfig> {
    raw.into_iter()
        .map(|(name, cfg)| {
            (
                name,
                ProviderConfig { type_name: cfg.type_name, timeout_ms: cfg.timeout_ms, config: cfg.config },
            )
        })
        .collect()
}

fn check_unique_namespace(
    secret_stores: &HashMap<String, ProviderConfig>,
    services: &HashMap<String, ProviderConfig>,
    providers: &HashMap<String, ProviderConfig>,
    issues: &mut Vec<String>,
) {
    let mut seen = std::collections::HashSet::new();
    for name in secret_stores.keys().chain(services.keys()).chain(providers.keys()) {
        if !seen.insert(name) {
            issues.push(format!("duplicate name '{name}' across secretStores/services/providers"));
        }
    }
}

fn convert_variable(name: &str, raw: RawVariable) -> Result<Variable, ConfigError> {
    let from = raw.from.map(convert_reference).transpose()?;
    let variable = Variable { literal: raw.literal, from, optional: raw.optional, transform: raw.transform, metadata: raw.metadata };
    variable.validate(name)?;
    Ok(variable)
}

fn convert_reference(raw: RawReference) -> Result<dsops_domain::Reference, ConfigError> {
    match raw {
        RawReference::Uri(s) => parse_reference_uri(&s),
        RawReference::Legacy { provider, key, version } => {
            Ok(dsops_domain::Reference::Legacy { provider, key, version })
        }
    }
}

fn convert_policies(raw: RawPolicies) -> Policies {
    Policies {
        notification: raw.notification.map(convert_notification_policy),
        output_path: raw.output_path.map(convert_output_path_policy),
        rollback: raw.rollback.map(convert_rollback_policy),
    }
}

fn convert_notification_policy(raw: RawNotificationPolicy) -> NotificationPolicy {
    NotificationPolicy {
        slack_webhook: raw.slack_webhook,
        email_to: raw.email_to,
        pagerduty_routing_key: raw.pagerduty_routing_key,
        webhooks: raw.webhooks,
        retry: raw.retry.map(convert_retry_policy).unwrap_or_default(),
    }
}

fn convert_retry_policy(raw: crate::raw::RawRetryPolicy) -> RetryPolicy {
    let default = RetryPolicy::default();
    RetryPolicy {
        max_attempts: raw.max_attempts.unwrap_or(default.max_attempts),
        backoff: match raw.backoff.as_deref() {
            Some("linear") => BackoffStrategy::Linear,
            _ => BackoffStrategy::Exponential,
        },
        timeout_secs: raw.timeout_secs.unwrap_or(default.timeout_secs),
    }
}

fn convert_output_path_policy(raw: RawOutputPathPolicy) -> OutputPathPolicy {
    OutputPathPolicy { allowed_dirs: raw.allowed_dirs, denied_dirs: raw.denied_dirs }
}

fn convert_rollback_policy(raw: RawRollbackPolicy) -> RollbackPolicy {
    let default = RollbackPolicy::default();
    RollbackPolicy {
        auto_rollback_on_verify_failure: raw
            .auto_rollback_on_verify_failure
            .unwrap_or(default.auto_rollback_on_verify_failure),
        max_retries: raw.max_retries.unwrap_or(default.max_retries),
        timeout_secs: raw.timeout_secs.unwrap_or(default.timeout_secs),
    }
}
