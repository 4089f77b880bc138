use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dsops_config::Config;
use dsops_domain::{Reference, ResolveErrorInfo, ResolveErrorKind, ResolvedVariable, Variable};
use dsops_registry::{ProviderError, Registry};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::error::ResolverError;
use crate::transform;

/// Upper bound on concurrently in-flight provider calls within one
/// resolution (§4.C "bounded fan-out").
const MAX_CONCURRENT_RESOLUTIONS: usize = 16;

/// Resolve every variable in `env_name` concurrently (§4.C `Resolve`).
#[instrument(skip(config, registry))]
pub async fn resolve(
    config: &Config,
    registry: Arc<Registry>,
    env_name: &str,
) -> Result<HashMap<String, ResolvedVariable>, ResolverError> {
    let env = config.get_environment(env_name)?;
    resolve_subset(config, registry, env.clone(), None).await
}

/// Resolve only the named subset of `env_name` (§4.C
/// `ResolveVariablesConcurrently`, "get one variable").
pub async fn resolve_named(
    config: &Config,
    registry: Arc<Registry>,
    env_name: &str,
    names: &[String],
) -> Result<HashMap<String, ResolvedVariable>, ResolverError> {
    let env = config.get_environment(env_name)?;
    let subset: HashMap<String, Variable> = env
        .iter()
        .filter(|(name, _)| names.iter().any(|n| n == *name))
        .map(|(name, variable)| (name.clone(), variable.clone()))
        .collect();
    resolve_subset(config, registry, subset, None).await
}

async fn resolve_subset(
    config: &Config,
    registry: Arc<Registry>,
    variables: HashMap<String, Variable>,
    concurrency_limit: Option<usize>,
) -> Result<HashMap<String, ResolvedVariable>, ResolverError> {
    let semaphore = Arc::new(Semaphore::new(concurrency_limit.unwrap_or(MAX_CONCURRENT_RESOLUTIONS)));
    let mut tasks = tokio::task::JoinSet::new();

    for (name, variable) in variables {
        let registry = registry.clone();
        let semaphore = semaphore.clone();
        let timeout = variable
            .from
            .as_ref()
            .and_then(|r| config.get_provider(r.effective_provider()).ok())
            .map(|cfg| Duration::from_millis(cfg.effective_timeout_ms()))
            .unwrap_or(Duration::from_secs(30));
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            resolve_one(&registry, &name, &variable, timeout).await
        });
    }

    let mut resolved = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => {
                resolved.insert(result.name.clone(), result);
            }
            Err(join_error) => {
                warn!(error = %join_error, "resolution task panicked or was cancelled");
            }
        }
    }

    Ok(resolved)
}

async fn resolve_one(registry: &Registry, name: &str, variable: &Variable, timeout: Duration) -> ResolvedVariable {
    if let Some(literal) = &variable.literal {
        return match transform::apply(variable.transform.as_deref(), literal) {
            Ok(value) => ResolvedVariable {
                name: name.to_string(),
                source: "literal".to_string(),
                transform: variable.transform.clone(),
                optional: variable.optional,
                value,
                error: None,
                metadata: HashMap::new(),
            },
            Err(e) => error_entry(name, variable, ResolveErrorKind::InvalidTransform, e.to_string()),
        };
    }

    let Some(reference) = &variable.from else {
        return error_entry(name, variable, ResolveErrorKind::InvalidReference, "variable has neither literal nor from".to_string());
    };

    let provider = match registry.provider_for(reference) {
        Ok(provider) => provider,
        Err(e) => return error_entry(name, variable, ResolveErrorKind::UnknownProvider, e.to_string()),
    };

    let call = tokio::time::timeout(timeout, provider.get(reference, timeout)).await;

    let (raw, metadata) = match call {
        Ok(Ok(pair)) => pair,
        Ok(Err(ProviderError::NotFound(_))) if variable.optional => {
            debug!(variable = name, "optional variable not found, resolving to empty");
            return ResolvedVariable {
                name: name.to_string(),
                source: reference.effective_provider().to_string(),
                transform: variable.transform.clone(),
                optional: true,
                value: String::new(),
                error: None,
                metadata: HashMap::new(),
            };
        }
        Ok(Err(e)) => return error_entry(name, variable, e.kind(), e.to_string()),
        Err(_) => return error_entry(name, variable, ResolveErrorKind::Timeout, format!("timed out after {timeout:?}")),
    };

    match transform::apply(variable.transform.as_deref(), &raw) {
        Ok(value) => ResolvedVariable {
            name: name.to_string(),
            source: reference.effective_provider().to_string(),
            transform: variable.transform.clone(),
            optional: variable.optional,
            value,
            error: None,
            metadata,
        },
        Err(e) => error_entry(name, variable, ResolveErrorKind::InvalidTransform, e.to_string()),
    }
}

fn error_entry(name: &str, variable: &Variable, kind: ResolveErrorKind, message: String) -> ResolvedVariable {
    ResolvedVariable {
        name: name.to_string(),
        source: variable.from.as_ref().map(Reference::effective_provider).unwrap_or("literal").to_string(),
        transform: variable.transform.clone(),
        optional: variable.optional,
        value: String::new(),
        error: Some(ResolveErrorInfo { kind, message }),
        metadata: HashMap::new(),
    }
}

/// Health-check a single registered provider with its configured deadline
/// (§4.C `ValidateProvider`).
pub async fn validate_provider(registry: &Registry, name: &str, timeout: Duration) -> Result<(), ResolverError> {
    let provider = registry.get_provider(name)?;
    tokio::time::timeout(timeout, provider.validate(timeout))
        .await
        .map_err(|_| dsops_registry::RegistryError::ProviderNotRegistered(format!("{name} (timed out)")))?
        .map_err(|e| dsops_registry::RegistryError::InvalidProviderConfig { name: name.to_string(), message: e.to_string() })?;
    Ok(())
}
