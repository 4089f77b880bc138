use thiserror::Error;

/// Errors the resolver can raise itself, as distinct from a per-variable
/// failure recorded in a [`ResolvedVariable`](dsops_domain::ResolvedVariable)
/// entry (§4.C "Failure semantics" — the resolver only returns `Err` when it
/// cannot start at all).
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("config error: {0}")]
    Config(#[from] dsops_config::ConfigError),

    #[error("registry error: {0}")]
    Registry(#[from] dsops_registry::RegistryError),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),
}

/// Errors from applying a transform expression to a resolved raw value
/// (§4.C "Transforms"). Folded into a [`dsops_domain::ResolveErrorInfo`] with
/// kind `InvalidTransform` at the call site, never propagated up to fail the
/// whole resolution.
#[derive(Debug, Error, Clone)]
pub enum TransformError {
    #[error("unknown transform op '{0}'")]
    UnknownOp(String),

    #[error("value is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("JSON path '{0}' did not resolve to a value")]
    PathNotFound(String),
}
