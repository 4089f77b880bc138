use thiserror::Error;

/// *ProviderError* (§7): attached to the one variable being resolved, never
/// aborts the whole resolution. The `Timeout` variant must be produced
/// whenever a provider call is cut short by its deadline — never folded into
/// `NotFound`.
#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl ProviderError {
    pub fn kind(&self) -> dsops_domain::ResolveErrorKind {
        use dsops_domain::ResolveErrorKind as K;
        match self {
            ProviderError::NotFound(_) => K::NotFound,
            ProviderError::Auth(_) => K::Auth,
            ProviderError::Timeout(_) => K::Timeout,
            ProviderError::Transport(_) => K::Transport,
            ProviderError::InvalidReference(_) => K::InvalidReference,
        }
    }
}

/// Errors a [`crate::service::Service`] implementation can raise. These are
/// the engine-facing subset of *RotationError* (§7); the rotation engine adds
/// its own `Conflict` variant, which is a property of engine-held state, not
/// of any one service call.
#[derive(Debug, Error, Clone)]
pub enum ServiceError {
    #[error("plan failed: {0}")]
    Plan(String),

    #[error("execute failed: {0}")]
    Execute(String),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("rollback failed: {0}")]
    Rollback(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Errors raised while constructing providers/services from configuration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("config error: {0}")]
    Config(#[from] dsops_config::ConfigError),

    #[error("provider '{name}' has unknown type '{type_name}'")]
    UnknownProviderType { name: String, type_name: String },

    #[error("service '{name}' has unknown type '{type_name}'")]
    UnknownServiceType { name: String, type_name: String },

    #[error("referencing service '{0}' as a secret-store provider is not allowed")]
    ServiceNotAProvider(String),

    #[error("provider not registered: {0}")]
    ProviderNotRegistered(String),

    #[error("service not registered: {0}")]
    ServiceNotRegistered(String),

    #[error("data-driven service repository error: {0}")]
    DataDriven(String),

    #[error("invalid provider config for '{name}': {message}")]
    InvalidProviderConfig { name: String, message: String },
}
