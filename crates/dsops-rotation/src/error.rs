use thiserror::Error;

/// *RotationError* (§7): the engine's own failure modes, layered above
/// whatever a [`dsops_registry::ServiceError`] the strategy itself raised.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("rotation conflict for service '{service}': {reason}")]
    Conflict { service: String, reason: String },

    #[error("strategy failure: {0}")]
    Strategy(#[from] dsops_registry::ServiceError),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("rollback failed: {0}")]
    Rollback(String),

    #[error("registry error: {0}")]
    Registry(#[from] dsops_registry::RegistryError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// *StorageError* (§7): the file-backed status/history layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error at {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("malformed status/history file at {path}: {source}")]
    Deserialize { path: String, source: serde_json::Error },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// *PolicyError* (§7): output path rejection, rotation blocked by policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("rotation blocked by policy: {0}")]
    Blocked(String),
}
