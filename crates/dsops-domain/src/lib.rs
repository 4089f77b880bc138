pub mod error;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::DomainError;
pub use types::{
    BackoffStrategy, Capabilities, ConfigDocument, Environment, HistoryAction, HistoryEntry,
    HistoryStatus, NotificationPolicy, OutputPathPolicy, Policies, ProviderConfig, Reference,
    ResolveErrorInfo, ResolveErrorKind, ResolvedVariable, RetryPolicy, RollbackPolicy,
    RotationState, RotationStatus, SecretRef, SecretType, Variable,
};
