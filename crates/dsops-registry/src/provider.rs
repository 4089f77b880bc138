use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::{Capabilities, Reference};

use crate::error::ProviderError;

/// The runtime object for a registered secret store (§3 "Provider").
///
/// Implementations must be safe for concurrent calls from multiple resolver
/// tasks and must respect the caller-supplied `timeout` rather than blocking
/// indefinitely.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// A health check that does not retrieve any secret value.
    async fn validate(&self, timeout: Duration) -> Result<(), ProviderError>;

    /// Retrieve one secret. Returns the raw (pre-transform) value plus any
    /// provider-reported metadata.
    async fn get(
        &self,
        reference: &Reference,
        timeout: Duration,
    ) -> Result<(String, HashMap<String, String>), ProviderError>;
}
