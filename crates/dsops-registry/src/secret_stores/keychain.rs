use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::{Capabilities, Reference};
use tokio::process::Command;

use crate::error::ProviderError;
use crate::provider::Provider;

/// `type: keychain` — the OS-native credential store. Shells out to the
/// platform's native lookup tool, the same subprocess pattern this
/// workspace's IaC layer uses for the terraform/opentofu binaries, rather
/// than linking a platform-specific FFI crate.
///
/// `path` addresses the keychain item (`service/account`); `field` is unused
/// (keychain items carry a single password blob).
pub struct KeychainProvider {
    name: String,
    /// Keychain entries are looked up by `service` and `account`; `path` is
    /// split on the first `/` into those two components.
    account_prefix: Option<String>,
}

impl KeychainProvider {
    pub fn new(name: impl Into<String>, account_prefix: Option<String>) -> Self {
        Self { name: name.into(), account_prefix }
    }

    fn split_path<'a>(&self, path: &'a str) -> (String, &'a str) {
        match path.split_once('/') {
            Some((service, account)) => (service.to_string(), account),
            None => (self.account_prefix.clone().unwrap_or_else(|| "dsops".to_string()), path),
        }
    }
}

#[async_trait]
impl Provider for KeychainProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_versioning: false,
            supports_metadata: false,
            requires_auth: true,
            auth_methods: vec!["os_session".to_string()],
        }
    }

    async fn validate(&self, _timeout: Duration) -> Result<(), ProviderError> {
        if cfg!(target_os = "macos") {
            Ok(())
        } else {
            Err(ProviderError::Transport(
                "OS keychain access is only implemented for macOS in this build".to_string(),
            ))
        }
    }

    async fn get(
        &self,
        reference: &Reference,
        timeout: Duration,
    ) -> Result<(String, HashMap<String, String>), ProviderError> {
        let secret_ref = reference
            .to_secret_ref()
            .map_err(|e| ProviderError::InvalidReference(e.to_string()))?;
        let (service, account) = self.split_path(&secret_ref.path);

        if !cfg!(target_os = "macos") {
            return Err(ProviderError::Transport(
                "OS keychain access is only implemented for macOS in this build".to_string(),
            ));
        }

        let mut cmd = Command::new("security");
        cmd.args(["find-generic-password", "-w", "-s", &service, "-a", account]);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| ProviderError::Timeout(timeout))?
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("could not be found") {
                return Err(ProviderError::NotFound(secret_ref.path));
            }
            return Err(ProviderError::Transport(stderr.trim().to_string()));
        }

        let value = String::from_utf8_lossy(&output.stdout).trim_end_matches('\n').to_string();
        Ok((value, HashMap::new()))
    }
}
