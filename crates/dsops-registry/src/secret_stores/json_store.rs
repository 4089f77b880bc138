use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use dsops_domain::{Capabilities, Reference};
use serde_json::Value;

use crate::error::ProviderError;
use crate::provider::Provider;

/// `type: json` — reads a local JSON file keyed by a dot-separated path.
/// `path` in the reference addresses nested object fields
/// (`db.replica.password`); `field` further narrows into the resolved value
/// when it is itself a JSON object.
pub struct JsonFileProvider {
    name: String,
    file: PathBuf,
}

impl JsonFileProvider {
    pub fn new(name: impl Into<String>, file: PathBuf) -> Self {
        Self { name: name.into(), file }
    }

    fn load(&self) -> Result<Value, ProviderError> {
        let content = std::fs::read_to_string(&self.file)
            .map_err(|e| ProviderError::Transport(format!("reading {}: {e}", self.file.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| ProviderError::Transport(format!("parsing {}: {e}", self.file.display())))
    }
}

#[async_trait]
impl Provider for JsonFileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_versioning: false,
            supports_metadata: false,
            requires_auth: false,
            auth_methods: vec![],
        }
    }

    async fn validate(&self, _timeout: Duration) -> Result<(), ProviderError> {
        self.load().map(|_| ())
    }

    async fn get(
        &self,
        reference: &Reference,
        _timeout: Duration,
    ) -> Result<(String, HashMap<String, String>), ProviderError> {
        let secret_ref = reference
            .to_secret_ref()
            .map_err(|e| ProviderError::InvalidReference(e.to_string()))?;
        let root = self.load()?;

        let mut cursor = &root;
        for segment in secret_ref.path.split('.') {
            cursor = cursor
                .get(segment)
                .ok_or_else(|| ProviderError::NotFound(secret_ref.path.clone()))?;
        }
        if let Some(field) = &secret_ref.field {
            cursor = cursor
                .get(field)
                .ok_or_else(|| ProviderError::NotFound(format!("{}#{field}", secret_ref.path)))?;
        }

        let value = match cursor {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Ok((value, HashMap::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_nested_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"db": {{"password": "s3cr3t"}}}}"#).unwrap();
        let provider = JsonFileProvider::new("json", file.path().to_path_buf());
        let reference = Reference::Legacy { provider: "json".into(), key: "db.password".into(), version: None };
        let (value, _) = provider.get(&reference, Duration::from_secs(1)).await.unwrap();
        assert_eq!(value, "s3cr3t");
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        let provider = JsonFileProvider::new("json", file.path().to_path_buf());
        let reference = Reference::Legacy { provider: "json".into(), key: "absent".into(), version: None };
        let err = provider.get(&reference, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }
}
