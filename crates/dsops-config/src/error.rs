use thiserror::Error;

/// All variants are *ConfigError* in the sense of §7: user errors that bubble
/// up immediately, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml parse error in {path}: {source}")]
    YamlParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported config version {found} (only version 0 is supported)")]
    UnsupportedVersion { found: u32 },

    #[error("{field}: {message}")]
    Conversion { field: String, message: String },

    #[error("duplicate name '{name}' across secretStores/services/providers; names must be unique in the merged namespace")]
    DuplicateName { name: String },

    #[error("{kind} '{name}' not found. Available: {suggestion}")]
    NotFoundNamed { kind: &'static str, name: String, suggestion: String },

    #[error("domain error: {0}")]
    Domain(#[from] dsops_domain::DomainError),

    #[error("validation failed:\n{}", .0.join("\n"))]
    Multiple(Vec<String>),
}

impl ConfigError {
    /// Cap the list of suggested names shown in a NotFound error (§4.A).
    pub fn suggest(mut names: Vec<String>) -> String {
        names.sort();
        const MAX: usize = 5;
        if names.len() > MAX {
            let shown = names[..MAX].join(", ");
            format!("{}, … ({} more)", shown, names.len() - MAX)
        } else if names.is_empty() {
            "(none configured)".to_string()
        } else {
            names.join(", ")
        }
    }
}
