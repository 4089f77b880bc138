use std::io::Write;

use dsops_config::{Config, ConfigError};
use dsops_domain::Reference;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn rejects_missing_file() {
    let err = Config::load(std::path::Path::new("/nonexistent/dsops.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn rejects_malformed_yaml() {
    let file = write_config("version: 0\nenvs: [this, is, not, a, map");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse { .. }));
}

#[test]
fn rejects_unsupported_version() {
    let file = write_config("version: 1\nenvs: {}\n");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedVersion { found: 1 }));
}

#[test]
fn loads_literal_only_environment() {
    let file = write_config(
        r#"
version: 0
envs:
  dev:
    DB_URL:
      literal: "postgres://localhost/testdb"
"#,
    );
    let cfg = Config::load(file.path()).unwrap();
    let env = cfg.get_environment("dev").unwrap();
    assert_eq!(env["DB_URL"].literal.as_deref(), Some("postgres://localhost/testdb"));
}

#[test]
fn unknown_environment_lists_available_names() {
    let file = write_config(
        r#"
version: 0
envs:
  dev: {}
  prod: {}
"#,
    );
    let cfg = Config::load(file.path()).unwrap();
    let err = cfg.get_environment("staging").unwrap_err();
    match err {
        ConfigError::NotFoundNamed { kind, name, suggestion } => {
            assert_eq!(kind, "environment");
            assert_eq!(name, "staging");
            assert!(suggestion.contains("dev"));
            assert!(suggestion.contains("prod"));
        }
        other => panic!("expected NotFoundNamed, got {other:?}"),
    }
}

#[test]
fn merges_legacy_and_new_provider_blocks() {
    let file = write_config(
        r#"
version: 0
secretStores:
  vault:
    type: vault
providers:
  legacy-json:
    type: json
envs: {}
"#,
    );
    let cfg = Config::load(file.path()).unwrap();
    let merged = cfg.list_all_providers();
    assert_eq!(merged.len(), 2);
    assert!(merged.contains_key("vault"));
    assert!(merged.contains_key("legacy-json"));
}

#[test]
fn rejects_duplicate_name_across_namespaces() {
    let file = write_config(
        r#"
version: 0
secretStores:
  shared:
    type: vault
services:
  shared:
    type: postgres
envs: {}
"#,
    );
    let err = Config::load(file.path()).unwrap_err();
    match err {
        ConfigError::Multiple(issues) => {
            assert!(issues.iter().any(|i| i.contains("duplicate name 'shared'")));
        }
        other => panic!("expected Multiple, got {other:?}"),
    }
}

#[test]
fn rejects_variable_with_neither_literal_nor_from() {
    let file = write_config(
        r#"
version: 0
envs:
  dev:
    BAD: {}
"#,
    );
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Multiple(_)));
}

#[test]
fn parses_store_uri_reference() {
    let file = write_config(
        r#"
version: 0
envs:
  dev:
    SECRET:
      from: "store://vault/db/creds#password?version=3"
"#,
    );
    let cfg = Config::load(file.path()).unwrap();
    let env = cfg.get_environment("dev").unwrap();
    match env["SECRET"].from.as_ref().unwrap() {
        Reference::Store { store, path, field, version } => {
            assert_eq!(store, "vault");
            assert_eq!(path, "db/creds");
            assert_eq!(field.as_deref(), Some("password"));
            assert_eq!(version.as_deref(), Some("3"));
        }
        other => panic!("expected Store, got {other:?}"),
    }
}

#[test]
fn parses_legacy_object_reference() {
    let file = write_config(
        r#"
version: 0
envs:
  dev:
    SECRET:
      from:
        provider: vault
        key: db/creds
"#,
    );
    let cfg = Config::load(file.path()).unwrap();
    let env = cfg.get_environment("dev").unwrap();
    assert!(env["SECRET"].from.as_ref().unwrap().is_legacy_format());
}

#[test]
fn provider_timeout_defaults_when_absent() {
    let file = write_config(
        r#"
version: 0
secretStores:
  vault:
    type: vault
envs: {}
"#,
    );
    let cfg = Config::load(file.path()).unwrap();
    let provider = cfg.get_secret_store("vault").unwrap();
    assert_eq!(provider.effective_timeout_ms(), 30_000);
}
