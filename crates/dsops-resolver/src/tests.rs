use std::path::Path;
use std::sync::Arc;

use dsops_config::Config;
use dsops_domain::ResolveErrorKind;
use dsops_registry::Registry;

use crate::{plan, resolve, resolve_named};

const DOC: &str = r#"
version: 0
secretStores:
  lit:
    type: literal
    config:
      values:
        db/password: hunter2
  missing_keys:
    type: mock
    config:
      values: {}
      not_found: ["gone"]
envs:
  dev:
    DB_PASSWORD:
      from: "store://lit/db/password"
    DB_BLOB:
      from: "store://lit/db/blob"
      transform: "json_extract:.inner"
    OPTIONAL_MISSING:
      from: "store://missing_keys/gone"
      optional: true
    LITERAL_VAR:
      literal: "plain-value"
    LITERAL_BLOB:
      literal: '{"database":{"url":"postgres://localhost/app"}}'
      transform: "json_extract:.database.url"
"#;

fn load() -> (Config, Arc<Registry>) {
    let config = Config::from_str(DOC, Path::new("inline.yaml")).unwrap();
    let registry = Arc::new(Registry::from_config(&config).unwrap());
    (config, registry)
}

#[test]
fn plan_reports_source_without_calling_providers() {
    let (config, registry) = load();
    let result = plan(&config, &registry, "dev").unwrap();
    let names: Vec<&str> = result.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["DB_BLOB", "DB_PASSWORD", "LITERAL_BLOB", "LITERAL_VAR", "OPTIONAL_MISSING"]);
    assert!(result.variables.iter().find(|v| v.name == "LITERAL_VAR").unwrap().source == "literal");
}

#[tokio::test]
async fn resolves_literal_and_store_values() {
    let (config, registry) = load();
    let resolved = resolve(&config, registry, "dev").await.unwrap();
    assert_eq!(resolved["LITERAL_VAR"].value, "plain-value");
    assert_eq!(resolved["DB_PASSWORD"].value, "hunter2");
}

#[tokio::test]
async fn literal_value_goes_through_transform() {
    let (config, registry) = load();
    let resolved = resolve(&config, registry, "dev").await.unwrap();
    let entry = &resolved["LITERAL_BLOB"];
    assert!(entry.error.is_none());
    assert_eq!(entry.value, "postgres://localhost/app");
}

#[tokio::test]
async fn optional_not_found_resolves_to_empty_success() {
    let (config, registry) = load();
    let resolved = resolve(&config, registry, "dev").await.unwrap();
    let entry = &resolved["OPTIONAL_MISSING"];
    assert!(entry.error.is_none());
    assert_eq!(entry.value, "");
}

#[tokio::test]
async fn resolve_named_restricts_to_subset() {
    let (config, registry) = load();
    let resolved = resolve_named(&config, registry, "dev", &["LITERAL_VAR".to_string()]).await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert!(resolved.contains_key("LITERAL_VAR"));
}

#[tokio::test]
async fn unknown_transform_op_fails_only_that_variable() {
    let doc = r#"
version: 0
secretStores:
  lit:
    type: literal
    config:
      values:
        k: v
envs:
  dev:
    BAD:
      from: "store://lit/k"
      transform: "rot13:x"
    GOOD:
      from: "store://lit/k"
"#;
    let config = Config::from_str(doc, Path::new("inline.yaml")).unwrap();
    let registry = Arc::new(Registry::from_config(&config).unwrap());
    let resolved = resolve(&config, registry, "dev").await.unwrap();
    assert_eq!(resolved["BAD"].error.as_ref().unwrap().kind, ResolveErrorKind::InvalidTransform);
    assert!(resolved["GOOD"].error.is_none());
}
