use std::path::Path;

use dsops_config::Config;
use dsops_domain::Reference;
use dsops_registry::{Registry, RegistryError};

const DOC: &str = r#"
version: 0
secretStores:
  lit:
    type: literal
    config:
      values:
        db/password: hunter2
  unknown_store:
    type: not_a_real_type
services:
  rot:
    type: random
    config:
      length: 16
envs:
  dev:
    DB_PASSWORD:
      from: "store://lit/db/password"
"#;

fn load() -> Config {
    Config::from_str(DOC, Path::new("inline.yaml")).unwrap()
}

#[test]
fn unknown_provider_type_is_skipped_not_fatal() {
    let config = load();
    let registry = Registry::from_config(&config).unwrap();
    assert!(registry.get_provider("lit").is_ok());
    assert!(matches!(registry.get_provider("unknown_store"), Err(RegistryError::ProviderNotRegistered(_))));
}

#[test]
fn service_reference_is_rejected_as_provider() {
    let config = load();
    let registry = Registry::from_config(&config).unwrap();
    let reference = Reference::Service { service_type: "rot".into(), id: "x".into(), params: Default::default() };
    let err = registry.provider_for(&reference).unwrap_err();
    assert!(matches!(err, RegistryError::ServiceNotAProvider(_)));
}

#[tokio::test]
async fn resolves_literal_store_through_registry() {
    let config = load();
    let registry = Registry::from_config(&config).unwrap();
    let reference = Reference::Store { store: "lit".into(), path: "db/password".into(), field: None, version: None };
    let provider = registry.provider_for(&reference).unwrap();
    let (value, _) = provider.get(&reference, std::time::Duration::from_secs(1)).await.unwrap();
    assert_eq!(value, "hunter2");
}
