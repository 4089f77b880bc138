use crate::types::*;

#[test]
fn variable_requires_exactly_one_of_literal_or_from() {
    let lit = Variable {
        literal: Some("x".into()),
        from: None,
        optional: false,
        transform: None,
        metadata: Default::default(),
    };
    assert!(lit.validate("V").is_ok());

    let neither = Variable {
        literal: None,
        from: None,
        optional: false,
        transform: None,
        metadata: Default::default(),
    };
    assert!(neither.validate("V").is_err());

    let both = Variable {
        literal: Some("x".into()),
        from: Some(Reference::Legacy { provider: "p".into(), key: "k".into(), version: None }),
        optional: false,
        transform: None,
        metadata: Default::default(),
    };
    assert!(both.validate("V").is_err());
}

#[test]
fn legacy_reference_converts_to_store_uri() {
    let r = Reference::Legacy { provider: "vault".into(), key: "db/creds".into(), version: None };
    assert_eq!(r.to_store_uri().unwrap(), "store://vault/db/creds");

    let versioned = Reference::Legacy {
        provider: "vault".into(),
        key: "db/creds".into(),
        version: Some("3".into()),
    };
    assert_eq!(versioned.to_store_uri().unwrap(), "store://vault/db/creds?version=3");
}

#[test]
fn store_reference_round_trips_through_secret_ref() {
    let r = Reference::Store {
        store: "vault".into(),
        path: "db/creds".into(),
        field: Some("password".into()),
        version: None,
    };
    let secret_ref = r.to_secret_ref().unwrap();
    assert_eq!(secret_ref.store, "vault");
    assert_eq!(secret_ref.field.as_deref(), Some("password"));
}

#[test]
fn service_reference_has_no_secret_ref_form() {
    let r = Reference::Service { service_type: "postgres".into(), id: "prod-db".into(), params: Default::default() };
    assert!(r.is_service_reference());
    assert!(r.to_secret_ref().is_err());
}

#[test]
fn effective_provider_is_variant_agnostic() {
    let store = Reference::Store { store: "s".into(), path: "p".into(), field: None, version: None };
    let legacy = Reference::Legacy { provider: "s".into(), key: "p".into(), version: None };
    let service = Reference::Service { service_type: "s".into(), id: "p".into(), params: Default::default() };
    assert_eq!(store.effective_provider(), "s");
    assert_eq!(legacy.effective_provider(), "s");
    assert_eq!(service.effective_provider(), "s");
}

#[test]
fn provider_timeout_falls_back_to_default_on_zero_or_negative() {
    let mut cfg = ProviderConfig { type_name: "mock".into(), timeout_ms: None, config: Default::default() };
    assert_eq!(cfg.effective_timeout_ms(), 30_000);

    cfg.timeout_ms = Some(0);
    assert_eq!(cfg.effective_timeout_ms(), 30_000);

    cfg.timeout_ms = Some(5_000);
    assert_eq!(cfg.effective_timeout_ms(), 5_000);
}

#[test]
fn secret_type_inference_prefers_strategy_then_key() {
    assert_eq!(SecretType::infer("certificate", "whatever"), SecretType::Certificate);
    assert_eq!(SecretType::infer("generic", "DB_PASSWORD"), SecretType::Password);
    assert_eq!(SecretType::infer("generic", "STRIPE_API_KEY"), SecretType::ApiKey);
    assert_eq!(SecretType::infer("generic", "TLS_CERT"), SecretType::Certificate);
    assert_eq!(SecretType::infer("generic", "SOME_VALUE"), SecretType::Generic);
}

#[test]
fn list_all_providers_merges_three_namespaces() {
    let mut doc = ConfigDocument {
        version: 0,
        secret_stores: Default::default(),
        services: Default::default(),
        providers: Default::default(),
        envs: Default::default(),
        policies: None,
    };
    doc.secret_stores.insert(
        "vault".into(),
        ProviderConfig { type_name: "vault".into(), timeout_ms: None, config: Default::default() },
    );
    doc.services.insert(
        "postgres-prod".into(),
        ProviderConfig { type_name: "postgres".into(), timeout_ms: None, config: Default::default() },
    );
    doc.providers.insert(
        "legacy-store".into(),
        ProviderConfig { type_name: "json".into(), timeout_ms: None, config: Default::default() },
    );

    let merged = doc.list_all_providers();
    assert_eq!(merged.len(), 3);
    assert!(merged.contains_key("vault"));
    assert!(merged.contains_key("postgres-prod"));
    assert!(merged.contains_key("legacy-store"));
}
