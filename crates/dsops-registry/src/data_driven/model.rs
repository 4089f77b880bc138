use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// One entry of `service-types.yaml`: a class of rotation target sharing a
/// strategy and a set of credential kinds it can rotate.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceTypeDef {
    pub name: String,
    pub strategy: String,
    #[serde(default)]
    pub credential_kinds: Vec<String>,
}

/// One entry of `service-instances.yaml`: a concrete, named rotation target.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInstanceDef {
    pub name: String,
    pub service_type: String,
    pub credential_kind: String,
    pub rotation_policy: String,
    #[serde(default)]
    pub principals: Vec<String>,
    #[serde(default)]
    pub config: HashMap<String, Value>,
}

/// One entry of `rotation-policies.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RotationPolicyDef {
    pub name: String,
    #[serde(default)]
    pub min_rotation_interval_secs: Option<u64>,
    #[serde(default)]
    pub grace_period_secs: Option<u64>,
}

/// One entry of `principals.yaml`: an identity allowed to trigger rotation
/// for the instances that name it.
#[derive(Debug, Clone, Deserialize)]
pub struct PrincipalDef {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceTypesDocument {
    #[serde(default)]
    pub service_types: Vec<ServiceTypeDef>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceInstancesDocument {
    #[serde(default)]
    pub service_instances: Vec<ServiceInstanceDef>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RotationPoliciesDocument {
    #[serde(default)]
    pub rotation_policies: Vec<RotationPolicyDef>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PrincipalsDocument {
    #[serde(default)]
    pub principals: Vec<PrincipalDef>,
}
