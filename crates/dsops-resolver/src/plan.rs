use dsops_config::Config;
use dsops_registry::Registry;
use serde::{Deserialize, Serialize};

use crate::error::ResolverError;

/// One variable's entry in a [`PlanResult`] (§4.C `Plan`): the source it
/// would be resolved from, with no provider calls made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    pub source: String,
    pub transform: Option<String>,
    pub optional: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanResult {
    pub variables: Vec<PlanEntry>,
    pub errors: Vec<String>,
}

/// Describe how every variable in `env` would be resolved without calling
/// any provider (§4.C `Plan`). An unregistered provider is recorded as a
/// per-variable error, not a fatal failure — the plan always returns `Ok`
/// once the environment itself is found.
pub fn plan(config: &Config, registry: &Registry, env_name: &str) -> Result<PlanResult, ResolverError> {
    let env = config.get_environment(env_name)?;

    let mut result = PlanResult::default();
    let mut names: Vec<&String> = env.keys().collect();
    names.sort();

    for name in names {
        let variable = &env[name];
        let (source, error) = match (&variable.literal, &variable.from) {
            (Some(_), None) => ("literal".to_string(), None),
            (None, Some(reference)) => {
                let provider_name = reference.effective_provider();
                match registry.provider_for(reference) {
                    Ok(_) => (format!("{provider_name}:{}", describe(reference)), None),
                    Err(e) => (provider_name.to_string(), Some(e.to_string())),
                }
            }
            _ => ("invalid".to_string(), Some("variable has neither literal nor from".to_string())),
        };

        result.variables.push(PlanEntry {
            name: name.clone(),
            source,
            transform: variable.transform.clone(),
            optional: variable.optional,
            error,
        });
    }

    Ok(result)
}

fn describe(reference: &dsops_domain::Reference) -> String {
    reference
        .to_secret_ref()
        .map(|r| r.path)
        .unwrap_or_else(|_| "<service>".to_string())
}
