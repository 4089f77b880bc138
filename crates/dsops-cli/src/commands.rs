use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dsops_config::Config;
use dsops_domain::SecretRef;
use dsops_exec::{ExecRequest, RenderFormat, RenderRequest};
use dsops_registry::{OnConflict, Registry, RotationConstraints, RotationRequest, RotationResult, Service};
use dsops_rotation::{RollbackAction, RollbackManager, RollbackRequest, RotationEngine, RotationStorage};
use tracing::info;

use crate::cli::{OnConflictArg, RenderFormatArg};
use crate::output;

fn load_config(path: &PathBuf) -> Result<Config> {
    Config::load(path).with_context(|| format!("failed to load config from {}", path.display()))
}

fn build_registry(config: &Config) -> Result<Arc<Registry>> {
    let registry = Registry::from_config(config).context("failed to build provider/service registry")?;
    let registry = registry.with_data_driven_services(std::path::Path::new("services"));
    Ok(Arc::new(registry))
}

// ── Plan / Resolve / Get ────────────────────────────────────────────────────

pub fn plan(config_path: PathBuf, env: String) -> Result<()> {
    let config = load_config(&config_path)?;
    let registry = build_registry(&config)?;
    let result = dsops_resolver::plan(&config, &registry, &env)?;
    print!("{}", output::render_plan(&result));
    if !result.errors.is_empty() {
        for e in &result.errors {
            eprintln!("warning: {e}");
        }
    }
    Ok(())
}

pub async fn resolve(config_path: PathBuf, env: String) -> Result<()> {
    let config = load_config(&config_path)?;
    let registry = build_registry(&config)?;
    let resolved = dsops_resolver::resolve(&config, registry, &env).await?;
    print!("{}", output::render_masked(&resolved));
    Ok(())
}

pub async fn get(config_path: PathBuf, env: String, var: String) -> Result<()> {
    let config = load_config(&config_path)?;
    let registry = build_registry(&config)?;
    let resolved = dsops_resolver::resolve_named(&config, registry, &env, std::slice::from_ref(&var)).await?;
    let entry = resolved.get(&var).context("variable not present in environment")?;
    if let Some(err) = &entry.error {
        anyhow::bail!("{var}: {}", err.message);
    }
    println!("{}", entry.value);
    Ok(())
}

// ── Exec ─────────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub async fn exec(
    config_path: PathBuf,
    env: String,
    print: bool,
    allow_override: bool,
    working_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
    command: Vec<String>,
) -> Result<()> {
    let config = load_config(&config_path)?;
    let registry = build_registry(&config)?;
    let resolved = dsops_resolver::resolve(&config, registry, &env).await?;

    for (name, entry) in &resolved {
        if entry.error.is_some() && !entry.optional {
            anyhow::bail!("required variable '{name}' failed to resolve: {}", entry.error.as_ref().unwrap().message);
        }
    }

    if print {
        print!("{}", output::render_masked(&resolved));
        return Ok(());
    }

    if let Some(program) = command.first() {
        if let Some(warning) = dsops_exec::check_dangerous(program) {
            tracing::warn!(command = %warning.command, "{}", warning.message);
        }
    }

    let vars: HashMap<String, String> = resolved.into_iter().map(|(k, v)| (k, v.value)).collect();
    let env_map = dsops_exec::build_env(&vars, allow_override);
    let request = ExecRequest {
        command,
        vars,
        allow_override,
        working_dir,
        timeout: timeout_secs.map(Duration::from_secs),
        print_vars: print,
    };
    let exit_code = dsops_exec::run(request, env_map).await?;
    std::process::exit(exit_code);
}

// ── Render ───────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub async fn render(
    config_path: PathBuf,
    env: String,
    out: PathBuf,
    format: Option<RenderFormatArg>,
    template: Option<PathBuf>,
    ttl_secs: Option<u64>,
    permissions: Option<String>,
) -> Result<()> {
    let config = load_config(&config_path)?;
    let registry = build_registry(&config)?;
    let resolved = dsops_resolver::resolve(&config, registry, &env).await?;

    for (name, entry) in &resolved {
        if entry.error.is_some() && !entry.optional {
            anyhow::bail!("required variable '{name}' failed to resolve: {}", entry.error.as_ref().unwrap().message);
        }
    }

    let format = match format {
        Some(RenderFormatArg::Dotenv) => RenderFormat::Dotenv,
        Some(RenderFormatArg::Json) => RenderFormat::Json,
        Some(RenderFormatArg::Yaml) => RenderFormat::Yaml,
        Some(RenderFormatArg::Template) => RenderFormat::Template,
        None => RenderFormat::from_extension(&out).unwrap_or(RenderFormat::Dotenv),
    };

    let template_content = match &template {
        Some(path) => Some(std::fs::read_to_string(path).with_context(|| format!("failed to read template {}", path.display()))?),
        None => None,
    };

    dsops_exec::validate_output_path(&out, config.policies().and_then(|p| p.output_path.as_ref()))?;

    let variables: HashMap<String, String> = resolved.into_iter().map(|(k, v)| (k, v.value)).collect();
    let request = RenderRequest {
        format,
        variables,
        output_path: out.clone(),
        template_content,
        ttl: ttl_secs.map(Duration::from_secs),
        permissions,
    };
    dsops_exec::render_to_file(&request)?;
    println!("Rendered {} variables to {}", request.variables.len(), out.display());
    Ok(())
}

// ── Validate provider ────────────────────────────────────────────────────────

pub async fn validate_provider(config_path: PathBuf, provider: String, timeout_secs: u64) -> Result<()> {
    let config = load_config(&config_path)?;
    let registry = build_registry(&config)?;
    dsops_resolver::validate_provider(&registry, &provider, Duration::from_secs(timeout_secs)).await?;
    println!("{provider}: ok");
    Ok(())
}

// ── Rotation ─────────────────────────────────────────────────────────────────

fn rotation_storage() -> Arc<RotationStorage> {
    Arc::new(RotationStorage::from_env())
}

#[allow(clippy::too_many_arguments)]
pub async fn rotate(
    config_path: PathBuf,
    service_name: String,
    _env: String,
    dry_run: bool,
    force: bool,
    on_conflict: OnConflictArg,
    new_value: Option<String>,
) -> Result<()> {
    let config = load_config(&config_path)?;
    let registry = build_registry(&config)?;
    let service = registry.get_service(&service_name)?;

    let on_conflict = match on_conflict {
        OnConflictArg::Fail => OnConflict::Fail,
        OnConflictArg::Skip => OnConflict::Skip,
        OnConflictArg::Rollback => OnConflict::Rollback,
    };

    let request = RotationRequest {
        service_name: service_name.clone(),
        provider_name: service_name.clone(),
        reference: SecretRef { store: service_name.clone(), path: "credential".to_string(), field: None, version: None },
        secret_type: None,
        metadata: HashMap::new(),
        strategy: service_name.clone(),
        new_value,
        dry_run,
        force,
        on_conflict,
        constraints: RotationConstraints::default(),
    };

    let engine = RotationEngine::new(rotation_storage());
    let policies = config.policies().cloned().unwrap_or_default();
    let outcome = engine.rotate(service.as_ref(), request, &policies).await?;

    println!("plan: {} step(s) for strategy '{}'", outcome.plan.steps.len(), outcome.plan.strategy);
    for step in &outcome.plan.steps {
        println!("  - {}", step.description);
    }
    if let Some(history) = outcome.history {
        println!("result: {:?}", history.status);
    } else {
        println!("dry run: no state written");
    }
    for delivery in &outcome.notifications {
        info!(channel = %delivery.channel, success = delivery.success, "notification dispatched");
    }
    Ok(())
}

struct ServiceRollbackAction {
    service: Arc<dyn Service>,
    result: RotationResult,
}

#[async_trait]
impl RollbackAction for ServiceRollbackAction {
    async fn restore(&self) -> Result<(), String> {
        self.service.rollback(&self.result).await.map_err(|e| e.to_string())
    }

    async fn verify(&self) -> Result<(), String> {
        self.service.validate(Duration::from_secs(30)).await.map_err(|e| e.to_string())
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn rollback(
    config_path: PathBuf,
    service_name: String,
    env: String,
    reason: String,
    previous_version: Option<String>,
    failed_version: Option<String>,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let config = load_config(&config_path)?;
    let registry = build_registry(&config)?;
    let service = registry.get_service(&service_name)?;

    if !force && !dry_run {
        anyhow::bail!("rollback requires --force to proceed without an interactive prompt");
    }

    let result = RotationResult {
        service_name: service_name.clone(),
        old_version: failed_version.clone(),
        new_version: previous_version.clone(),
        duration: Duration::from_secs(0),
        steps: vec!["manual rollback".to_string()],
    };

    let storage = rotation_storage();
    let manager = RollbackManager::new(storage);
    let request = RollbackRequest {
        service_name,
        environment: env,
        reason,
        previous_version,
        failed_version,
        action: Arc::new(ServiceRollbackAction { service, result }),
        initiated_by: std::env::var("USER").ok(),
        dry_run,
        force,
    };

    let policy = config.policies().and_then(|p| p.rollback.clone()).unwrap_or_default();
    let entry = manager.execute(request, &policy).await?;
    println!("rollback {:?}: {}", entry.status, entry.id);
    Ok(())
}

pub fn status(service_name: String) -> Result<()> {
    let storage = rotation_storage();
    let status = storage.load_status(&service_name)?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub fn history(service_name: String, since: Option<String>) -> Result<()> {
    let storage = rotation_storage();
    let since = match since {
        Some(s) => chrono::DateTime::parse_from_rfc3339(&s)
            .context("--since must be an RFC3339 timestamp")?
            .with_timezone(&chrono::Utc),
        None => chrono::DateTime::<chrono::Utc>::MIN_UTC,
    };
    let entries = storage.history_since(&service_name, since)?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
