mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan { env } => commands::plan(cli.config, env),
        Command::Resolve { env } => commands::resolve(cli.config, env).await,
        Command::Get { env, var } => commands::get(cli.config, env, var).await,
        Command::Exec { env, print, allow_override, working_dir, timeout_secs, command } => {
            commands::exec(cli.config, env, print, allow_override, working_dir, timeout_secs, command).await
        }
        Command::Render { env, out, format, template, ttl_secs, permissions } => {
            commands::render(cli.config, env, out, format, template, ttl_secs, permissions).await
        }
        Command::ValidateProvider { provider, timeout_secs } => {
            commands::validate_provider(cli.config, provider, timeout_secs).await
        }
        Command::Rotate { service, env, dry_run, force, on_conflict, new_value } => {
            commands::rotate(cli.config, service, env, dry_run, force, on_conflict, new_value).await
        }
        Command::Rollback { service, env, reason, previous_version, failed_version, force, dry_run } => {
            commands::rollback(cli.config, service, env, reason, previous_version, failed_version, force, dry_run).await
        }
        Command::Status { service } => commands::status(service),
        Command::History { service, since } => commands::history(service, since),
    }
}
