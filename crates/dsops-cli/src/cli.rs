use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "dsops", about = "Developer-facing secret resolution, execution and rotation toolkit", version)]
pub struct Cli {
    /// Path to the dsops config document.
    #[arg(long, short = 'c', global = true, default_value = "dsops.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Describe how every variable in an environment would be resolved,
    /// without calling any provider.
    Plan {
        #[arg(long)]
        env: String,
    },

    /// Resolve every variable in an environment concurrently.
    Resolve {
        #[arg(long)]
        env: String,
    },

    /// Resolve a single named variable and print its value.
    Get {
        #[arg(long)]
        env: String,
        #[arg(long)]
        var: String,
    },

    /// Resolve an environment and run a child process with it injected.
    Exec {
        #[arg(long)]
        env: String,

        /// Print the resolved environment (masked) instead of exec'ing it.
        #[arg(long)]
        print: bool,

        /// Allow resolved variables to override existing process environment entries.
        #[arg(long)]
        allow_override: bool,

        #[arg(long)]
        working_dir: Option<PathBuf>,

        #[arg(long)]
        timeout_secs: Option<u64>,

        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Resolve an environment and render it to a file.
    Render {
        #[arg(long)]
        env: String,

        #[arg(long)]
        out: PathBuf,

        #[arg(long, value_enum)]
        format: Option<RenderFormatArg>,

        #[arg(long)]
        template: Option<PathBuf>,

        #[arg(long)]
        ttl_secs: Option<u64>,

        /// Octal file mode, e.g. "0600".
        #[arg(long)]
        permissions: Option<String>,
    },

    /// Health-check a single registered provider.
    ValidateProvider {
        #[arg(long)]
        provider: String,

        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },

    /// Rotate a registered service's credential.
    Rotate {
        #[arg(long)]
        service: String,
        #[arg(long)]
        env: String,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        force: bool,
        #[arg(long, value_enum, default_value_t = OnConflictArg::Fail)]
        on_conflict: OnConflictArg,
        #[arg(long)]
        new_value: Option<String>,
    },

    /// Manually roll back a service to a previous credential version.
    Rollback {
        #[arg(long)]
        service: String,
        #[arg(long)]
        env: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        previous_version: Option<String>,
        #[arg(long)]
        failed_version: Option<String>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a service's persisted rotation status.
    Status {
        #[arg(long)]
        service: String,
    },

    /// Print a service's rotation history, optionally since an RFC3339 timestamp.
    History {
        #[arg(long)]
        service: String,
        #[arg(long)]
        since: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RenderFormatArg {
    Dotenv,
    Json,
    Yaml,
    Template,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OnConflictArg {
    Fail,
    Skip,
    Rollback,
}
