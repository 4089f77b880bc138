use thiserror::Error;

/// *CommandError* (§7): child-process execution failures.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no command specified")]
    EmptyCommand,

    #[error("command not found on PATH: {0}")]
    NotFound(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("failed to spawn child process: {0}")]
    Spawn(String),

    #[error("child process exited with status {0}")]
    NonZeroExit(i32),
}

/// *RenderError* (§7): file rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no output path specified (--out is mandatory)")]
    MissingOutputPath,

    #[error("output path '{path}' is rejected by policy: {reason}")]
    PolicyRejected { path: String, reason: String },

    #[error("invalid permissions '{0}': must be octal, e.g. 0600")]
    InvalidPermissions(String),

    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("io error writing {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("serialization error: {0}")]
    Serialize(String),
}
