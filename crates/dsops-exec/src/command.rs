use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::CommandError;
use crate::secure_buffer::SecureBuffer;

/// Known-bad commands (§4.D "Dangerous-command guardrail"). Advisory only:
/// the caller decides whether to abort on a [`ValidationWarning`].
const DANGEROUS_COMMANDS: &[&str] =
    &["rm", "rmdir", "del", "format", "fdisk", "dd", "mkfs", "parted", "shutdown", "reboot"];

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub command: String,
    pub message: String,
}

/// Inputs to [`run`] (§4.D "Child-process execution").
pub struct ExecRequest {
    pub command: Vec<String>,
    pub vars: HashMap<String, String>,
    pub allow_override: bool,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub print_vars: bool,
}

/// Mask a secret value for display (§4.D "Masking rule"):
/// empty → `(empty)`; ≤3 chars → all asterisks; 4–8 → first 1 + asterisks +
/// last 1; >8 → first 3 + 8 asterisks + last 2.
pub fn mask(value: &str) -> String {
    let len = value.chars().count();
    if len == 0 {
        return "(empty)".to_string();
    }
    if len <= 3 {
        return "*".repeat(len);
    }
    let chars: Vec<char> = value.chars().collect();
    if len <= 8 {
        let mut masked = String::new();
        masked.push(chars[0]);
        masked.push_str(&"*".repeat(len - 2));
        masked.push(chars[len - 1]);
        return masked;
    }
    let mut masked: String = chars[..3].iter().collect();
    masked.push_str(&"*".repeat(8));
    masked.push_str(&chars[len - 2..].iter().collect::<String>());
    masked
}

/// Check `cmd` (the program name, not the full argv) against the
/// known-bad list.
pub fn check_dangerous(cmd: &str) -> Option<ValidationWarning> {
    let base = cmd.rsplit(['/', '\\']).next().unwrap_or(cmd);
    DANGEROUS_COMMANDS.contains(&base).then(|| ValidationWarning {
        command: cmd.to_string(),
        message: format!("'{base}' is a known destructive command; proceeding is the caller's decision"),
    })
}

/// Build the child's environment map (§4.D step 4): start from the parent
/// environment, overlay `vars` according to `allow_override`.
pub fn build_env(vars: &HashMap<String, String>, allow_override: bool) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    for (key, value) in vars {
        if allow_override && env.contains_key(key) {
            continue;
        }
        env.insert(key.clone(), value.clone());
    }
    env
}

/// Same as [`build_env`] but the overlay values come from [`SecureBuffer`]s:
/// each is opened, copied into the environment map, and its `LockedBuffer`
/// destroyed immediately, then the outer `SecureBuffer` itself is destroyed
/// before returning (§4.D step 5) — no protected plaintext outlives this call.
pub fn build_env_from_secure_buffers(
    vars: &HashMap<String, SecureBuffer>,
    allow_override: bool,
) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    for (key, buffer) in vars {
        if allow_override && env.contains_key(key) {
            buffer.destroy();
            continue;
        }
        let locked = buffer.open();
        env.insert(key.clone(), locked.as_str().into_owned());
        locked.destroy();
        buffer.destroy();
    }
    env
}

/// Launch `request.command[0]` with `request.command[1..]` as arguments and
/// the built environment, inheriting stdio, and wait for it to exit (§4.D
/// "Child-process execution"). The parent exits with the child's exit code
/// on the caller's behalf — this function returns that code rather than
/// calling `std::process::exit` itself, so callers can run cleanup first.
pub async fn run(request: ExecRequest, env: HashMap<String, String>) -> Result<i32, CommandError> {
    let Some((program, args)) = request.command.split_first() else {
        return Err(CommandError::EmptyCommand);
    };

    if which(program).is_none() {
        return Err(CommandError::NotFound(program.clone()));
    }

    if request.print_vars {
        let mut names: Vec<&String> = request.vars.keys().collect();
        names.sort();
        for name in names {
            println!("{name}={}", mask(&request.vars[name]));
        }
    }

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args);
    cmd.envs(&env);
    if let Some(dir) = &request.working_dir {
        cmd.current_dir(dir);
    }

    info!(command = program, args = args.len(), "spawning child process");

    let spawn = cmd.spawn().map_err(|e| CommandError::Spawn(e.to_string()))?;
    let wait = spawn.wait_with_output();

    let output = match request.timeout {
        Some(timeout) => tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| CommandError::Timeout(timeout))?
            .map_err(|e| CommandError::Spawn(e.to_string()))?,
        None => wait.await.map_err(|e| CommandError::Spawn(e.to_string()))?,
    };

    let code = output.status.code().unwrap_or(-1);
    if code != 0 {
        warn!(command = program, exit_code = code, "child process exited non-zero");
    }
    Ok(code)
}

fn which(program: &str) -> Option<PathBuf> {
    if program.contains('/') || program.contains('\\') {
        let path = PathBuf::from(program);
        return path.is_file().then_some(path);
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        candidate.is_file().then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masking_rules() {
        assert_eq!(mask(""), "(empty)");
        assert_eq!(mask("ab"), "**");
        assert_eq!(mask("abcd"), "a**d");
        assert_eq!(mask("abcdefgh"), "a******h");
        assert_eq!(mask("abcdefghijk"), "abc********jk");
    }

    #[test]
    fn flags_known_dangerous_commands() {
        assert!(check_dangerous("rm").is_some());
        assert!(check_dangerous("/bin/rm").is_some());
        assert!(check_dangerous("echo").is_none());
    }

    #[test]
    fn build_env_default_overwrites_existing() {
        std::env::set_var("DSOPS_EXEC_TEST_VAR", "parent");
        let mut overlay = HashMap::new();
        overlay.insert("DSOPS_EXEC_TEST_VAR".to_string(), "child".to_string());
        let env = build_env(&overlay, false);
        assert_eq!(env["DSOPS_EXEC_TEST_VAR"], "child");
    }

    #[test]
    fn build_env_allow_override_keeps_parent_value() {
        std::env::set_var("DSOPS_EXEC_TEST_VAR2", "parent");
        let mut overlay = HashMap::new();
        overlay.insert("DSOPS_EXEC_TEST_VAR2".to_string(), "child".to_string());
        let env = build_env(&overlay, true);
        assert_eq!(env["DSOPS_EXEC_TEST_VAR2"], "parent");
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let request = ExecRequest {
            command: vec![],
            vars: HashMap::new(),
            allow_override: false,
            working_dir: None,
            timeout: None,
            print_vars: false,
        };
        let err = run(request, HashMap::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::EmptyCommand));
    }

    #[tokio::test]
    async fn unknown_command_is_not_found() {
        let request = ExecRequest {
            command: vec!["dsops-definitely-not-a-real-binary".to_string()],
            vars: HashMap::new(),
            allow_override: false,
            working_dir: None,
            timeout: None,
            print_vars: false,
        };
        let err = run(request, HashMap::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::NotFound(_)));
    }
}
