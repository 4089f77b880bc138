use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dsops_domain::OutputPathPolicy;
use tracing::warn;

use crate::error::RenderError;
use crate::template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Dotenv,
    Json,
    Yaml,
    Template,
}

impl RenderFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("env") => Some(Self::Dotenv),
            Some("json") => Some(Self::Json),
            Some("yaml") | Some("yml") => Some(Self::Yaml),
            Some("tmpl") | Some("tpl") => Some(Self::Template),
            _ => None,
        }
    }
}

pub struct RenderRequest {
    pub format: RenderFormat,
    pub variables: std::collections::HashMap<String, String>,
    pub output_path: PathBuf,
    pub template_content: Option<String>,
    pub ttl: Option<Duration>,
    /// Octal string, e.g. `"0600"`.
    pub permissions: Option<String>,
}

const DEFAULT_PERMISSIONS: u32 = 0o600;

/// Validate `path` against `policy`, if one is configured (§4.D step 2).
pub fn validate_output_path(path: &Path, policy: Option<&OutputPathPolicy>) -> Result<(), RenderError> {
    let Some(policy) = policy else { return Ok(()) };
    let path_str = path.to_string_lossy();

    for denied in &policy.denied_dirs {
        if path_str.starts_with(denied.as_str()) {
            return Err(RenderError::PolicyRejected {
                path: path_str.into_owned(),
                reason: format!("under denied directory '{denied}'"),
            });
        }
    }

    if !policy.allowed_dirs.is_empty() && !policy.allowed_dirs.iter().any(|dir| path_str.starts_with(dir.as_str())) {
        return Err(RenderError::PolicyRejected {
            path: path_str.into_owned(),
            reason: "not under any allowed directory".to_string(),
        });
    }

    Ok(())
}

fn parse_permissions(raw: Option<&str>) -> Result<u32, RenderError> {
    match raw {
        None => Ok(DEFAULT_PERMISSIONS),
        Some(s) => u32::from_str_radix(s.trim_start_matches('0'), 8)
            .map_err(|_| RenderError::InvalidPermissions(s.to_string())),
    }
}

fn serialize(request: &RenderRequest) -> Result<String, RenderError> {
    let sorted: BTreeMap<&String, &String> = request.variables.iter().collect();

    match request.format {
        RenderFormat::Dotenv => {
            let mut out = String::from("# generated by dsops — contains secrets, do not commit\n");
            for (key, value) in sorted {
                let needs_quotes = value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '#');
                if needs_quotes {
                    out.push_str(&format!("{key}=\"{}\"\n", value.replace('"', "\\\"")));
                } else {
                    out.push_str(&format!("{key}={value}\n"));
                }
            }
            Ok(out)
        }
        RenderFormat::Json => {
            serde_json::to_string_pretty(&sorted).map_err(|e| RenderError::Serialize(e.to_string()))
        }
        RenderFormat::Yaml => {
            serde_yaml::to_string(&sorted).map_err(|e| RenderError::Serialize(e.to_string()))
        }
        RenderFormat::Template => {
            let template_content = request
                .template_content
                .as_deref()
                .ok_or_else(|| RenderError::Template("template format requires template content".to_string()))?;
            template::render(template_content, &request.variables)
        }
    }
}

/// Render `request` to its configured output path atomically (§4.D "File
/// rendering"): write to a sibling temp file, fsync, rename, then apply
/// permissions explicitly. `--out` is mandatory at the CLI layer; this
/// function takes the already-resolved path as a precondition.
pub fn render_to_file(request: &RenderRequest) -> Result<(), RenderError> {
    let permissions = parse_permissions(request.permissions.as_deref())?;
    let content = serialize(request)?;

    let parent = request.output_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = request
        .output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dsops-render".to_string());
    let tmp_path = parent.join(format!(".{file_name}.tmp"));

    {
        let mut tmp_file = std::fs::File::create(&tmp_path).map_err(|e| RenderError::Io {
            path: tmp_path.to_string_lossy().into_owned(),
            source: e,
        })?;
        tmp_file.write_all(content.as_bytes()).map_err(|e| RenderError::Io {
            path: tmp_path.to_string_lossy().into_owned(),
            source: e,
        })?;
        tmp_file.sync_all().map_err(|e| RenderError::Io {
            path: tmp_path.to_string_lossy().into_owned(),
            source: e,
        })?;
    }

    std::fs::rename(&tmp_path, &request.output_path).map_err(|e| RenderError::Io {
        path: request.output_path.to_string_lossy().into_owned(),
        source: e,
    })?;

    apply_permissions(&request.output_path, permissions)?;

    warn!(path = %request.output_path.display(), "output file contains secrets; ensure it is gitignored");

    if let Some(ttl) = request.ttl {
        schedule_best_effort_deletion(request.output_path.clone(), ttl);
    }

    Ok(())
}

#[cfg(unix)]
fn apply_permissions(path: &Path, mode: u32) -> Result<(), RenderError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| RenderError::Io { path: path.to_string_lossy().into_owned(), source: e })
}

#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _mode: u32) -> Result<(), RenderError> {
    Ok(())
}

/// Best-effort: spawns a background task that removes the file after `ttl`.
/// On process exit before the deadline, the task is simply never run again
/// (§4.D step 7 — no obligation to complete).
fn schedule_best_effort_deletion(path: PathBuf, ttl: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "best-effort TTL deletion failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars() -> HashMap<String, String> {
        let mut v = HashMap::new();
        v.insert("B".to_string(), "2".to_string());
        v.insert("A".to_string(), "1".to_string());
        v
    }

    #[test]
    fn dotenv_is_sorted_by_key() {
        let request = RenderRequest {
            format: RenderFormat::Dotenv,
            variables: vars(),
            output_path: PathBuf::from("ignored"),
            template_content: None,
            ttl: None,
            permissions: None,
        };
        let rendered = serialize(&request).unwrap();
        let a_pos = rendered.find("A=1").unwrap();
        let b_pos = rendered.find("B=2").unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn writes_atomically_with_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.env");
        let request = RenderRequest {
            format: RenderFormat::Dotenv,
            variables: vars(),
            output_path: out.clone(),
            template_content: None,
            ttl: None,
            permissions: Some("0600".to_string()),
        };
        render_to_file(&request).unwrap();
        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.contains("A=1"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&out).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[test]
    fn policy_rejects_denied_directory() {
        let policy = OutputPathPolicy { allowed_dirs: vec![], denied_dirs: vec!["/etc".to_string()] };
        let err = validate_output_path(Path::new("/etc/passwd"), Some(&policy)).unwrap_err();
        assert!(matches!(err, RenderError::PolicyRejected { .. }));
    }

    #[test]
    fn policy_requires_allowed_directory_when_configured() {
        let policy = OutputPathPolicy { allowed_dirs: vec!["/tmp".to_string()], denied_dirs: vec![] };
        assert!(validate_output_path(Path::new("/tmp/x.env"), Some(&policy)).is_ok());
        assert!(validate_output_path(Path::new("/var/x.env"), Some(&policy)).is_err());
    }

    #[test]
    fn invalid_permissions_string_is_rejected() {
        assert!(parse_permissions(Some("not-octal")).is_err());
    }
}
