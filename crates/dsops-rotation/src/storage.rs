use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dsops_domain::{HistoryEntry, RotationStatus};
use tracing::warn;

use crate::error::StorageError;

const SANITIZE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace path-hostile characters with `-` and spaces with `_` (§4.E
/// "Storage layout").
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if SANITIZE_CHARS.contains(&c) { '-' } else if c == ' ' { '_' } else { c })
        .collect()
}

/// Resolve the rotation storage base directory: `DSOPS_ROTATION_DIR`
/// overrides `$XDG_DATA_HOME/dsops/rotation` overrides
/// `$HOME/.local/share/dsops/rotation` (§4.E).
pub fn resolve_base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DSOPS_ROTATION_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("dsops").join("rotation");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".local").join("share").join("dsops").join("rotation")
}

/// File-backed, write-then-rename storage for rotation status and history
/// (§4.E). Writes are serialized within the process by a single mutex;
/// across processes atomicity relies on filesystem rename.
pub struct RotationStorage {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl RotationStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir, write_lock: Mutex::new(()) }
    }

    pub fn from_env() -> Self {
        Self::new(resolve_base_dir())
    }

    fn status_path(&self, service_name: &str) -> PathBuf {
        self.base_dir.join("status").join(format!("{}.json", sanitize(service_name)))
    }

    fn history_dir(&self, service_name: &str) -> PathBuf {
        self.base_dir.join("history").join(sanitize(service_name))
    }

    pub fn load_status(&self, service_name: &str) -> Result<RotationStatus, StorageError> {
        let path = self.status_path(service_name);
        if !path.exists() {
            return Ok(RotationStatus::new(service_name));
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| StorageError::Io { path: path.display().to_string(), source: e })?;
        serde_json::from_str(&content)
            .map_err(|e| StorageError::Deserialize { path: path.display().to_string(), source: e })
    }

    pub fn save_status(&self, status: &RotationStatus) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().expect("rotation storage mutex poisoned");
        let path = self.status_path(&status.service_name);
        let dir = path.parent().expect("status path always has a parent");
        std::fs::create_dir_all(dir).map_err(|e| StorageError::Io { path: dir.display().to_string(), source: e })?;
        ensure_dir_permissions(dir);

        let content = serde_json::to_string_pretty(status)?;
        atomic_write(&path, &content)
    }

    pub fn append_history(&self, entry: &HistoryEntry) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().expect("rotation storage mutex poisoned");
        let dir = self.history_dir(&entry.service_name);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::Io { path: dir.display().to_string(), source: e })?;
        ensure_dir_permissions(&dir);

        let mut file_name = format!("{}.json", entry.timestamp.format("%Y%m%d-%H%M%S"));
        let mut path = dir.join(&file_name);
        let mut suffix = 1u32;
        while path.exists() {
            file_name = format!("{}-{suffix}.json", entry.timestamp.format("%Y%m%d-%H%M%S"));
            path = dir.join(&file_name);
            suffix += 1;
        }

        let content = serde_json::to_string_pretty(entry)?;
        atomic_write(&path, &content)
    }

    /// All history entries for `service_name` with `timestamp >= since`
    /// (§4.E `GetHistorySince`), sorted chronologically.
    pub fn history_since(&self, service_name: &str, since: DateTime<Utc>) -> Result<Vec<HistoryEntry>, StorageError> {
        let dir = self.history_dir(service_name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for file in std::fs::read_dir(&dir).map_err(|e| StorageError::Io { path: dir.display().to_string(), source: e })? {
            let file = file.map_err(|e| StorageError::Io { path: dir.display().to_string(), source: e })?;
            let content = match std::fs::read_to_string(file.path()) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %file.path().display(), error = %e, "skipping unreadable history file");
                    continue;
                }
            };
            let entry: HistoryEntry = match serde_json::from_str(&content) {
                Ok(e) => e,
                Err(e) => {
                    warn!(path = %file.path().display(), error = %e, "skipping malformed history file");
                    continue;
                }
            };
            if entry.timestamp >= since {
                entries.push(entry);
            }
        }
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }

    /// Remove history files older than `older_than` (§4.E `Cleanup`).
    /// Individual file failures are logged and skipped, not fatal.
    pub fn cleanup_old_entries(&self, service_name: &str, older_than: DateTime<Utc>) -> Result<usize, StorageError> {
        let dir = self.history_dir(service_name);
        if !dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for file in std::fs::read_dir(&dir).map_err(|e| StorageError::Io { path: dir.display().to_string(), source: e })? {
            let file = match file {
                Ok(f) => f,
                Err(_) => continue,
            };
            let content = match std::fs::read_to_string(file.path()) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %file.path().display(), error = %e, "skipping unreadable history file during cleanup");
                    continue;
                }
            };
            let entry: Result<HistoryEntry, _> = serde_json::from_str(&content);
            if let Ok(entry) = entry {
                if entry.timestamp < older_than {
                    if let Err(e) = std::fs::remove_file(file.path()) {
                        warn!(path = %file.path().display(), error = %e, "failed to remove old history entry");
                    } else {
                        removed += 1;
                    }
                }
            }
        }
        Ok(removed)
    }
}

fn atomic_write(path: &Path, content: &str) -> Result<(), StorageError> {
    let dir = path.parent().expect("storage path always has a parent");
    let tmp_path = dir.join(format!(".{}.tmp", path.file_name().unwrap().to_string_lossy()));
    std::fs::write(&tmp_path, content).map_err(|e| StorageError::Io { path: tmp_path.display().to_string(), source: e })?;
    set_file_permissions(&tmp_path);
    std::fs::rename(&tmp_path, path).map_err(|e| StorageError::Io { path: path.display().to_string(), source: e })
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) {}

#[cfg(unix)]
fn ensure_dir_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn ensure_dir_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use dsops_domain::{HistoryAction, HistoryStatus, SecretType};

    fn entry(service: &str, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            id: uuid_like(timestamp),
            timestamp,
            service_name: service.to_string(),
            credential_type: SecretType::Generic,
            action: HistoryAction::Rotate,
            status: HistoryStatus::Success,
            duration_ms: 10,
            error: None,
            user: None,
            old_version: None,
            new_version: Some("v2".to_string()),
            strategy: "random".to_string(),
            steps: vec!["generated".to_string()],
            metadata: Default::default(),
        }
    }

    fn uuid_like(timestamp: DateTime<Utc>) -> String {
        format!("{}-{}", timestamp.timestamp(), timestamp.timestamp_subsec_nanos())
    }

    #[test]
    fn sanitizes_hostile_filename_characters() {
        assert_eq!(sanitize("svc/with:bad*chars? \"<>|"), "svc-with-bad-chars--_---");
    }

    #[test]
    fn round_trips_status() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RotationStorage::new(dir.path().to_path_buf());
        let mut status = storage.load_status("db-primary").unwrap();
        assert_eq!(status.status, dsops_domain::RotationState::NeverRotated);
        status.rotation_count = 1;
        storage.save_status(&status).unwrap();
        let reloaded = storage.load_status("db-primary").unwrap();
        assert_eq!(reloaded.rotation_count, 1);
    }

    #[test]
    fn history_since_filters_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RotationStorage::new(dir.path().to_path_buf());
        let old = Utc::now() - chrono::Duration::days(2);
        let recent = Utc::now();
        storage.append_history(&entry("svc", old)).unwrap();
        storage.append_history(&entry("svc", recent)).unwrap();

        let since = Utc::now() - chrono::Duration::days(1);
        let filtered = storage.history_since("svc", since).unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn cleanup_removes_only_old_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RotationStorage::new(dir.path().to_path_buf());
        let old = Utc::now() - chrono::Duration::days(30);
        let recent = Utc::now();
        storage.append_history(&entry("svc", old)).unwrap();
        storage.append_history(&entry("svc", recent)).unwrap();

        let removed = storage.cleanup_old_entries("svc", Utc::now() - chrono::Duration::days(7)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(storage.history_since("svc", old - chrono::Duration::days(1)).unwrap().len(), 1);
    }
}
