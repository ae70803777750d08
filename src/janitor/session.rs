//! Session-key janitor for TTL-based eviction of protocol key material
//!
//! The protocol layer accumulates per-peer key files (pre-keys, sender keys,
//! sessions, device lists) that go stale once rotated. This janitor sweeps
//! the session directory once at startup and deletes evictable key files
//! older than the configured age. Credentials and app-state sync files are
//! never touched, nor is anything it does not recognize.

use crate::config::MaintenanceConfig;
use crate::janitor::is_stale;
use crate::utils::MaintenanceError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

/// Classification of a file in the session directory, derived purely from
/// its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFileKind {
    /// Exact match against the protected filename set (e.g. `creds.json`)
    Protected,
    /// `app-state-sync-key-*`
    SyncKey,
    /// `app-state-sync-version-*`
    SyncVersion,
    /// `pre-key-*`
    PreKey,
    /// `sender-key-*`
    SenderKey,
    /// `session-*`
    Session,
    /// `device-list-*`
    DeviceList,
    /// Anything else; never touched
    Unknown,
}

impl SessionFileKind {
    /// Classifies a filename. Protected exact matches win over prefix rules.
    pub fn classify(name: &str, protected: &HashSet<String>) -> Self {
        if protected.contains(name) {
            Self::Protected
        } else if name.starts_with("app-state-sync-key-") {
            Self::SyncKey
        } else if name.starts_with("app-state-sync-version-") {
            Self::SyncVersion
        } else if name.starts_with("pre-key-") {
            Self::PreKey
        } else if name.starts_with("sender-key-") {
            Self::SenderKey
        } else if name.starts_with("session-") {
            Self::Session
        } else if name.starts_with("device-list-") {
            Self::DeviceList
        } else {
            Self::Unknown
        }
    }

    /// Whether files of this kind may be deleted once stale.
    pub fn is_evictable(&self) -> bool {
        matches!(
            self,
            Self::PreKey | Self::SenderKey | Self::Session | Self::DeviceList
        )
    }
}

/// Sweeps the session directory for expired key files
pub struct SessionKeyJanitor {
    session_dir: PathBuf,
    max_age: Duration,
    protected: HashSet<String>,
}

impl SessionKeyJanitor {
    pub fn new(config: &MaintenanceConfig) -> Self {
        Self {
            session_dir: config.session_dir.clone(),
            max_age: config.session_max_age,
            protected: config.protected_session_files.clone(),
        }
    }

    /// Runs one sweep and returns the number of files removed.
    ///
    /// A missing session directory is a legitimate no-op. Per-file stat or
    /// unlink failures are swallowed and the sweep continues; only a failure
    /// to list the directory itself surfaces as an error.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<usize, MaintenanceError> {
        let mut entries = match fs::read_dir(&self.session_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(MaintenanceError::io(&self.session_dir, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MaintenanceError::io(&self.session_dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !SessionFileKind::classify(name, &self.protected).is_evictable() {
                continue;
            }

            let path = entry.path();
            let mtime = match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => match meta.modified() {
                    Ok(mtime) => mtime,
                    Err(e) => {
                        debug!("Skipping {:?}: no mtime available: {}", path, e);
                        continue;
                    }
                },
                Ok(_) => continue,
                Err(e) => {
                    debug!("Skipping {:?}: stat failed: {}", path, e);
                    continue;
                }
            };

            if is_stale(now, mtime, self.max_age) {
                match fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => debug!("Failed to remove {:?}: {}", path, e),
                }
            }
        }

        if removed > 0 {
            info!(
                removed = removed,
                "Session cleanup: removed expired key files"
            );
        }
        Ok(removed)
    }
}
