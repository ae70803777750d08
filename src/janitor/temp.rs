//! Temp-file janitor for orphaned media artifacts
//!
//! Commands that download or transcode media park their intermediate files
//! under a handful of temp directories, and occasionally leak one into the
//! process root. This janitor sweeps the configured temp directories (one
//! subdirectory level deep) plus the root, deleting anything past the TTL.
//! Root-level deletion is gated on a recognized media extension so unrelated
//! project files are never touched.

use crate::config::MaintenanceConfig;
use crate::janitor::is_stale;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Sweeps temp directories and the process root for orphaned files
pub struct TempFileJanitor {
    temp_dirs: Vec<PathBuf>,
    root_dir: PathBuf,
    media_extensions: HashSet<String>,
    max_age: Duration,
}

impl TempFileJanitor {
    pub fn new(config: &MaintenanceConfig) -> Self {
        Self {
            temp_dirs: config.temp_dirs.clone(),
            root_dir: config.root_dir.clone(),
            media_extensions: config.media_extensions.clone(),
            max_age: config.temp_max_age,
        }
    }

    /// Runs one sweep and returns the number of files removed.
    ///
    /// Every error is isolated to the entry (or directory) it occurred on;
    /// this sweep never fails as a whole. Missing directories are skipped
    /// silently.
    pub async fn run(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for dir in &self.temp_dirs {
            removed += self.sweep_temp_dir(dir, now).await;
        }
        removed += self.sweep_root(now).await;

        if removed > 0 {
            info!(removed = removed, "Temp cleanup: removed orphaned files");
        }
        removed
    }

    /// Sweeps one temp directory: direct files, plus the direct file children
    /// of one subdirectory level. Subdirectories themselves are never deleted
    /// and nothing deeper is ever visited.
    async fn sweep_temp_dir(&self, dir: &Path, now: DateTime<Utc>) -> usize {
        let Ok(mut entries) = fs::read_dir(dir).await else {
            return 0;
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => removed += self.sweep_child_files(&path, now).await,
                Ok(ft) if ft.is_file() => removed += self.remove_if_stale(&path, now).await,
                _ => {}
            }
        }
        removed
    }

    /// Deletes stale direct file children of `dir`; no further recursion.
    async fn sweep_child_files(&self, dir: &Path, now: DateTime<Utc>) -> usize {
        let Ok(mut entries) = fs::read_dir(dir).await else {
            return 0;
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if matches!(entry.file_type().await, Ok(ft) if ft.is_file()) {
                removed += self.remove_if_stale(&entry.path(), now).await;
            }
        }
        removed
    }

    /// Non-recursive sweep of the process root, gated on media extensions.
    async fn sweep_root(&self, now: DateTime<Utc>) -> usize {
        let Ok(mut entries) = fs::read_dir(&self.root_dir).await else {
            return 0;
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let recognized = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| self.media_extensions.contains(&ext.to_ascii_lowercase()))
                .unwrap_or(false);
            if !recognized {
                continue;
            }
            if matches!(entry.file_type().await, Ok(ft) if ft.is_file()) {
                removed += self.remove_if_stale(&path, now).await;
            }
        }
        removed
    }

    /// Deletes `path` if it is past the TTL; returns 1 on deletion.
    async fn remove_if_stale(&self, path: &Path, now: DateTime<Utc>) -> usize {
        let mtime = match fs::metadata(path).await.and_then(|meta| meta.modified()) {
            Ok(mtime) => mtime,
            Err(e) => {
                debug!("Skipping {:?}: stat failed: {}", path, e);
                return 0;
            }
        };
        if !is_stale(now, mtime, self.max_age) {
            return 0;
        }
        match fs::remove_file(path).await {
            Ok(()) => 1,
            Err(e) => {
                debug!("Failed to remove {:?}: {}", path, e);
                0
            }
        }
    }
}
