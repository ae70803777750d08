//! Centralized error types for storekeeper
//!
//! Library code returns structured errors via `thiserror`; the binary uses
//! `anyhow` for context. Per-entry failures inside a sweep never surface
//! here, only janitor-level ones the orchestrator catches and logs.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors a janitor run can surface to the orchestrator
#[derive(Error, Debug)]
pub enum MaintenanceError {
    /// IO errors with path context
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store document could not be parsed; the file is left untouched
    #[error("Malformed store document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Trimmed store document could not be re-serialized
    #[error("Failed to serialize store document {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl MaintenanceError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error for the store document at `path`
    pub fn parse(path: &Path, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a serialization error for the store document at `path`
    pub fn serialize(path: &Path, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.to_path_buf(),
            source,
        }
    }
}
