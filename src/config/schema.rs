use chrono::Duration;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Maximum age of evictable session-key files (7 days)
pub const SESSION_MAX_AGE_DAYS: i64 = 7;

/// Maximum age of orphaned temp/media files (1 hour)
pub const TEMP_MAX_AGE_HOURS: i64 = 1;

/// On-disk store size above which capping kicks in (10 MB)
pub const MAX_STORE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum number of chat records kept in the store
pub const MAX_CHATS: usize = 500;

/// Maximum number of contact records kept in the store
pub const MAX_CONTACTS: usize = 2000;

/// Maximum message-history length kept per chat
pub const MESSAGES_PER_CHAT: usize = 10;

/// Configuration for one startup maintenance run.
///
/// Every age, cap and path the janitors consult lives here as a named field;
/// the janitors themselves carry no magic numbers. Tests construct this
/// directly with synthetic values.
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Directory holding protocol key material (non-recursive scan)
    pub session_dir: PathBuf,
    /// Temp directories swept one subdirectory level deep
    pub temp_dirs: Vec<PathBuf>,
    /// Process root, scanned non-recursively for stray media files
    pub root_dir: PathBuf,
    /// Path of the consolidated JSON store document
    pub store_path: PathBuf,
    pub session_max_age: Duration,
    pub temp_max_age: Duration,
    pub max_store_size_bytes: u64,
    pub max_chats: usize,
    pub max_contacts: usize,
    pub messages_per_chat: usize,
    /// Session filenames never deleted regardless of age (exact match)
    pub protected_session_files: HashSet<String>,
    /// Lowercase extensions (no dot) eligible for root-level deletion
    pub media_extensions: HashSet<String>,
}

impl MaintenanceConfig {
    /// Builds the conventional layout rooted at `base_dir`: `session/` for key
    /// material, the four temp directories the agent writes into, and
    /// `store.json` for the conversational state document.
    pub fn for_base_dir(base_dir: &Path) -> Self {
        Self {
            session_dir: base_dir.join("session"),
            temp_dirs: vec![
                base_dir.join("temp"),
                base_dir.join("tmp"),
                base_dir.join("commands").join("temp"),
                base_dir.join("assets").join("temp"),
            ],
            root_dir: base_dir.to_path_buf(),
            store_path: base_dir.join("store.json"),
            session_max_age: Duration::days(SESSION_MAX_AGE_DAYS),
            temp_max_age: Duration::hours(TEMP_MAX_AGE_HOURS),
            max_store_size_bytes: MAX_STORE_SIZE_BYTES,
            max_chats: MAX_CHATS,
            max_contacts: MAX_CONTACTS,
            messages_per_chat: MESSAGES_PER_CHAT,
            protected_session_files: default_protected_files(),
            media_extensions: default_media_extensions(),
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self::for_base_dir(Path::new("."))
    }
}

fn default_protected_files() -> HashSet<String> {
    ["creds.json"].into_iter().map(String::from).collect()
}

fn default_media_extensions() -> HashSet<String> {
    [
        "jpg", "jpeg", "png", "gif", "mp4", "mp3", "opus", "webp", "webm", "ogg", "wav", "pdf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
