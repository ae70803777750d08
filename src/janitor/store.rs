//! Size cap for the consolidated conversational-state document
//!
//! The messaging layer persists chats, contacts and per-chat message history
//! into one JSON document that only ever grows. Once its on-disk size passes
//! the configured cap, this janitor evicts the least-recently-active chats
//! and contacts and trims each message history to a short tail, then rewrites
//! the file atomically. Under the cap the file is not even parsed, so the
//! common startup path costs a single stat.

use crate::config::MaintenanceConfig;
use crate::utils::MaintenanceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

const CONVERSATION_TIMESTAMP: &str = "conversationTimestamp";
const LAST_MESSAGE_RECV_TIMESTAMP: &str = "lastMessageRecvTimestamp";
const LAST_SEEN: &str = "lastSeen";

/// The persisted store document.
///
/// Records are kept as raw JSON values and unknown top-level keys ride along
/// in `extra`, so a rewrite preserves everything the messaging layer wrote
/// except the evicted entries.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub chats: BTreeMap<String, Value>,
    #[serde(default)]
    pub contacts: BTreeMap<String, Value>,
    /// Per-chat message history, insertion order chronological
    #[serde(default)]
    pub messages: BTreeMap<String, Vec<Value>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Outcome of one capping run
#[derive(Debug, Clone, Copy)]
pub struct CapOutcome {
    /// Whether the document was rewritten
    pub trimmed: bool,
    pub before_bytes: u64,
    pub after_bytes: u64,
}

impl CapOutcome {
    fn untouched(size: u64) -> Self {
        Self {
            trimmed: false,
            before_bytes: size,
            after_bytes: size,
        }
    }
}

/// Caps the store document to the configured size and entry limits
pub struct StoreCapper {
    store_path: PathBuf,
    max_size_bytes: u64,
    max_chats: usize,
    max_contacts: usize,
    messages_per_chat: usize,
}

impl StoreCapper {
    pub fn new(config: &MaintenanceConfig) -> Self {
        Self {
            store_path: config.store_path.clone(),
            max_size_bytes: config.max_store_size_bytes,
            max_chats: config.max_chats,
            max_contacts: config.max_contacts,
            messages_per_chat: config.messages_per_chat,
        }
    }

    /// Runs one capping pass.
    ///
    /// An absent file and an under-cap file are both no-ops. A parse failure
    /// aborts the run with the file untouched; truncating on uncertain state
    /// is never an option. The rewrite goes through a sibling temp file and
    /// an atomic rename, so a crash mid-write cannot corrupt the store.
    pub async fn run(&self) -> Result<CapOutcome, MaintenanceError> {
        let before_bytes = match fs::metadata(&self.store_path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CapOutcome::untouched(0));
            }
            Err(e) => return Err(MaintenanceError::io(&self.store_path, e)),
        };
        if before_bytes <= self.max_size_bytes {
            return Ok(CapOutcome::untouched(before_bytes));
        }

        let raw = fs::read_to_string(&self.store_path)
            .await
            .map_err(|e| MaintenanceError::io(&self.store_path, e))?;
        let mut doc: StoreDocument =
            serde_json::from_str(&raw).map_err(|e| MaintenanceError::parse(&self.store_path, e))?;

        self.trim(&mut doc);

        let json = serde_json::to_string(&doc)
            .map_err(|e| MaintenanceError::serialize(&self.store_path, e))?;
        self.replace_store(json.as_bytes()).await?;

        let after_bytes = fs::metadata(&self.store_path)
            .await
            .map(|meta| meta.len())
            .unwrap_or(json.len() as u64);

        info!(
            "Store trimmed: {:.1}MB -> {:.1}MB",
            mb(before_bytes),
            mb(after_bytes)
        );
        Ok(CapOutcome {
            trimmed: true,
            before_bytes,
            after_bytes,
        })
    }

    /// Applies the three in-memory eviction rules.
    fn trim(&self, doc: &mut StoreDocument) {
        let evicted_chats = cap_by_activity(
            &mut doc.chats,
            self.max_chats,
            [CONVERSATION_TIMESTAMP, LAST_MESSAGE_RECV_TIMESTAMP],
        );
        // Evicting a chat also drops its message history
        for id in &evicted_chats {
            doc.messages.remove(id);
        }

        cap_by_activity(
            &mut doc.contacts,
            self.max_contacts,
            [CONVERSATION_TIMESTAMP, LAST_SEEN],
        );

        for history in doc.messages.values_mut() {
            if history.len() > self.messages_per_chat {
                let surplus = history.len() - self.messages_per_chat;
                history.drain(..surplus);
            }
        }
    }

    /// Writes the new document next to the store and renames it into place.
    async fn replace_store(&self, bytes: &[u8]) -> Result<(), MaintenanceError> {
        let mut tmp = self.store_path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, bytes)
            .await
            .map_err(|e| MaintenanceError::io(&tmp, e))?;
        fs::rename(&tmp, &self.store_path)
            .await
            .map_err(|e| MaintenanceError::io(&self.store_path, e))
    }
}

/// Ranks entries by activity timestamp (most recent first, id ascending on
/// ties), keeps the top `cap`, removes the rest and returns their ids.
fn cap_by_activity(
    records: &mut BTreeMap<String, Value>,
    cap: usize,
    timestamp_fields: [&str; 2],
) -> Vec<String> {
    if records.len() <= cap {
        return Vec::new();
    }

    let mut ranked: Vec<(&String, i64)> = records
        .iter()
        .map(|(id, record)| (id, activity_timestamp(record, timestamp_fields)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let evicted: Vec<String> = ranked[cap..].iter().map(|(id, _)| (*id).clone()).collect();
    for id in &evicted {
        records.remove(id);
    }
    evicted
}

/// Reads the first usable timestamp field from a record. Missing, zero or
/// non-numeric values fall through to the next field, and to 0 when none
/// remain, so inactive records rank last.
fn activity_timestamp(record: &Value, fields: [&str; 2]) -> i64 {
    for field in fields {
        let ts = match record.get(field) {
            Some(value) => value.as_i64().or_else(|| value.as_f64().map(|f| f as i64)),
            None => None,
        };
        match ts {
            Some(ts) if ts != 0 => return ts,
            _ => {}
        }
    }
    0
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    fn capper(path: &Path, max_size_bytes: u64) -> StoreCapper {
        StoreCapper {
            store_path: path.to_path_buf(),
            max_size_bytes,
            max_chats: 500,
            max_contacts: 2000,
            messages_per_chat: 10,
        }
    }

    fn chat(ts: i64) -> Value {
        json!({ "name": "chat", "conversationTimestamp": ts })
    }

    #[tokio::test]
    async fn test_absent_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let outcome = capper(&dir.path().join("store.json"), 0).run().await.unwrap();
        assert!(!outcome.trimmed);
        assert_eq!(outcome.before_bytes, 0);
    }

    #[tokio::test]
    async fn test_under_cap_file_left_unread() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        // Not even valid JSON: under the cap the document must not be parsed
        fs::write(&path, b"definitely not json").await.unwrap();

        let outcome = capper(&path, 1024).run().await.unwrap();
        assert!(!outcome.trimmed);
        assert_eq!(outcome.before_bytes, outcome.after_bytes);
        assert_eq!(fs::read(&path).await.unwrap(), b"definitely not json");
    }

    #[tokio::test]
    async fn test_chat_eviction_keeps_most_recent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let mut doc = StoreDocument::default();
        for i in 0..600 {
            let id = format!("chat-{i:04}");
            doc.chats.insert(id.clone(), chat(i));
            doc.messages.insert(id, vec![json!({"text": "hi"})]);
        }
        fs::write(&path, serde_json::to_string(&doc).unwrap())
            .await
            .unwrap();

        let outcome = capper(&path, 0).run().await.unwrap();
        assert!(outcome.trimmed);

        let trimmed: StoreDocument =
            serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(trimmed.chats.len(), 500);
        // The 100 least recently active chats are gone, histories included
        assert!(!trimmed.chats.contains_key("chat-0099"));
        assert!(!trimmed.messages.contains_key("chat-0099"));
        assert!(trimmed.chats.contains_key("chat-0100"));
        assert!(trimmed.messages.contains_key("chat-0100"));
        assert!(trimmed.chats.contains_key("chat-0599"));
        assert_eq!(trimmed.messages.len(), 500);
    }

    #[tokio::test]
    async fn test_chat_eviction_tie_break_by_id() {
        let mut chats: BTreeMap<String, Value> = BTreeMap::new();
        for id in ["delta", "alpha", "charlie", "bravo"] {
            chats.insert(id.to_string(), chat(1000));
        }

        let evicted = cap_by_activity(
            &mut chats,
            2,
            [CONVERSATION_TIMESTAMP, LAST_MESSAGE_RECV_TIMESTAMP],
        );

        // Equal timestamps: ids ascending win
        assert!(chats.contains_key("alpha"));
        assert!(chats.contains_key("bravo"));
        assert_eq!(evicted, vec!["charlie".to_string(), "delta".to_string()]);
    }

    #[test]
    fn test_activity_timestamp_fallback() {
        let fields = [CONVERSATION_TIMESTAMP, LAST_MESSAGE_RECV_TIMESTAMP];
        assert_eq!(
            activity_timestamp(&json!({"conversationTimestamp": 42}), fields),
            42
        );
        // Zero counts as no activity, falls through
        assert_eq!(
            activity_timestamp(
                &json!({"conversationTimestamp": 0, "lastMessageRecvTimestamp": 7}),
                fields
            ),
            7
        );
        assert_eq!(
            activity_timestamp(&json!({"lastMessageRecvTimestamp": 1700000000.5}), fields),
            1700000000
        );
        assert_eq!(activity_timestamp(&json!({"name": "x"}), fields), 0);
        assert_eq!(
            activity_timestamp(&json!({"conversationTimestamp": "soon"}), fields),
            0
        );
    }

    #[tokio::test]
    async fn test_contact_eviction_uses_last_seen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let mut doc = StoreDocument::default();
        for i in 0..30 {
            doc.contacts
                .insert(format!("contact-{i:02}"), json!({ "lastSeen": i }));
        }
        fs::write(&path, serde_json::to_string(&doc).unwrap())
            .await
            .unwrap();

        let mut capper = capper(&path, 0);
        capper.max_contacts = 20;
        capper.run().await.unwrap();

        let trimmed: StoreDocument =
            serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(trimmed.contacts.len(), 20);
        assert!(!trimmed.contacts.contains_key("contact-09"));
        assert!(trimmed.contacts.contains_key("contact-10"));
        assert!(trimmed.contacts.contains_key("contact-29"));
    }

    #[tokio::test]
    async fn test_message_history_trimmed_to_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let mut doc = StoreDocument::default();
        doc.chats.insert("chat-a".to_string(), chat(1));
        doc.messages.insert(
            "chat-a".to_string(),
            (0..15).map(|i| json!({ "seq": i })).collect(),
        );
        fs::write(&path, serde_json::to_string(&doc).unwrap())
            .await
            .unwrap();

        capper(&path, 0).run().await.unwrap();

        let trimmed: StoreDocument =
            serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        let history = &trimmed.messages["chat-a"];
        assert_eq!(history.len(), 10);
        // The chronological tail survives, original order intact
        let seqs: Vec<i64> = history.iter().map(|m| m["seq"].as_i64().unwrap()).collect();
        assert_eq!(seqs, (5..15).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_malformed_document_left_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"{ \"chats\": [broken").await.unwrap();

        let err = capper(&path, 0).run().await.unwrap_err();
        assert!(matches!(err, MaintenanceError::Parse { .. }));
        assert_eq!(fs::read(&path).await.unwrap(), b"{ \"chats\": [broken");
        // No temp file left behind either
        assert!(!dir.path().join("store.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_unknown_fields_survive_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let raw = json!({
            "chats": { "chat-a": { "conversationTimestamp": 5, "unreadCount": 3 } },
            "contacts": {},
            "messages": {},
            "labels": { "1": "work" }
        });
        fs::write(&path, serde_json::to_string(&raw).unwrap())
            .await
            .unwrap();

        capper(&path, 0).run().await.unwrap();

        let rewritten: Value =
            serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(rewritten["labels"]["1"], "work");
        assert_eq!(rewritten["chats"]["chat-a"]["unreadCount"], 3);
    }

    #[tokio::test]
    async fn test_second_run_is_noop_after_trim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let mut doc = StoreDocument::default();
        for i in 0..50 {
            // Padding makes the document comfortably exceed the 4 KB cap
            doc.chats.insert(
                format!("chat-{i:02}"),
                json!({ "conversationTimestamp": i, "note": "x".repeat(200) }),
            );
        }
        fs::write(&path, serde_json::to_string(&doc).unwrap())
            .await
            .unwrap();

        let mut capper = capper(&path, 4 * 1024);
        capper.max_chats = 5;

        let first = capper.run().await.unwrap();
        assert!(first.trimmed);
        assert!(first.after_bytes < first.before_bytes);
        assert!(first.after_bytes <= 4 * 1024);

        let bytes_after_first = fs::read(&path).await.unwrap();
        let second = capper.run().await.unwrap();
        assert!(!second.trimmed);
        assert_eq!(fs::read(&path).await.unwrap(), bytes_after_first);
    }

    #[tokio::test]
    async fn test_no_temp_file_left_after_success() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let mut doc = StoreDocument::default();
        doc.chats.insert("chat-a".to_string(), chat(1));
        fs::write(&path, serde_json::to_string(&doc).unwrap())
            .await
            .unwrap();

        capper(&path, 0).run().await.unwrap();
        assert!(!dir.path().join("store.json.tmp").exists());
        assert!(path.exists());
    }
}
