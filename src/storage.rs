//! Session record storage.
//!
//! Persistent local storage for completed consultation sessions: one JSON
//! file per record under the configured data directory. Writes happen
//! fire-and-forget after the HTTP response is already fixed, so a storage
//! failure can only ever cost a log line, never a request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// One stored row per completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub notes: String,
    /// Original transcript, stored opaquely.
    pub conversation: serde_json::Value,
    /// Final report, stored opaquely.
    pub report: serde_json::Value,
    pub created_by: String,
    /// RFC 3339 creation time; also the sort key for listings.
    pub created_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable storage for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist one record. Callers treat failures as non-fatal.
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Most recent records created by `user`, newest first, at most `limit`.
    async fn recent_for_user(&self, user: &str, limit: usize)
        -> Result<Vec<SessionRecord>, StoreError>;
}

/// File-backed store: `<root>/<sessionId>.json`, pretty-printed.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    /// Create the store, ensuring the data directory exists.
    pub async fn new(root: PathBuf) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn record_path(&self, session_id: &str) -> PathBuf {
        // Session ids are generated UUIDs, but never trust them as path
        // components.
        let safe: String = session_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.root.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.session_id);
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        debug!("saved session record to {:?}", path);
        Ok(())
    }

    async fn recent_for_user(
        &self,
        user: &str,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<SessionRecord>(&content) {
                Ok(record) if record.created_by == user => records.push(record),
                Ok(_) => {}
                Err(e) => debug!("skipping unreadable record {:?}: {}", path, e),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(session_id: &str, user: &str, created_at: &str) -> SessionRecord {
        SessionRecord {
            session_id: session_id.to_string(),
            notes: String::new(),
            conversation: serde_json::json!(["user: hello"]),
            report: serde_json::json!({"summary": "ok"}),
            created_by: user.to_string(),
            created_at: created_at.to_string(),
        }
    }

    async fn temp_store() -> (tempfile::TempDir, FileSessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().to_path_buf()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let (_dir, store) = temp_store().await;
        store
            .save(&record("s1", "Sam", "2026-01-15T10:00:00+00:00"))
            .await
            .unwrap();

        let records = store.recent_for_user("Sam", 20).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id, "s1");
        assert_eq!(records[0].conversation, serde_json::json!(["user: hello"]));
    }

    #[tokio::test]
    async fn test_listing_filters_by_user_and_sorts_newest_first() {
        let (_dir, store) = temp_store().await;
        store.save(&record("s1", "Sam", "2026-01-15T10:00:00+00:00")).await.unwrap();
        store.save(&record("s2", "Sam", "2026-01-15T12:00:00+00:00")).await.unwrap();
        store.save(&record("s3", "Alex", "2026-01-15T11:00:00+00:00")).await.unwrap();

        let records = store.recent_for_user("Sam", 20).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].session_id, "s2");
        assert_eq!(records[1].session_id, "s1");
    }

    #[tokio::test]
    async fn test_listing_respects_limit() {
        let (_dir, store) = temp_store().await;
        for i in 0..25 {
            store
                .save(&record(
                    &format!("s{}", i),
                    "Sam",
                    &format!("2026-01-15T10:{:02}:00+00:00", i),
                ))
                .await
                .unwrap();
        }

        let records = store.recent_for_user("Sam", 20).await.unwrap();
        assert_eq!(records.len(), 20);
        // Newest (largest minute) first.
        assert_eq!(records[0].session_id, "s24");
    }

    #[tokio::test]
    async fn test_record_path_sanitizes_session_id() {
        let (_dir, store) = temp_store().await;
        let path = store.record_path("../../etc/passwd");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, "etcpasswd.json");
        assert!(path.starts_with(&store.root));
    }

    #[tokio::test]
    async fn test_save_overwrites_same_session() {
        let (_dir, store) = temp_store().await;
        let mut rec = record("s1", "Sam", "2026-01-15T10:00:00+00:00");
        store.save(&rec).await.unwrap();
        rec.notes = "updated".to_string();
        store.save(&rec).await.unwrap();

        let records = store.recent_for_user("Sam", 20).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].notes, "updated");
    }
}
