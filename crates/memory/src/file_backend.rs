//! File-based turn store — persistent JSON-lines storage.
//!
//! Each line is one record, tagged by kind:
//!
//! ```text
//! {"record":"turn","session_id":"…","turn_number":1,…}
//! {"record":"context","session_id":"…","page_summary":"…",…}
//! ```
//!
//! Storage location: `~/.tabmate/memory/turns.jsonl`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabmate_core::error::StoreError;
use tabmate_core::memory::{ConversationTurn, SessionContext, TurnStore};
use tabmate_core::message::SessionId;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::table::TurnTable;
use crate::{require_session, validate_turn};

/// One line of the JSONL file.
#[derive(Debug, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Turn(ConversationTurn),
    Context(SessionContext),
}

/// A file-backed turn store.
///
/// Records are loaded into memory on creation and the whole file is
/// rewritten on every mutation.
pub struct FileTurnStore {
    path: PathBuf,
    table: Arc<RwLock<TurnTable>>,
}

impl FileTurnStore {
    /// Open a store at the given path.
    ///
    /// A missing file starts empty; it is created on first write.
    pub fn new(path: PathBuf) -> Self {
        let table = Self::load_from_disk(&path);
        debug!(path = %path.display(), "File turn store loaded");
        Self {
            path,
            table: Arc::new(RwLock::new(table)),
        }
    }

    /// Default path: `~/.tabmate/memory/turns.jsonl`
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".tabmate")
            .join("memory")
            .join("turns.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> TurnTable {
        let mut table = TurnTable::default();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return table,
        };

        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(line) {
                Ok(Record::Turn(turn)) => table.insert_turn(turn),
                Ok(Record::Context(context)) => table.put_context(context),
                Err(e) => warn!(line = lineno + 1, error = %e, "Skipping corrupted turn record"),
            }
        }
        table
    }

    /// Write every record to disk.
    async fn flush(&self) -> Result<(), StoreError> {
        let table = self.table.read().await;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for turn in table.turns() {
            push_record(&mut content, &RecordRef::Turn(turn))?;
        }
        for context in table.contexts() {
            push_record(&mut content, &RecordRef::Context(context))?;
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| StoreError::Storage(format!("Failed to write memory file: {e}")))?;

        Ok(())
    }
}

/// Borrowed twin of [`Record`] so flushing does not clone the table.
#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum RecordRef<'a> {
    Turn(&'a ConversationTurn),
    Context(&'a SessionContext),
}

fn push_record(out: &mut String, record: &RecordRef<'_>) -> Result<(), StoreError> {
    let line = serde_json::to_string(record)
        .map_err(|e| StoreError::Storage(format!("Failed to serialize record: {e}")))?;
    out.push_str(&line);
    out.push('\n');
    Ok(())
}

#[async_trait]
impl TurnStore for FileTurnStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn store_turn(&self, turn: ConversationTurn) -> Result<(), StoreError> {
        validate_turn(&turn)?;
        self.table.write().await.insert_turn(turn);
        self.flush().await
    }

    async fn recent_turns(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        Ok(self.table.read().await.recent(session_id, limit))
    }

    async fn turn_summaries(
        &self,
        session_id: &SessionId,
        skip_recent: usize,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self.table.read().await.summaries(session_id, skip_recent))
    }

    async fn turn_count(&self, session_id: &SessionId) -> Result<usize, StoreError> {
        Ok(self.table.read().await.count(session_id))
    }

    async fn put_context(&self, context: SessionContext) -> Result<(), StoreError> {
        require_session(&context.session_id)?;
        self.table.write().await.put_context(context);
        self.flush().await
    }

    async fn context(&self, session_id: &SessionId) -> Result<Option<SessionContext>, StoreError> {
        Ok(self.table.read().await.context(session_id))
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<bool, StoreError> {
        let removed = self.table.write().await.remove_session(session_id);
        if removed {
            self.flush().await?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.table.write().await.clear();
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io::Write;
    use tabmate_core::message::Attachment;
    use tempfile::NamedTempFile;

    fn turn(n: u32) -> ConversationTurn {
        ConversationTurn {
            session_id: SessionId::from("s1"),
            turn_number: n,
            user_message: format!("question {n}"),
            assistant_response: format!("answer {n}"),
            timestamp: Utc::now(),
            tokens: 5,
            summary: format!("summary {n}"),
        }
    }

    fn temp_path() -> PathBuf {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);
        path
    }

    #[tokio::test]
    async fn turns_persist_across_reopen() {
        let path = temp_path();
        let store = FileTurnStore::new(path.clone());
        store.store_turn(turn(1)).await.unwrap();
        store.store_turn(turn(2)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(r#""record":"turn""#));
        assert!(content.contains("question 2"));

        let reopened = FileTurnStore::new(path);
        let sid = SessionId::from("s1");
        let turns = reopened.recent_turns(&sid, 5).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].turn_number, 1);
        assert_eq!(turns[1].user_message, "question 2");
    }

    #[tokio::test]
    async fn context_persists_across_reopen() {
        let path = temp_path();
        let store = FileTurnStore::new(path.clone());
        let sid = SessionId::from("s1");
        let mut ctx = SessionContext::empty(sid.clone());
        ctx.page_content = Some("Crabs are decapods.".into());
        ctx.attachments.push(Attachment::text("notes.txt", "claws"));
        ctx.attachment_summaries.push("notes.txt: claws".into());
        store.put_context(ctx.clone()).await.unwrap();

        let reopened = FileTurnStore::new(path);
        assert_eq!(reopened.context(&sid).await.unwrap(), Some(ctx));
    }

    #[tokio::test]
    async fn delete_session_persists() {
        let path = temp_path();
        let store = FileTurnStore::new(path.clone());
        let sid = SessionId::from("s1");
        store.store_turn(turn(1)).await.unwrap();
        store.put_context(SessionContext::empty(sid.clone())).await.unwrap();
        assert!(store.delete_session(&sid).await.unwrap());

        let reopened = FileTurnStore::new(path);
        assert_eq!(reopened.turn_count(&sid).await.unwrap(), 0);
        assert!(reopened.context(&sid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_persists() {
        let path = temp_path();
        let store = FileTurnStore::new(path.clone());
        store.store_turn(turn(1)).await.unwrap();
        store.clear().await.unwrap();

        let reopened = FileTurnStore::new(path);
        assert_eq!(reopened.turn_count(&SessionId::from("s1")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn handles_missing_file_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTurnStore::new(dir.path().join("nested").join("turns.jsonl"));
        assert_eq!(store.turn_count(&SessionId::from("s1")).await.unwrap(), 0);
        // Parent directories are created on first write
        store.store_turn(turn(1)).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn handles_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            r#"{{"record":"turn","session_id":"s1","turn_number":1,"user_message":"hi","assistant_response":"hello","timestamp":"2026-01-01T00:00:00Z","tokens":3,"summary":"User: hi | Assistant: hello"}}"#
        )
        .unwrap();
        writeln!(tmp, "this is not json").unwrap();
        writeln!(tmp, r#"{{"record":"unknown"}}"#).unwrap();
        writeln!(
            tmp,
            r#"{{"record":"context","session_id":"s1","page_summary":"a page","timestamp":"2026-01-01T00:00:00Z"}}"#
        )
        .unwrap();
        let store = FileTurnStore::new(tmp.path().to_path_buf());

        let sid = SessionId::from("s1");
        assert_eq!(store.turn_count(&sid).await.unwrap(), 1);
        let ctx = store.context(&sid).await.unwrap().unwrap();
        assert_eq!(ctx.page_summary.as_deref(), Some("a page"));
        assert!(ctx.attachments.is_empty());
    }
}
