//! SQLite turn store.
//!
//! Uses a single SQLite database file with two tables:
//! - `turns` — one row per completed exchange, keyed by `(session_id, turn_number)`
//! - `session_contexts` — page content and attachments, keyed by session
//!
//! Attachments and their summaries are stored as JSON text columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tabmate_core::error::StoreError;
use tabmate_core::memory::{ConversationTurn, SessionContext, TurnStore};
use tabmate_core::message::{Attachment, SessionId};
use tracing::{debug, info, warn};

use crate::{require_session, validate_turn};

/// A persistent SQLite turn store.
pub struct SqliteTurnStore {
    pool: SqlitePool,
}

impl SqliteTurnStore {
    /// Open (or create) a database.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite turn store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                session_id          TEXT NOT NULL,
                turn_number         INTEGER NOT NULL,
                user_message        TEXT NOT NULL,
                assistant_response  TEXT NOT NULL,
                timestamp           TEXT NOT NULL,
                tokens              INTEGER NOT NULL DEFAULT 0,
                summary             TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (session_id, turn_number)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("turns table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_contexts (
                session_id            TEXT PRIMARY KEY,
                page_content          TEXT,
                page_summary          TEXT,
                attachments           TEXT NOT NULL DEFAULT '[]',
                attachment_summaries  TEXT NOT NULL DEFAULT '[]',
                timestamp             TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("session_contexts table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_turns_timestamp ON turns(timestamp DESC)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("timestamp index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_turn(row: &SqliteRow) -> Result<ConversationTurn, StoreError> {
        let session_id: String = column(row, "session_id")?;
        let turn_number: i64 = column(row, "turn_number")?;
        let timestamp: String = column(row, "timestamp")?;
        let tokens: i64 = column(row, "tokens")?;

        Ok(ConversationTurn {
            session_id: SessionId(session_id),
            turn_number: u32::try_from(turn_number).map_err(|e| {
                StoreError::QueryFailed(format!("turn_number column holds {turn_number}: {e}"))
            })?,
            user_message: column(row, "user_message")?,
            assistant_response: column(row, "assistant_response")?,
            timestamp: parse_timestamp(&timestamp),
            tokens: usize::try_from(tokens)
                .map_err(|e| StoreError::QueryFailed(format!("tokens column holds {tokens}: {e}")))?,
            summary: column(row, "summary")?,
        })
    }

    fn row_to_context(row: &SqliteRow) -> Result<SessionContext, StoreError> {
        let session_id: String = column(row, "session_id")?;
        let attachments_json: String = column(row, "attachments")?;
        let summaries_json: String = column(row, "attachment_summaries")?;
        let timestamp: String = column(row, "timestamp")?;

        let attachments: Vec<Attachment> =
            serde_json::from_str(&attachments_json).unwrap_or_else(|e| {
                warn!(error = %e, "Unreadable attachments column, treating as empty");
                Vec::new()
            });
        let attachment_summaries: Vec<String> =
            serde_json::from_str(&summaries_json).unwrap_or_default();

        Ok(SessionContext {
            session_id: SessionId(session_id),
            page_content: column(row, "page_content")?,
            page_summary: column(row, "page_summary")?,
            attachments,
            attachment_summaries,
            timestamp: parse_timestamp(&timestamp),
        })
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl TurnStore for SqliteTurnStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn store_turn(&self, turn: ConversationTurn) -> Result<(), StoreError> {
        validate_turn(&turn)?;

        sqlx::query(
            r#"
            INSERT INTO turns (session_id, turn_number, user_message, assistant_response, timestamp, tokens, summary)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(session_id, turn_number) DO UPDATE SET
                user_message = excluded.user_message,
                assistant_response = excluded.assistant_response,
                timestamp = excluded.timestamp,
                tokens = excluded.tokens,
                summary = excluded.summary
            "#,
        )
        .bind(turn.session_id.as_str())
        .bind(i64::from(turn.turn_number))
        .bind(&turn.user_message)
        .bind(&turn.assistant_response)
        .bind(turn.timestamp.to_rfc3339())
        .bind(i64::try_from(turn.tokens).unwrap_or(i64::MAX))
        .bind(&turn.summary)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT turn failed: {e}")))?;

        debug!(session = %turn.session_id, turn = turn.turn_number, "Stored turn");
        Ok(())
    }

    async fn recent_turns(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM turns WHERE session_id = ?1 ORDER BY turn_number DESC LIMIT ?2",
        )
        .bind(session_id.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("recent turns: {e}")))?;

        let mut turns = rows
            .iter()
            .map(Self::row_to_turn)
            .collect::<Result<Vec<_>, _>>()?;
        turns.reverse();
        Ok(turns)
    }

    async fn turn_summaries(
        &self,
        session_id: &SessionId,
        skip_recent: usize,
    ) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT summary FROM turns
            WHERE session_id = ?1 AND turn_number NOT IN (
                SELECT turn_number FROM turns
                WHERE session_id = ?1
                ORDER BY turn_number DESC
                LIMIT ?2
            )
            ORDER BY turn_number ASC
            "#,
        )
        .bind(session_id.as_str())
        .bind(i64::try_from(skip_recent).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("turn summaries: {e}")))?;

        rows.iter().map(|r| column(r, "summary")).collect()
    }

    async fn turn_count(&self, session_id: &SessionId) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM turns WHERE session_id = ?1")
            .bind(session_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = column(&row, "cnt")?;
        Ok(usize::try_from(cnt).unwrap_or_default())
    }

    async fn put_context(&self, context: SessionContext) -> Result<(), StoreError> {
        require_session(&context.session_id)?;
        let attachments = serde_json::to_string(&context.attachments)
            .map_err(|e| StoreError::Storage(format!("Attachments serialization: {e}")))?;
        let summaries = serde_json::to_string(&context.attachment_summaries)
            .map_err(|e| StoreError::Storage(format!("Summaries serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO session_contexts (session_id, page_content, page_summary, attachments, attachment_summaries, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(session_id) DO UPDATE SET
                page_content = excluded.page_content,
                page_summary = excluded.page_summary,
                attachments = excluded.attachments,
                attachment_summaries = excluded.attachment_summaries,
                timestamp = excluded.timestamp
            "#,
        )
        .bind(context.session_id.as_str())
        .bind(&context.page_content)
        .bind(&context.page_summary)
        .bind(&attachments)
        .bind(&summaries)
        .bind(context.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT context failed: {e}")))?;

        debug!(session = %context.session_id, "Stored session context");
        Ok(())
    }

    async fn context(&self, session_id: &SessionId) -> Result<Option<SessionContext>, StoreError> {
        let row = sqlx::query("SELECT * FROM session_contexts WHERE session_id = ?1")
            .bind(session_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET context: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_context(r)?)),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        let turns = sqlx::query("DELETE FROM turns WHERE session_id = ?1")
            .bind(session_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE turns failed: {e}")))?;
        let contexts = sqlx::query("DELETE FROM session_contexts WHERE session_id = ?1")
            .bind(session_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE context failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        Ok(turns.rows_affected() + contexts.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        for table in ["turns", "session_contexts"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Storage(format!("CLEAR {table} failed: {e}")))?;
        }
        Ok(())
    }
}
