// ABOUTME: Chat history database operations for the invoice assistant
// ABOUTME: Stores conversation turns and serves recent context windows

use super::users::{parse_timestamp, parse_uuid};
use super::Database;
use crate::errors::AppResult;
use crate::models::ChatMessage;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

impl Database {
    /// Create the chat_history table
    pub(super) async fn migrate_chat(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS chat_history (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chat_history_user_id ON chat_history(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Append one conversation turn
    pub async fn add_chat_message(
        &self,
        user_id: Uuid,
        role: &str,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> AppResult<ChatMessage> {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            user_id,
            role: role.to_owned(),
            content: content.to_owned(),
            metadata: metadata.cloned(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r"
            INSERT INTO chat_history (id, user_id, role, content, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(message.id.to_string())
        .bind(message.user_id.to_string())
        .bind(&message.role)
        .bind(&message.content)
        .bind(message.metadata.as_ref().map(serde_json::Value::to_string))
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(message)
    }

    /// Chronological history, oldest first
    pub async fn get_chat_history(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, user_id, role, content, metadata, created_at
             FROM chat_history WHERE user_id = ?1
             ORDER BY created_at ASC LIMIT ?2",
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(chat_message_from_row).collect()
    }

    /// The newest `limit` turns, returned oldest-first for prompt replay
    pub async fn get_recent_chat_messages(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, user_id, role, content, metadata, created_at
             FROM chat_history WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = rows
            .iter()
            .map(chat_message_from_row)
            .collect::<AppResult<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// Delete a user's entire conversation history
    pub async fn clear_chat_history(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM chat_history WHERE user_id = ?1")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn chat_message_from_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<ChatMessage> {
    let metadata = row
        .get::<Option<String>, _>("metadata")
        .and_then(|raw| serde_json::from_str(&raw).ok());

    Ok(ChatMessage {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
        role: row.get("role"),
        content: row.get("content"),
        metadata,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}
