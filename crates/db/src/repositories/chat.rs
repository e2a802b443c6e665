use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use sourcely_core::domain::chat::{ChatExchange, ChatId, NewChatExchange};

use super::{ChatHistoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlChatHistoryRepository {
    pool: DbPool,
}

impl SqlChatHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Fixed-width UTC timestamps keep lexical and chronological order identical.
fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_exchange(row: &sqlx::sqlite::SqliteRow) -> Result<ChatExchange, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let timestamp_str: String = row.try_get("timestamp").map_err(decode)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map_err(|e| RepositoryError::Decode(format!("timestamp: {e}")))?
        .with_timezone(&Utc);

    Ok(ChatExchange {
        id: row.try_get("id").map_err(decode)?,
        chat_id: ChatId(row.try_get("chat_id").map_err(decode)?),
        title: row.try_get("title").map_err(decode)?,
        user_message: row.try_get("user_message").map_err(decode)?,
        bot_response: row.try_get("bot_response").map_err(decode)?,
        timestamp,
    })
}

#[async_trait::async_trait]
impl ChatHistoryRepository for SqlChatHistoryRepository {
    async fn append(&self, exchange: NewChatExchange) -> Result<ChatExchange, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO chat_history (chat_id, title, user_message, bot_response, timestamp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&exchange.chat_id.0)
        .bind(&exchange.title)
        .bind(&exchange.user_message)
        .bind(&exchange.bot_response)
        .bind(encode_timestamp(&exchange.timestamp))
        .execute(&self.pool)
        .await?;

        Ok(ChatExchange {
            id: result.last_insert_rowid(),
            chat_id: exchange.chat_id,
            title: exchange.title,
            user_message: exchange.user_message,
            bot_response: exchange.bot_response,
            timestamp: exchange.timestamp,
        })
    }

    async fn latest_per_chat(&self) -> Result<Vec<ChatExchange>, RepositoryError> {
        // Follow-up exchanges carry no title; surface the conversation's opening title instead.
        let rows = sqlx::query(
            "SELECT h.id, h.chat_id, h.user_message, h.bot_response, h.timestamp,
                    COALESCE(h.title, (
                        SELECT t.title FROM chat_history t
                        WHERE t.chat_id = h.chat_id AND t.title IS NOT NULL
                        ORDER BY t.id ASC LIMIT 1
                    )) AS title
             FROM chat_history h
             WHERE h.id = (
                 SELECT l.id FROM chat_history l
                 WHERE l.chat_id = h.chat_id
                 ORDER BY l.timestamp DESC, l.id DESC LIMIT 1
             )
             ORDER BY h.timestamp DESC, h.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_exchange).collect()
    }

    async fn list_for_chat(&self, chat_id: &ChatId) -> Result<Vec<ChatExchange>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, chat_id, title, user_message, bot_response, timestamp
             FROM chat_history
             WHERE chat_id = ?
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(&chat_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_exchange).collect()
    }
}
