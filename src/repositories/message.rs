//! MessageRepository - Direct chat messages

use crate::entities::{ConversationSummary, Message, conversation_id};
use chrono::Utc;
use sqlx::{Error, SqlitePool};
use tracing::{debug, info, instrument};

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, recipient_id, content, read, created_at";

pub struct MessageRepository {
    connection_pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }

    /// Store a message from `sender_id` to `recipient_id`, unread
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub async fn create(
        &self,
        sender_id: i64,
        recipient_id: i64,
        content: &str,
    ) -> Result<Message, Error> {
        let sql = format!(
            "INSERT INTO messages (conversation_id, sender_id, recipient_id, content, read, created_at) \
             VALUES (?, ?, ?, ?, 0, ?) RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, Message>(&sql)
            .bind(conversation_id(sender_id, recipient_id))
            .bind(sender_id)
            .bind(recipient_id)
            .bind(content)
            .bind(Utc::now())
            .fetch_one(&self.connection_pool)
            .await?;
        info!("Message {} stored", message.id);
        Ok(message)
    }

    /// Whole conversation between two users, oldest first
    #[instrument(skip(self))]
    pub async fn find_conversation(&self, user_a: i64, user_b: i64) -> Result<Vec<Message>, Error> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Message>(&sql)
            .bind(conversation_id(user_a, user_b))
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Mark as read every message of the conversation addressed to `reader_id`.
    /// Returns how many messages changed.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, conversation: &str, reader_id: i64) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE messages SET read = 1 WHERE conversation_id = ? AND recipient_id = ? AND read = 0",
        )
        .bind(conversation)
        .bind(reader_id)
        .execute(&self.connection_pool)
        .await?;
        debug!("{} messages marked as read", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Last message and unread count of every conversation `user_id` takes part in,
    /// most recent conversation first
    #[instrument(skip(self))]
    pub async fn conversation_summaries(
        &self,
        user_id: i64,
    ) -> Result<Vec<ConversationSummary>, Error> {
        sqlx::query_as::<_, ConversationSummary>(
            "SELECT m.conversation_id, \
                CASE WHEN m.sender_id = ?1 THEN m.recipient_id ELSE m.sender_id END AS peer_id, \
                m.content AS last_message, \
                m.created_at AS last_message_at, \
                (SELECT COUNT(*) FROM messages u \
                    WHERE u.conversation_id = m.conversation_id AND u.recipient_id = ?1 AND u.read = 0) \
                    AS unread_count \
             FROM messages m \
             WHERE m.id IN ( \
                SELECT MAX(id) FROM messages WHERE sender_id = ?1 OR recipient_id = ?1 \
                GROUP BY conversation_id) \
             ORDER BY m.created_at DESC, m.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}
