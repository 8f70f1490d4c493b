//! Message entity - Direct chat message between two users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub conversation_id: String,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Conversation key shared by both participants, lower id first
pub fn conversation_id(user_a: i64, user_b: i64) -> String {
    let (low, high) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{}_{}", low, high)
}

/// Last message of a conversation as seen by one participant
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub peer_id: i64,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_id_is_symmetric() {
        assert_eq!(conversation_id(2, 3), "2_3");
        assert_eq!(conversation_id(3, 2), "2_3");
        assert_eq!(conversation_id(10, 9), "9_10");
    }
}
