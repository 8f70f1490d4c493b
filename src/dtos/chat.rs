//! Chat DTOs - Direct messages, conversations and WebSocket events

use crate::entities::{ConversationSummary, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDTO {
    #[serde(rename = "_id")]
    pub id: i64,
    pub conversation_id: String,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            id: value.id,
            conversation_id: value.conversation_id,
            sender_id: value.sender_id,
            recipient_id: value.recipient_id,
            content: value.content,
            read: value.read,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDTO {
    pub conversation_id: String,
    pub peer_id: i64,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
}

impl From<ConversationSummary> for ConversationDTO {
    fn from(value: ConversationSummary) -> Self {
        Self {
            conversation_id: value.conversation_id,
            peer_id: value.peer_id,
            last_message: value.last_message,
            last_message_at: value.last_message_at,
            unread_count: value.unread_count,
        }
    }
}

/// Body of `POST /chat/{peerId}/messages`
#[derive(Deserialize, Debug, Clone, Validate)]
pub struct SendMessageDTO {
    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,
}

/// Frame sent by a client over the WebSocket
#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingChatDTO {
    pub recipient_id: i64,
    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,
}

#[derive(Serialize, Debug)]
pub struct MarkReadDTO {
    pub updated: u64,
}

/// Events pushed to clients, serialized as `{ "type": ..., "data": ... }`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ChatEventDTO {
    NewMessage(MessageDTO),
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        conversation_id: String,
        reader_id: i64,
    },
    Error {
        code: u16,
        message: String,
    },
}
