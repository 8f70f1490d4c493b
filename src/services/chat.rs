//! Chat services - Direct messages between users
//!
//! Messages are persisted first and then pushed to the recipient when they
//! are connected to the WebSocket. Offline users read them through REST.

use crate::core::{AppError, AppState};
use crate::dtos::{ChatEventDTO, ConversationDTO, MarkReadDTO, MessageDTO, SendMessageDTO};
use crate::entities::{User, conversation_id};
use crate::repositories::Read;
use crate::ws::InternalSignal;
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

async fn ensure_peer(state: &AppState, current_user: &User, peer_id: i64) -> Result<User, AppError> {
    if peer_id == current_user.id {
        warn!("User {} named themself as chat peer", current_user.id);
        return Err(AppError::bad_request("A conversation needs another user"));
    }
    state.user.read(&peer_id).await?.ok_or_else(|| {
        warn!("Peer {} not found", peer_id);
        AppError::not_found("User not found")
    })
}

/// Store a message and push it to the recipient if online.
/// Shared by the REST endpoint and the WebSocket listener.
#[instrument(skip(state, sender, content), fields(sender_id = sender.id))]
pub async fn deliver_message(
    state: &AppState,
    sender: &User,
    recipient_id: i64,
    content: &str,
) -> Result<MessageDTO, AppError> {
    ensure_peer(state, sender, recipient_id).await?;

    let message = MessageDTO::from(state.msg.create(sender.id, recipient_id, content).await?);
    let event = ChatEventDTO::NewMessage(message.clone());
    if state
        .users_online
        .send_if_online(&recipient_id, InternalSignal::Event(event))
    {
        debug!("Message pushed to user {}", recipient_id);
    }
    Ok(message)
}

#[instrument(skip(state, current_user), fields(user_id = current_user.id))]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<ConversationDTO>>, AppError> {
    let conversations = state.msg.conversation_summaries(current_user.id).await?;
    info!("Found {} conversations", conversations.len());
    Ok(Json(
        conversations.into_iter().map(ConversationDTO::from).collect(),
    ))
}

#[instrument(skip(state, current_user), fields(user_id = current_user.id, peer_id = %peer_id))]
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(peer_id): Path<i64>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    ensure_peer(&state, &current_user, peer_id).await?;
    let messages = state.msg.find_conversation(current_user.id, peer_id).await?;
    Ok(Json(messages.into_iter().map(MessageDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = current_user.id, peer_id = %peer_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(peer_id): Path<i64>,
    Json(body): Json<SendMessageDTO>,
) -> Result<(StatusCode, Json<MessageDTO>), AppError> {
    body.validate()?;
    let message = deliver_message(&state, &current_user, peer_id, &body.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state, current_user), fields(user_id = current_user.id, peer_id = %peer_id))]
pub async fn mark_conversation_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(peer_id): Path<i64>,
) -> Result<Json<MarkReadDTO>, AppError> {
    ensure_peer(&state, &current_user, peer_id).await?;
    let conversation = conversation_id(current_user.id, peer_id);
    let updated = state.msg.mark_read(&conversation, current_user.id).await?;

    if updated > 0 {
        state.users_online.send_if_online(
            &peer_id,
            InternalSignal::Event(ChatEventDTO::MessagesRead {
                conversation_id: conversation,
                reader_id: current_user.id,
            }),
        );
    }
    Ok(Json(MarkReadDTO { updated }))
}
