//! WebSocket connection management: one listener and one writer task per socket

use crate::dtos::{ChatEventDTO, OutgoingChatDTO};
use crate::entities::User;
use crate::services::chat::deliver_message;
use crate::ws::usermap::InternalSignal;
use crate::ws::RATE_LIMITER_MILLIS;
use crate::AppState;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

#[instrument(skip(ws, state, user), fields(user_id = user.id))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user: User) {
    info!("WebSocket connection established");

    let (ws_tx, ws_rx) = ws.split();
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();

    state.users_online.register_online(user.id, int_tx.clone());

    tokio::spawn(listen_ws(user, ws_rx, int_tx, state));
    tokio::spawn(write_ws(ws_tx, int_rx));
}

#[instrument(skip(websocket_tx, internal_rx))]
pub async fn write_ws(
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
) {
    debug!("Write task started");

    while let Some(signal) = internal_rx.recv().await {
        match signal {
            InternalSignal::Shutdown => {
                info!("Shutdown signal received");
                break;
            }
            InternalSignal::Event(event) => {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize event: {:?}", e);
                        continue;
                    }
                };
                if let Err(e) = websocket_tx.send(Message::Text(Utf8Bytes::from(json))).await {
                    warn!("Failed to write to WebSocket: {:?}", e);
                    break;
                }
            }
        }
    }

    let _ = websocket_tx.send(Message::Close(None)).await;
    debug!("Write task terminated");
}

/// Report a failed client frame back to the same connection
fn send_error(internal_tx: &UnboundedSender<InternalSignal>, code: u16, message: impl Into<String>) {
    let event = ChatEventDTO::Error {
        code,
        message: message.into(),
    };
    if internal_tx.send(InternalSignal::Event(event)).is_err() {
        debug!("Writer already closed, error dropped");
    }
}

#[instrument(skip(user, websocket_rx, internal_tx, state), fields(user_id = user.id))]
pub async fn listen_ws(
    user: User,
    mut websocket_rx: SplitStream<WebSocket>,
    internal_tx: UnboundedSender<InternalSignal>,
    state: Arc<AppState>,
) {
    debug!("Listen task started");

    // no catch-up bursts after a quiet period
    let mut rate_limiter = interval(Duration::from_millis(RATE_LIMITER_MILLIS));
    rate_limiter.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let timeout_duration = state.ws_idle_timeout;

    loop {
        match timeout(timeout_duration, websocket_rx.next()).await {
            Ok(Some(Ok(msg))) => {
                rate_limiter.tick().await;
                match msg {
                    Message::Text(text) => {
                        let frame = match serde_json::from_str::<OutgoingChatDTO>(text.as_str()) {
                            Ok(frame) => frame,
                            Err(e) => {
                                warn!("Malformed frame: {}", e);
                                send_error(&internal_tx, 400, "Malformed message");
                                continue;
                            }
                        };
                        if let Err(e) = frame.validate() {
                            send_error(&internal_tx, 400, e.to_string());
                            continue;
                        }
                        if let Err(e) =
                            deliver_message(&state, &user, frame.recipient_id, &frame.content).await
                        {
                            send_error(&internal_tx, e.status().as_u16(), e.message());
                        }
                    }
                    Message::Close(_) => {
                        info!("Close message received");
                        break;
                    }
                    _ => {}
                }
            }
            Ok(Some(Err(e))) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(timeout_secs = timeout_duration.as_secs(), "Connection timeout");
                break;
            }
        }
    }

    let _ = internal_tx.send(InternalSignal::Shutdown);
    state.users_online.remove_if_same(&user.id, &internal_tx);
    debug!("Listen task terminated");
}
