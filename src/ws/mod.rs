//! WebSocket Module - Real-time delivery of chat events
//!
//! Each connection is split into a listener task, which reads chat frames
//! from the client, and a writer task, which drains the user's channel in
//! the [`UserMap`](usermap::UserMap) and writes events to the socket.

pub mod connection;
pub mod usermap;

pub use connection::handle_socket;
pub use usermap::{InternalSignal, UserMap};

use crate::{AppState, entities::User};
use axum::{
    Extension,
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// Minimum spacing between two frames read from one client
pub const RATE_LIMITER_MILLIS: u64 = 10;

/// Default idle timeout, overridden by `WS_IDLE_TIMEOUT_SECS`
pub const TIMEOUT_DURATION_SECONDS: u64 = 300;

/// Upgrade an authenticated request to a WebSocket
#[instrument(skip(ws, state, current_user), fields(user_id = current_user.id))]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, current_user))
}
