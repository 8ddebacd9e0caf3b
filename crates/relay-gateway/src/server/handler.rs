//! WebSocket chat handler
//!
//! Adapts an upgraded axum socket to the frame stream / outbound sink a chat
//! stream session runs over.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Json,
};
use futures::future::ready;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::auth::Identity;
use super::state::RelayState;
use crate::connection::{Outbound, TransportError};
use crate::protocol::{ClientFrame, ServerFrame};

/// Close frame reasons are limited to 123 bytes
const MAX_CLOSE_REASON: usize = 123;

/// Chat stream endpoint
///
/// GET /api/chat
///
/// The token is verified before the upgrade; the stream is bound to its user.
pub async fn chat_handler(
    State(state): State<RelayState>,
    identity: Identity,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, identity.into_username(), socket))
}

/// Run one chat stream over an upgraded WebSocket
async fn handle_socket(state: RelayState, username: String, socket: WebSocket) {
    let connection_id = Uuid::new_v4();
    let span = tracing::info_span!("chat_stream", %connection_id, username = %username);

    async move {
        tracing::info!("WebSocket connection established");

        let (ws_sink, ws_stream) = socket.split();

        let frames = ws_stream
            .take_while(|message| ready(!matches!(message, Ok(Message::Close(_)))))
            .filter_map(|message| ready(decode(message)));
        let sink = ws_sink.with(|item: Outbound| ready(encode(item)));

        match state.chat().chat(Some(&username), frames, sink).await {
            Ok(()) => tracing::info!("WebSocket connection closed"),
            Err(e) => tracing::info!(error = %e, "WebSocket connection closed with error"),
        }
    }
    .instrument(span)
    .await;
}

/// Map one incoming WebSocket message to a chat frame; `None` skips it
fn decode(message: Result<Message, axum::Error>) -> Option<Result<ClientFrame, TransportError>> {
    match message {
        Ok(Message::Text(text)) => Some(ClientFrame::from_json(&text).map_err(TransportError::from)),
        Ok(Message::Binary(_)) => Some(Err(TransportError::Decode(
            "binary frames are not supported".to_string(),
        ))),
        // Pong is handled automatically by axum
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_)) => None,
        Err(e) => Some(Err(TransportError::from(e))),
    }
}

/// Map one outbound item to a WebSocket message
fn encode(item: Outbound) -> Result<Message, TransportError> {
    match item {
        Outbound::Deliver(message) => ServerFrame::from(&*message)
            .to_json()
            .map(Message::Text)
            .map_err(|e| TransportError::Encode(e.to_string())),
        Outbound::Close { code, reason } => Ok(Message::Close(Some(CloseFrame {
            code: code.as_u16(),
            reason: truncate_reason(reason).into(),
        }))),
    }
}

fn truncate_reason(mut reason: String) -> String {
    if reason.len() > MAX_CLOSE_REASON {
        let mut end = MAX_CLOSE_REASON;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` once the broadcaster has stopped
    pub status: &'static str,
    /// Logged-in users, attached or not
    pub sessions: usize,
    /// Users with an open chat stream
    pub attached: usize,
}

/// Health check endpoint
///
/// GET /health
pub async fn health_check(State(state): State<RelayState>) -> Json<HealthResponse> {
    let chat = state.chat();
    let counts = chat.registry().counts().await;
    Json(HealthResponse {
        status: if chat.is_broadcasting() { "ok" } else { "degraded" },
        sessions: counts.logged_in,
        attached: counts.attached,
    })
}
