pub mod handlers;
mod host;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{PlayerId, Role, RoomCode};

/// What this connection is to the world: nothing until it creates or joins
/// a room, then host or player of exactly one room for its lifetime.
#[derive(Debug, Default)]
pub struct ConnContext {
    pub room: Option<RoomCode>,
    pub role: Option<Role>,
    pub player_id: Option<PlayerId>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut ctx = ConnContext::default();
    let mut room_rx: Option<broadcast::Receiver<ServerMessage>> = None;

    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            // Room broadcasts, once the connection has entered a room
            room_msg = async {
                match &mut room_rx {
                    Some(rx) => Some(rx.recv().await),
                    None => {
                        // No room yet: park this branch forever
                        std::future::pending::<Option<Result<ServerMessage, broadcast::error::RecvError>>>().await
                    }
                }
            } => {
                match room_msg {
                    Some(Ok(msg)) => {
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        tracing::warn!(skipped, "connection lagged behind room broadcasts");
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) => {
                        // Room was destroyed underneath us
                        room_rx = None;
                    }
                    None => {}
                }
            }

            // Client intents
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let outcome =
                                    handlers::handle_message(client_msg, &mut ctx, &state).await;
                                if let Some(rx) = outcome.subscription {
                                    room_rx = Some(rx);
                                }
                                if let Some(reply) = outcome.reply {
                                    if let Ok(json) = serde_json::to_string(&reply) {
                                        if sender.send(Message::Text(json.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::debug!("failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("websocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Connection gone: the session has to know, collection denominators may
    // shrink and the player list changes for everyone else.
    if let (Some(code), Some(role)) = (ctx.room.as_deref(), ctx.role) {
        state
            .handle_disconnect(code, role, ctx.player_id.as_deref())
            .await;
    }
    tracing::info!(role = ?ctx.role, "websocket connection closed");
}
