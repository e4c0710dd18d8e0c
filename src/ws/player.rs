//! Player intent handlers
//!
//! Joining, chat, and the two final-round submissions. Everything else a
//! player could try is host-only and never reaches this module.

use std::sync::Arc;

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::Role;

use super::handlers::{ack, error_reply, Outcome};
use super::ConnContext;

pub async fn handle_join_room(
    state: &Arc<AppState>,
    ctx: &mut ConnContext,
    code: &str,
    name: &str,
) -> Outcome {
    if ctx.room.is_some() {
        tracing::debug!("connection already in a room, ignoring join");
        return Outcome::none();
    }

    match state.join_room(code, name).await {
        Ok((player, snapshot, rx)) => {
            ctx.room = Some(code.to_string());
            ctx.role = Some(Role::Player);
            ctx.player_id = Some(player.id.clone());
            Outcome {
                reply: Some(ServerMessage::RoomJoined {
                    code: code.to_string(),
                    player_id: player.id,
                    snapshot,
                }),
                subscription: Some(rx),
            }
        }
        Err(e) => error_reply(e),
    }
}

pub async fn handle_send_chat(
    state: &Arc<AppState>,
    ctx: &ConnContext,
    sender: &str,
    text: &str,
) -> Outcome {
    let Some(code) = ctx.room.as_deref() else {
        return error_reply(GameError::NotInRoom);
    };
    ack(state.send_chat(code, sender, text).await)
}

pub async fn handle_submit_wager(
    state: &Arc<AppState>,
    code: &str,
    player_id: &str,
    wager: i64,
) -> Outcome {
    tracing::debug!(%code, player = %player_id, "player submits wager");
    ack(state.submit_final_wager(code, player_id, wager).await)
}

pub async fn handle_submit_answer(
    state: &Arc<AppState>,
    code: &str,
    player_id: &str,
    answer: String,
) -> Outcome {
    tracing::debug!(%code, player = %player_id, "player submits answer");
    ack(state.submit_final_answer(code, player_id, answer).await)
}
