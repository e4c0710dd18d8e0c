//! WebSocket message dispatch
//!
//! Single entry point for client intents. Role gating happens here and
//! follows the permission-error contract: a host-only intent from anything
//! but the room's host connection is dropped *silently*: no state change,
//! no reply, no broadcast. Validation failures inside the state layer come
//! back as `Error` replies to the originator only.

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{host, player, ConnContext};

/// Dispatch result: an optional direct reply, plus the room-channel
/// subscription when the connection just entered a room.
pub struct Outcome {
    pub reply: Option<ServerMessage>,
    pub subscription: Option<broadcast::Receiver<ServerMessage>>,
}

impl Outcome {
    pub fn none() -> Self {
        Self {
            reply: None,
            subscription: None,
        }
    }

    pub fn reply(msg: ServerMessage) -> Self {
        Self {
            reply: Some(msg),
            subscription: None,
        }
    }
}

pub(super) fn error_reply(e: GameError) -> Outcome {
    Outcome::reply(ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    })
}

/// Ok means the broadcasts already did the talking; Err goes back to the
/// originator only.
pub(super) fn ack(result: Result<(), GameError>) -> Outcome {
    match result {
        Ok(()) => Outcome::none(),
        Err(e) => error_reply(e),
    }
}

/// Silently drop host-only intents from non-host connections; yields the
/// room code for the legitimate host.
macro_rules! require_host {
    ($ctx:expr, $action:expr) => {
        match (&$ctx.room, $ctx.role) {
            (Some(code), Some(Role::Host)) => code.clone(),
            _ => {
                tracing::debug!("dropping non-host attempt to {}", $action);
                return Outcome::none();
            }
        }
    };
}

/// Same contract for player-only intents; yields (room code, player id).
macro_rules! require_player {
    ($ctx:expr, $action:expr) => {
        match (&$ctx.room, $ctx.role, &$ctx.player_id) {
            (Some(code), Some(Role::Player), Some(pid)) => (code.clone(), pid.clone()),
            _ => {
                tracing::debug!("dropping non-player attempt to {}", $action);
                return Outcome::none();
            }
        }
    };
}

/// Handle one client intent.
pub async fn handle_message(
    msg: ClientMessage,
    ctx: &mut ConnContext,
    state: &Arc<AppState>,
) -> Outcome {
    match msg {
        // Connection bootstrap
        ClientMessage::CreateRoom { capacity } => {
            host::handle_create_room(state, ctx, capacity).await
        }
        ClientMessage::JoinRoom { code, name } => {
            player::handle_join_room(state, ctx, &code, &name).await
        }

        // Anyone in a room
        ClientMessage::SendChat { sender, text } => {
            player::handle_send_chat(state, ctx, &sender, &text).await
        }

        // Host-only: room settings and board authoring
        ClientMessage::UpdateCapacity { capacity } => {
            let code = require_host!(ctx, "update capacity");
            host::handle_update_capacity(state, &code, capacity).await
        }
        ClientMessage::AddCategory { round, name } => {
            let code = require_host!(ctx, "edit the board");
            ack(state.author_add_category(&code, round, name).await)
        }
        ClientMessage::RemoveCategory { round, index } => {
            let code = require_host!(ctx, "edit the board");
            ack(state.author_remove_category(&code, round, index).await)
        }
        ClientMessage::RenameCategory { round, index, name } => {
            let code = require_host!(ctx, "edit the board");
            ack(state.author_rename_category(&code, round, index, name).await)
        }
        ClientMessage::EditQuestion {
            round,
            category,
            row,
            content,
            answer,
        } => {
            let code = require_host!(ctx, "edit the board");
            ack(state
                .author_edit_question(&code, round, category, row, content, answer)
                .await)
        }

        // Host-only: phase control
        ClientMessage::StartRound { kind, board } => {
            let code = require_host!(ctx, "start the round");
            host::handle_start_round(state, &code, kind, board).await
        }
        ClientMessage::AdvanceStage { stage, board } => {
            let code = require_host!(ctx, "advance the stage");
            host::handle_advance_stage(state, &code, stage, board).await
        }

        // Host-only: question lifecycle
        ClientMessage::SelectQuestion { category, row } => {
            let code = require_host!(ctx, "select a question");
            host::handle_select_question(state, &code, category, row).await
        }
        ClientMessage::RevealAnswer => {
            let code = require_host!(ctx, "reveal the answer");
            ack(state.reveal_answer(&code).await)
        }
        ClientMessage::AllocatePoints { player_id, delta } => {
            let code = require_host!(ctx, "allocate points");
            host::handle_allocate_points(state, &code, &player_id, delta).await
        }
        ClientMessage::CloseQuestion => {
            let code = require_host!(ctx, "close the question");
            ack(state.close_question(&code).await)
        }

        // Final round
        ClientMessage::RevealFinalCategory { category } => {
            let code = require_host!(ctx, "reveal the final category");
            ack(state.reveal_final_category(&code, category).await)
        }
        ClientMessage::StartFinalRound { question } => {
            let code = require_host!(ctx, "start the final round");
            ack(state.start_final_round(&code, question).await)
        }
        ClientMessage::SubmitFinalWager { wager } => {
            let (code, pid) = require_player!(ctx, "submit a wager");
            player::handle_submit_wager(state, &code, &pid, wager).await
        }
        ClientMessage::SubmitFinalAnswer { answer } => {
            let (code, pid) = require_player!(ctx, "submit an answer");
            player::handle_submit_answer(state, &code, &pid, answer).await
        }
        ClientMessage::RevealFinalResults { judgments } => {
            let code = require_host!(ctx, "reveal the final results");
            ack(state.reveal_final_results(&code, judgments).await)
        }
    }
}
