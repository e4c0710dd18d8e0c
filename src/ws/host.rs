//! Host intent handlers
//!
//! Role authorization happens in the dispatch layer before these run; the
//! handlers only translate state-layer results into replies.

use std::sync::Arc;

use crate::protocol::ServerMessage;
use crate::state::board::Board;
use crate::state::AppState;
use crate::types::{Role, RoundKind, Stage};

use super::handlers::{ack, error_reply, Outcome};
use super::ConnContext;

/// Open a fresh room; this connection becomes its host.
pub async fn handle_create_room(
    state: &Arc<AppState>,
    ctx: &mut ConnContext,
    capacity: usize,
) -> Outcome {
    if ctx.room.is_some() {
        tracing::debug!("connection already in a room, ignoring create");
        return Outcome::none();
    }

    let (code, capacity, rx) = state.create_room(capacity).await;
    ctx.room = Some(code.clone());
    ctx.role = Some(Role::Host);

    Outcome {
        reply: Some(ServerMessage::RoomCreated { code, capacity }),
        subscription: Some(rx),
    }
}

pub async fn handle_update_capacity(
    state: &Arc<AppState>,
    code: &str,
    capacity: usize,
) -> Outcome {
    match state.update_capacity(code, capacity).await {
        Ok(_) => Outcome::none(),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_start_round(
    state: &Arc<AppState>,
    code: &str,
    kind: RoundKind,
    board: Option<Board>,
) -> Outcome {
    tracing::debug!(%code, ?kind, "host starts round");
    ack(state.start_round(code, kind, board).await)
}

pub async fn handle_advance_stage(
    state: &Arc<AppState>,
    code: &str,
    stage: Stage,
    board: Option<Board>,
) -> Outcome {
    tracing::debug!(%code, ?stage, "host advances stage");
    ack(state.advance_stage(code, stage, board).await)
}

pub async fn handle_select_question(
    state: &Arc<AppState>,
    code: &str,
    category: usize,
    row: usize,
) -> Outcome {
    tracing::debug!(%code, category, row, "host selects question");
    ack(state.select_question(code, category, row).await)
}

pub async fn handle_allocate_points(
    state: &Arc<AppState>,
    code: &str,
    player_id: &str,
    delta: i64,
) -> Outcome {
    tracing::debug!(%code, player = %player_id, delta, "host allocates points");
    ack(state.allocate_points(code, player_id, delta).await)
}
