//! Session phase state machine
//!
//! `setup → normal → double → final → results`, host-initiated, strictly
//! forward, one step at a time. The `final → results` edge is owned by the
//! final-round controller; `advance_stage` refuses it.

use super::AppState;
use crate::error::GameError;
use crate::protocol::{BoardView, ServerMessage};
use crate::state::board::Board;
use crate::state::final_round::FinalRound;
use crate::types::*;

impl AppState {
    /// Leave setup: snapshot the authored normal board into play and zero
    /// the ledger for everyone currently joined. An attached board replaces
    /// the stored authoring copy first.
    pub async fn start_round(
        &self,
        code: &str,
        kind: RoundKind,
        board: Option<Board>,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            if session.stage != Stage::Setup {
                return Err(GameError::BadStage(session.stage));
            }
            if kind != RoundKind::Normal {
                return Err(GameError::BadTransition);
            }
            if let Some(board) = board {
                board.validate()?;
                session.normal_board = board;
            }
            if session.normal_board.is_empty() {
                return Err(GameError::EmptyBoard);
            }

            let playable = session.normal_board.instantiate_for_play();
            let view = BoardView::from(&playable);
            session.playable = Some(playable);
            session.stage = Stage::Normal;
            session.scores.init_players(&session.players);

            tracing::info!(code = %session.code, players = session.players.len(), "round started");
            session.broadcast(ServerMessage::RoundStarted {
                stage: Stage::Normal,
                board: view,
                scores: session.score_snapshot(),
            });
            session.broadcast(ServerMessage::BoardCompletion { complete: false });
            Ok(())
        })
        .await
    }

    /// Host advance: `normal → double` (fresh board) and `double → final`.
    /// Both require the in-play board to be fully asked and the question
    /// modal to be closed.
    pub async fn advance_stage(
        &self,
        code: &str,
        next: Stage,
        board: Option<Board>,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            match (session.stage, next) {
                (Stage::Normal, Stage::Double) => {
                    if !session.board_complete() {
                        return Err(GameError::BoardIncomplete);
                    }
                    if session.active_question.is_some() {
                        return Err(GameError::QuestionOpen);
                    }
                    if let Some(board) = board {
                        board.validate()?;
                        session.double_board = board;
                    }
                    if session.double_board.is_empty() {
                        return Err(GameError::EmptyBoard);
                    }

                    let playable = session.double_board.instantiate_for_play();
                    let view = BoardView::from(&playable);
                    session.playable = Some(playable);
                    session.stage = Stage::Double;
                    session.broadcast(ServerMessage::StageAdvanced {
                        stage: Stage::Double,
                        board: Some(view),
                    });
                    session.broadcast(ServerMessage::BoardCompletion { complete: false });
                }
                (Stage::Double, Stage::Final) => {
                    if !session.board_complete() {
                        return Err(GameError::BoardIncomplete);
                    }
                    if session.active_question.is_some() {
                        return Err(GameError::QuestionOpen);
                    }
                    session.final_round = Some(FinalRound::new());
                    session.stage = Stage::Final;
                    session.broadcast(ServerMessage::StageAdvanced {
                        stage: Stage::Final,
                        board: None,
                    });
                }
                _ => return Err(GameError::BadTransition),
            }
            tracing::info!(code = %session.code, stage = ?session.stage, "stage advanced");
            Ok(())
        })
        .await
    }
}
