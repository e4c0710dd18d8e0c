//! Question lifecycle controller
//!
//! `unasked → selected → revealed → closed`. Selection and `asked` are
//! fused: the cell is burned the moment the host opens it, so it can never
//! be re-selected even if no answer was shown yet.

use super::AppState;
use crate::error::GameError;
use crate::protocol::{ActiveQuestionView, ServerMessage};
use crate::state::board::MediaContent;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// The question currently under discussion; at most one per session.
/// Absent means no open question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveQuestion {
    pub category: usize,
    pub row: usize,
    pub points: u32,
    pub content: MediaContent,
    pub answer: String,
    pub revealed: bool,
}

impl AppState {
    /// Open a cell: marks it asked, creates the active question and shows it
    /// to everyone with the answer still hidden.
    pub async fn select_question(
        &self,
        code: &str,
        category: usize,
        row: usize,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            let stage = session.stage;
            if !matches!(stage, Stage::Normal | Stage::Double) {
                return Err(GameError::BadStage(stage));
            }
            if session.active_question.is_some() {
                return Err(GameError::QuestionOpen);
            }
            let playable = session.playable.as_mut().ok_or(GameError::BadStage(stage))?;
            let question = playable.mark_asked(category, row)?;

            let active = ActiveQuestion {
                category,
                row,
                points: question.points,
                content: question.content,
                answer: question.answer,
                revealed: false,
            };
            let view = ActiveQuestionView::from(&active);
            session.active_question = Some(active);

            tracing::info!(code = %session.code, category, row, "question opened");
            session.broadcast(ServerMessage::CellMarked { category, row });
            session.broadcast(ServerMessage::QuestionOpened { question: view });
            Ok(())
        })
        .await
    }

    /// Show the answer to everyone.
    pub async fn reveal_answer(&self, code: &str) -> Result<(), GameError> {
        self.with_session(code, |session| {
            let view = {
                let active = session
                    .active_question
                    .as_mut()
                    .ok_or(GameError::NoActiveQuestion)?;
                if active.revealed {
                    return Err(GameError::AlreadyRevealed);
                }
                active.revealed = true;
                ActiveQuestionView::from(&*active)
            };
            tracing::info!(code = %session.code, "answer revealed");
            session.broadcast(ServerMessage::QuestionModal {
                question: Some(view),
            });
            Ok(())
        })
        .await
    }

    /// Credit or debit one player by exactly the open question's value.
    /// May be called any number of times (several players can be right or
    /// wrong about the same question).
    pub async fn allocate_points(
        &self,
        code: &str,
        player_id: &str,
        delta: i64,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            let points = match &session.active_question {
                Some(active) if active.revealed => active.points,
                Some(_) => return Err(GameError::NotRevealed),
                None => return Err(GameError::NoActiveQuestion),
            };
            if delta.unsigned_abs() != u64::from(points) {
                return Err(GameError::BadDelta(points));
            }
            if session.player(player_id).is_none() {
                return Err(GameError::UnknownPlayer(player_id.to_string()));
            }

            let new_score = session.scores.apply_delta(player_id, delta)?;
            tracing::info!(code = %session.code, player = %player_id, delta, new_score, "points allocated");
            session.broadcast(ServerMessage::ScoreSnapshot {
                scores: session.score_snapshot(),
            });
            Ok(())
        })
        .await
    }

    /// Dismiss the question for everyone and re-evaluate whether the board
    /// is played out (which enables the host's advance affordance).
    pub async fn close_question(&self, code: &str) -> Result<(), GameError> {
        self.with_session(code, |session| {
            match &session.active_question {
                Some(active) if active.revealed => {}
                Some(_) => return Err(GameError::NotRevealed),
                None => return Err(GameError::NoActiveQuestion),
            }
            session.active_question = None;
            session.broadcast(ServerMessage::QuestionModal { question: None });

            let complete = session.board_complete();
            tracing::info!(code = %session.code, complete, "question closed");
            session.broadcast(ServerMessage::BoardCompletion { complete });
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::board::Board;

    /// Room in the normal stage with a 1x2 "Science" board and two players.
    async fn playing_room(state: &AppState) -> (RoomCode, PlayerId, PlayerId) {
        let (code, _cap, _rx) = state.create_room(3).await;
        let (ann, _, _rx1) = state.join_room(&code, "Ann").await.unwrap();
        let (bob, _, _rx2) = state.join_room(&code, "Bob").await.unwrap();

        let mut board = Board::create(vec!["Science".into()], vec![100, 200]);
        board
            .set_question(0, 0, MediaContent::text("Q1"), "A1".into())
            .unwrap();
        board
            .set_question(0, 1, MediaContent::text("Q2"), "A2".into())
            .unwrap();
        state
            .start_round(&code, RoundKind::Normal, Some(board))
            .await
            .unwrap();
        (code, ann.id, bob.id)
    }

    #[tokio::test]
    async fn select_burns_the_cell() {
        let state = AppState::new();
        let (code, _, _) = playing_room(&state).await;

        state.select_question(&code, 0, 0).await.unwrap();
        {
            let rooms = state.rooms.read().await;
            let session = rooms.get(&code).unwrap();
            let active = session.active_question.as_ref().unwrap();
            assert_eq!(active.points, 100);
            assert!(!active.revealed);
            assert!(session.playable.as_ref().unwrap().question(0, 0).unwrap().asked);
        }

        // A second selection of any cell is blocked while one is open
        assert_eq!(
            state.select_question(&code, 0, 1).await.err(),
            Some(GameError::QuestionOpen)
        );
    }

    #[tokio::test]
    async fn an_asked_cell_can_never_be_reselected() {
        let state = AppState::new();
        let (code, _, _) = playing_room(&state).await;

        state.select_question(&code, 0, 0).await.unwrap();
        state.reveal_answer(&code).await.unwrap();
        state.close_question(&code).await.unwrap();

        assert_eq!(
            state.select_question(&code, 0, 0).await.err(),
            Some(GameError::QuestionAsked)
        );
        assert_eq!(
            state.select_question(&code, 5, 0).await.err(),
            Some(GameError::BadCoordinates)
        );
    }

    #[tokio::test]
    async fn allocation_requires_a_revealed_answer_and_exact_delta() {
        let state = AppState::new();
        let (code, ann, _) = playing_room(&state).await;

        assert_eq!(
            state.allocate_points(&code, &ann, 100).await.err(),
            Some(GameError::NoActiveQuestion)
        );

        state.select_question(&code, 0, 0).await.unwrap();
        assert_eq!(
            state.allocate_points(&code, &ann, 100).await.err(),
            Some(GameError::NotRevealed)
        );

        state.reveal_answer(&code).await.unwrap();
        assert_eq!(
            state.allocate_points(&code, &ann, 50).await.err(),
            Some(GameError::BadDelta(100))
        );
        assert_eq!(
            state.allocate_points(&code, "ghost", 100).await.err(),
            Some(GameError::UnknownPlayer("ghost".into()))
        );

        state.allocate_points(&code, &ann, 100).await.unwrap();
        state.allocate_points(&code, &ann, -100).await.unwrap();
        state.allocate_points(&code, &ann, 100).await.unwrap();

        let rooms = state.rooms.read().await;
        assert_eq!(rooms.get(&code).unwrap().scores.get(&ann), 100);
    }

    #[tokio::test]
    async fn closing_clears_the_modal_and_tracks_completion() {
        let state = AppState::new();
        let (code, ann, bob) = playing_room(&state).await;

        state.select_question(&code, 0, 0).await.unwrap();
        assert_eq!(
            state.close_question(&code).await.err(),
            Some(GameError::NotRevealed)
        );
        state.reveal_answer(&code).await.unwrap();
        state.allocate_points(&code, &ann, 100).await.unwrap();
        state.close_question(&code).await.unwrap();

        {
            let rooms = state.rooms.read().await;
            let session = rooms.get(&code).unwrap();
            assert!(session.active_question.is_none());
            assert!(!session.board_complete());
        }
        assert_eq!(
            state.close_question(&code).await.err(),
            Some(GameError::NoActiveQuestion)
        );

        state.select_question(&code, 0, 1).await.unwrap();
        state.reveal_answer(&code).await.unwrap();
        state.allocate_points(&code, &bob, 200).await.unwrap();
        state.close_question(&code).await.unwrap();

        let rooms = state.rooms.read().await;
        let session = rooms.get(&code).unwrap();
        assert!(session.board_complete());
        assert_eq!(session.scores.get(&ann), 100);
        assert_eq!(session.scores.get(&bob), 200);
    }

    #[tokio::test]
    async fn double_reveal_is_rejected() {
        let state = AppState::new();
        let (code, _, _) = playing_room(&state).await;

        state.select_question(&code, 0, 0).await.unwrap();
        state.reveal_answer(&code).await.unwrap();
        assert_eq!(
            state.reveal_answer(&code).await.err(),
            Some(GameError::AlreadyRevealed)
        );
    }
}
