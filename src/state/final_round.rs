//! Final round controller
//!
//! A strictly ordered sub-protocol: category reveal → wager collection →
//! question reveal → answer collection → results. Collection phases are
//! level-triggered: the completion predicate is recomputed on every incoming
//! submission and on every disconnect, then pushed to clients; nobody
//! polls, nobody blocks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::GameError;
use crate::protocol::{FinalQuestion, FinalQuestionView, ServerMessage};
use crate::state::board::MediaContent;
use crate::types::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinalRound {
    pub category: String,
    pub content: MediaContent,
    pub answer: String,
    pub category_revealed: bool,
    pub question_revealed: bool,
    pub wagers: HashMap<PlayerId, i64>,
    pub answers: HashMap<PlayerId, String>,
    /// Populated exactly once by the terminal reveal
    pub results: Option<Vec<FinalResultEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalResultEntry {
    pub id: PlayerId,
    pub name: String,
    pub wager: i64,
    pub answer: String,
    pub correct: bool,
    /// Score after the wager was applied
    pub score: i64,
}

impl FinalRound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion over the *currently connected* players. The denominator is
    /// recomputed at evaluation time, never snapshotted, so a departing
    /// hold-out flips the predicate instead of deadlocking the round.
    pub fn wagers_complete(&self, players: &[Player]) -> bool {
        players.iter().all(|p| self.wagers.contains_key(&p.id))
    }

    pub fn answers_complete(&self, players: &[Player]) -> bool {
        players.iter().all(|p| self.answers.contains_key(&p.id))
    }
}

impl AppState {
    /// Stage 1: show the category. Opens wager collection.
    pub async fn reveal_final_category(
        &self,
        code: &str,
        category: String,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            let stage = session.stage;
            let fr = session
                .final_round
                .as_mut()
                .ok_or(GameError::BadStage(stage))?;
            if fr.category_revealed {
                return Err(GameError::AlreadyRevealed);
            }
            fr.category = category.clone();
            fr.category_revealed = true;

            tracing::info!(code = %session.code, "final category revealed");
            session.broadcast(ServerMessage::FinalCategoryRevealed { category });
            Ok(())
        })
        .await
    }

    /// Stage 2: accept one wager per player, bounded by `[0, max(score, 0)]`.
    pub async fn submit_final_wager(
        &self,
        code: &str,
        player_id: &str,
        wager: i64,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            let stage = session.stage;
            if session.player(player_id).is_none() {
                return Err(GameError::UnknownPlayer(player_id.to_string()));
            }
            let max_wager = session.scores.get(player_id).max(0);

            let (wagers, all_submitted) = {
                let fr = session
                    .final_round
                    .as_mut()
                    .ok_or(GameError::BadStage(stage))?;
                if !fr.category_revealed || fr.question_revealed {
                    return Err(GameError::CollectionClosed);
                }
                if fr.wagers.contains_key(player_id) {
                    return Err(GameError::DuplicateSubmission);
                }
                if wager < 0 || wager > max_wager {
                    return Err(GameError::WagerOutOfRange(max_wager));
                }
                fr.wagers.insert(player_id.to_string(), wager);
                (fr.wagers.clone(), fr.wagers_complete(&session.players))
            };

            tracing::info!(code = %session.code, player = %player_id, wager, all_submitted, "final wager accepted");
            session.broadcast(ServerMessage::FinalWagersUpdated {
                wagers,
                all_submitted,
            });
            Ok(())
        })
        .await
    }

    /// Stage 3: show the question. Only possible once every connected player
    /// has wagered; opens answer collection.
    pub async fn start_final_round(
        &self,
        code: &str,
        question: FinalQuestion,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            let stage = session.stage;
            let view = {
                let fr = session
                    .final_round
                    .as_mut()
                    .ok_or(GameError::BadStage(stage))?;
                if !fr.category_revealed {
                    return Err(GameError::CollectionClosed);
                }
                if fr.question_revealed {
                    return Err(GameError::AlreadyRevealed);
                }
                if !fr.wagers_complete(&session.players) {
                    return Err(GameError::CollectionIncomplete);
                }
                fr.content = question.content;
                fr.answer = question.answer;
                fr.question_revealed = true;
                FinalQuestionView {
                    category: fr.category.clone(),
                    content: fr.content.clone(),
                }
            };

            tracing::info!(code = %session.code, "final question revealed");
            session.broadcast(ServerMessage::FinalRoundStarted { question: view });
            Ok(())
        })
        .await
    }

    /// Stage 4: accept one answer per player; the empty string counts.
    pub async fn submit_final_answer(
        &self,
        code: &str,
        player_id: &str,
        answer: String,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            let stage = session.stage;
            if session.player(player_id).is_none() {
                return Err(GameError::UnknownPlayer(player_id.to_string()));
            }

            let all_submitted = {
                let fr = session
                    .final_round
                    .as_mut()
                    .ok_or(GameError::BadStage(stage))?;
                if !fr.question_revealed || fr.results.is_some() {
                    return Err(GameError::CollectionClosed);
                }
                if fr.answers.contains_key(player_id) {
                    return Err(GameError::DuplicateSubmission);
                }
                fr.answers.insert(player_id.to_string(), answer);
                fr.answers_complete(&session.players)
            };

            tracing::info!(code = %session.code, player = %player_id, all_submitted, "final answer accepted");
            session.broadcast(ServerMessage::FinalAnswersUpdated { all_submitted });
            Ok(())
        })
        .await
    }

    /// Stage 5, terminal: apply `score ± wager` per the host's correctness
    /// judgments, assemble the leaderboard and enter the results stage.
    /// Players missing from the judgment map are judged incorrect; players
    /// without both a wager and an answer on record are skipped.
    pub async fn reveal_final_results(
        &self,
        code: &str,
        judgments: HashMap<PlayerId, bool>,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            if session.stage != Stage::Final {
                return Err(GameError::BadStage(session.stage));
            }

            let submissions = {
                let fr = session
                    .final_round
                    .as_ref()
                    .ok_or(GameError::BadStage(Stage::Final))?;
                if !fr.question_revealed {
                    return Err(GameError::CollectionClosed);
                }
                if fr.results.is_some() {
                    return Err(GameError::AlreadyRevealed);
                }
                if !fr.answers_complete(&session.players) {
                    return Err(GameError::CollectionIncomplete);
                }
                // Join order is the tie-break order of the results list
                session
                    .players
                    .iter()
                    .filter_map(|p| {
                        let wager = *fr.wagers.get(&p.id)?;
                        let answer = fr.answers.get(&p.id)?.clone();
                        Some((p.clone(), wager, answer))
                    })
                    .collect::<Vec<_>>()
            };

            let mut results = Vec::with_capacity(submissions.len());
            for (player, wager, answer) in submissions {
                let correct = judgments.get(&player.id).copied().unwrap_or(false);
                let delta = if correct { wager } else { -wager };
                let score = session.scores.apply_delta(&player.id, delta)?;
                results.push(FinalResultEntry {
                    id: player.id,
                    name: player.name,
                    wager,
                    answer,
                    correct,
                    score,
                });
            }
            // Stable: equal scores keep join order
            results.sort_by(|a, b| b.score.cmp(&a.score));

            let answer_text = {
                let fr = session.final_round.as_mut().ok_or(GameError::BadStage(Stage::Final))?;
                fr.results = Some(results.clone());
                fr.answer.clone()
            };
            session.stage = Stage::Results;

            tracing::info!(code = %session.code, entries = results.len(), "final results revealed");
            session.broadcast(ServerMessage::FinalResults {
                answer: answer_text,
                results,
            });
            session.broadcast(ServerMessage::ScoreSnapshot {
                scores: session.score_snapshot(),
            });
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Room sitting in the final stage with the given starting scores.
    async fn final_room(state: &AppState, scores: &[i64]) -> (RoomCode, Vec<PlayerId>) {
        let (code, _cap, _rx) = state.create_room(10).await;
        let mut ids = Vec::new();
        for (i, _) in scores.iter().enumerate() {
            let (p, _, _rx) = state.join_room(&code, &format!("Player{i}")).await.unwrap();
            ids.push(p.id);
        }

        let mut rooms = state.rooms.write().await;
        let session = rooms.get_mut(&code).unwrap();
        session.scores.init_players(&session.players);
        for (id, &score) in ids.iter().zip(scores) {
            session.scores.apply_delta(id, score).unwrap();
        }
        session.stage = Stage::Final;
        session.final_round = Some(FinalRound::new());
        drop(rooms);

        (code, ids)
    }

    #[tokio::test]
    async fn wagers_open_only_after_category_reveal() {
        let state = AppState::new();
        let (code, ids) = final_room(&state, &[100]).await;

        assert_eq!(
            state.submit_final_wager(&code, &ids[0], 50).await.err(),
            Some(GameError::CollectionClosed)
        );

        state
            .reveal_final_category(&code, "Rivers".into())
            .await
            .unwrap();
        assert_eq!(
            state.reveal_final_category(&code, "Rivers".into()).await.err(),
            Some(GameError::AlreadyRevealed)
        );
        state.submit_final_wager(&code, &ids[0], 50).await.unwrap();
    }

    #[tokio::test]
    async fn wager_bounds_follow_the_ledger() {
        let state = AppState::new();
        let (code, ids) = final_room(&state, &[100, -50]).await;
        state
            .reveal_final_category(&code, "Rivers".into())
            .await
            .unwrap();

        assert_eq!(
            state.submit_final_wager(&code, &ids[0], 150).await.err(),
            Some(GameError::WagerOutOfRange(100))
        );
        assert_eq!(
            state.submit_final_wager(&code, &ids[0], -1).await.err(),
            Some(GameError::WagerOutOfRange(100))
        );
        // A negative score caps the wager at zero
        assert_eq!(
            state.submit_final_wager(&code, &ids[1], 1).await.err(),
            Some(GameError::WagerOutOfRange(0))
        );
        state.submit_final_wager(&code, &ids[1], 0).await.unwrap();

        // At most one wager per player
        assert_eq!(
            state.submit_final_wager(&code, &ids[1], 0).await.err(),
            Some(GameError::DuplicateSubmission)
        );
    }

    #[tokio::test]
    async fn question_reveal_waits_for_all_wagers() {
        let state = AppState::new();
        let (code, ids) = final_room(&state, &[100, 100]).await;
        state
            .reveal_final_category(&code, "Rivers".into())
            .await
            .unwrap();
        state.submit_final_wager(&code, &ids[0], 50).await.unwrap();

        let question = FinalQuestion {
            category: "Rivers".into(),
            content: MediaContent::text("Longest river?"),
            answer: "The Nile".into(),
        };
        assert_eq!(
            state.start_final_round(&code, question.clone()).await.err(),
            Some(GameError::CollectionIncomplete)
        );

        state.submit_final_wager(&code, &ids[1], 30).await.unwrap();
        state.start_final_round(&code, question).await.unwrap();

        // Wager window is closed once the question is out
        let rooms = state.rooms.read().await;
        let fr = rooms.get(&code).unwrap().final_round.as_ref().unwrap();
        assert!(fr.question_revealed);
        assert_eq!(fr.answer, "The Nile");
    }

    #[tokio::test]
    async fn disconnect_of_the_last_holdout_flips_completion() {
        let state = AppState::new();
        let (code, ids) = final_room(&state, &[100, 100]).await;
        state
            .reveal_final_category(&code, "Rivers".into())
            .await
            .unwrap();
        state.submit_final_wager(&code, &ids[0], 50).await.unwrap();

        {
            let rooms = state.rooms.read().await;
            let session = rooms.get(&code).unwrap();
            let fr = session.final_round.as_ref().unwrap();
            assert!(!fr.wagers_complete(&session.players));
        }

        // The non-submitting player leaves; the denominator shrinks
        state
            .handle_disconnect(&code, Role::Player, Some(&ids[1]))
            .await;

        let rooms = state.rooms.read().await;
        let session = rooms.get(&code).unwrap();
        let fr = session.final_round.as_ref().unwrap();
        assert!(fr.wagers_complete(&session.players));
    }

    #[tokio::test]
    async fn disconnect_of_a_submitter_does_not_flip_completion() {
        let state = AppState::new();
        let (code, ids) = final_room(&state, &[100, 100]).await;
        state
            .reveal_final_category(&code, "Rivers".into())
            .await
            .unwrap();
        state.submit_final_wager(&code, &ids[0], 50).await.unwrap();
        state.submit_final_wager(&code, &ids[1], 30).await.unwrap();
        state
            .start_final_round(
                &code,
                FinalQuestion {
                    category: "Rivers".into(),
                    content: MediaContent::text("Q"),
                    answer: "A".into(),
                },
            )
            .await
            .unwrap();
        state
            .submit_final_answer(&code, &ids[0], "The Nile".into())
            .await
            .unwrap();

        // The player who already answered leaves; the other is still pending
        state
            .handle_disconnect(&code, Role::Player, Some(&ids[0]))
            .await;

        let rooms = state.rooms.read().await;
        let session = rooms.get(&code).unwrap();
        let fr = session.final_round.as_ref().unwrap();
        assert!(!fr.answers_complete(&session.players));
    }

    #[tokio::test]
    async fn results_apply_wagers_and_sort_descending() {
        let state = AppState::new();
        let (code, ids) = final_room(&state, &[100, 200, 300]).await;
        state
            .reveal_final_category(&code, "Rivers".into())
            .await
            .unwrap();
        state.submit_final_wager(&code, &ids[0], 100).await.unwrap();
        state.submit_final_wager(&code, &ids[1], 150).await.unwrap();
        state.submit_final_wager(&code, &ids[2], 0).await.unwrap();
        state
            .start_final_round(
                &code,
                FinalQuestion {
                    category: "Rivers".into(),
                    content: MediaContent::text("Longest river?"),
                    answer: "The Nile".into(),
                },
            )
            .await
            .unwrap();

        state
            .submit_final_answer(&code, &ids[0], "The Nile".into())
            .await
            .unwrap();
        state
            .submit_final_answer(&code, &ids[1], "The Amazon".into())
            .await
            .unwrap();
        // Empty answers are allowed
        state
            .submit_final_answer(&code, &ids[2], String::new())
            .await
            .unwrap();

        let judgments = HashMap::from([(ids[0].clone(), true), (ids[1].clone(), false)]);
        state.reveal_final_results(&code, judgments).await.unwrap();

        let rooms = state.rooms.read().await;
        let session = rooms.get(&code).unwrap();
        assert_eq!(session.stage, Stage::Results);

        let results = session.final_round.as_ref().unwrap().results.clone().unwrap();
        // Player0: 100+100=200 correct; Player1: 200-150=50; Player2: 300-0=300
        assert_eq!(results[0].score, 300);
        assert!(!results[0].correct);
        assert_eq!(results[1].score, 200);
        assert!(results[1].correct);
        assert_eq!(results[2].score, 50);
        assert_eq!(session.scores.get(&ids[1]), 50);
    }

    #[tokio::test]
    async fn results_tie_break_keeps_join_order() {
        let state = AppState::new();
        let (code, ids) = final_room(&state, &[100, 100]).await;
        state
            .reveal_final_category(&code, "Rivers".into())
            .await
            .unwrap();
        state.submit_final_wager(&code, &ids[0], 0).await.unwrap();
        state.submit_final_wager(&code, &ids[1], 0).await.unwrap();
        state
            .start_final_round(
                &code,
                FinalQuestion {
                    category: "Rivers".into(),
                    content: MediaContent::text("Q"),
                    answer: "A".into(),
                },
            )
            .await
            .unwrap();
        state.submit_final_answer(&code, &ids[0], "x".into()).await.unwrap();
        state.submit_final_answer(&code, &ids[1], "y".into()).await.unwrap();

        state
            .reveal_final_results(&code, HashMap::new())
            .await
            .unwrap();

        let rooms = state.rooms.read().await;
        let results = rooms
            .get(&code)
            .unwrap()
            .final_round
            .as_ref()
            .unwrap()
            .results
            .clone()
            .unwrap();
        assert_eq!(results[0].id, ids[0]);
        assert_eq!(results[1].id, ids[1]);
    }

    #[tokio::test]
    async fn results_are_terminal() {
        let state = AppState::new();
        let (code, ids) = final_room(&state, &[100]).await;
        state
            .reveal_final_category(&code, "Rivers".into())
            .await
            .unwrap();
        state.submit_final_wager(&code, &ids[0], 10).await.unwrap();
        state
            .start_final_round(
                &code,
                FinalQuestion {
                    category: "Rivers".into(),
                    content: MediaContent::text("Q"),
                    answer: "A".into(),
                },
            )
            .await
            .unwrap();
        state.submit_final_answer(&code, &ids[0], "A".into()).await.unwrap();
        state
            .reveal_final_results(&code, HashMap::new())
            .await
            .unwrap();

        // Everything about the final round is frozen now
        assert_eq!(
            state.reveal_final_results(&code, HashMap::new()).await.err(),
            Some(GameError::BadStage(Stage::Results))
        );
        assert_eq!(
            state.submit_final_answer(&code, &ids[0], "B".into()).await.err(),
            Some(GameError::CollectionClosed)
        );
        assert_eq!(
            state.submit_final_wager(&code, &ids[0], 0).await.err(),
            Some(GameError::CollectionClosed)
        );
    }

    #[tokio::test]
    async fn reveal_waits_for_all_answers() {
        let state = AppState::new();
        let (code, ids) = final_room(&state, &[100, 100]).await;
        state
            .reveal_final_category(&code, "Rivers".into())
            .await
            .unwrap();
        state.submit_final_wager(&code, &ids[0], 10).await.unwrap();
        state.submit_final_wager(&code, &ids[1], 10).await.unwrap();
        state
            .start_final_round(
                &code,
                FinalQuestion {
                    category: "Rivers".into(),
                    content: MediaContent::text("Q"),
                    answer: "A".into(),
                },
            )
            .await
            .unwrap();
        state.submit_final_answer(&code, &ids[0], "A".into()).await.unwrap();

        assert_eq!(
            state.reveal_final_results(&code, HashMap::new()).await.err(),
            Some(GameError::CollectionIncomplete)
        );
    }
}
