//! Board/Round model
//!
//! An authoring [`Board`] is the host's editable category/question grid.
//! [`Board::instantiate_for_play`] produces an independently owned
//! [`PlayableBoard`] for one round, so marking questions asked during play
//! never touches the authoring copy.

use crate::error::GameError;
use crate::types::{RoundKind, Stage};
use serde::{Deserialize, Serialize};

/// Optional typed media references, at most one of each kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MediaContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl MediaContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub points: u32,
    #[serde(default)]
    pub asked: bool,
    #[serde(default)]
    pub content: MediaContent,
    #[serde(default)]
    pub answer: String,
}

impl Question {
    fn fresh(points: u32) -> Self {
        Self {
            points,
            asked: false,
            content: MediaContent::default(),
            answer: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub name: String,
    pub questions: Vec<Question>,
}

/// Host-editable board. Invariant: every category has exactly
/// `point_values.len()` questions (rectangular grid).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Board {
    pub categories: Vec<Category>,
    /// Row generator for new categories; row indices share a conceptual
    /// value but per-cell points may diverge after editing.
    pub point_values: Vec<u32>,
}

impl Board {
    /// Build a board with one fresh question per point value in every category.
    pub fn create(category_names: Vec<String>, point_values: Vec<u32>) -> Self {
        let categories = category_names
            .into_iter()
            .map(|name| Category {
                name,
                questions: point_values.iter().map(|&p| Question::fresh(p)).collect(),
            })
            .collect();
        Self {
            categories,
            point_values,
        }
    }

    /// Default board shape matching a fresh session (numbered categories).
    pub fn numbered(prefix: &str, count: usize, point_values: &[u32]) -> Self {
        let names = (1..=count).map(|i| format!("{prefix} {i}")).collect();
        Self::create(names, point_values.to_vec())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Append a fresh column generated from the point values.
    pub fn add_category(&mut self, name: String) {
        self.categories.push(Category {
            name,
            questions: self
                .point_values
                .iter()
                .map(|&p| Question::fresh(p))
                .collect(),
        });
    }

    /// Remove one column; the others keep their content.
    pub fn remove_category(&mut self, index: usize) -> Result<(), GameError> {
        if index >= self.categories.len() {
            return Err(GameError::BadCoordinates);
        }
        self.categories.remove(index);
        Ok(())
    }

    /// Rename a column, preserving its question content.
    pub fn rename_category(&mut self, index: usize, name: String) -> Result<(), GameError> {
        let cat = self
            .categories
            .get_mut(index)
            .ok_or(GameError::BadCoordinates)?;
        cat.name = name;
        Ok(())
    }

    /// Replace one cell's content and answer.
    pub fn set_question(
        &mut self,
        category: usize,
        row: usize,
        content: MediaContent,
        answer: String,
    ) -> Result<(), GameError> {
        let q = self
            .categories
            .get_mut(category)
            .and_then(|c| c.questions.get_mut(row))
            .ok_or(GameError::BadCoordinates)?;
        q.content = content;
        q.answer = answer;
        Ok(())
    }

    /// Boards arriving over the wire are untrusted; enforce the grid
    /// invariant before storing one.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.categories.is_empty() {
            return Err(GameError::EmptyBoard);
        }
        let rows = self.point_values.len();
        if rows == 0 {
            return Err(GameError::BadBoard("board has no point rows"));
        }
        for cat in &self.categories {
            if cat.questions.len() != rows {
                return Err(GameError::BadBoard("categories have unequal row counts"));
            }
            if cat.questions.iter().any(|q| q.points == 0) {
                return Err(GameError::BadBoard("question values must be positive"));
            }
        }
        Ok(())
    }

    /// Deep, independent copy for one round of play. All questions start
    /// unasked regardless of any flags on the authoring copy.
    pub fn instantiate_for_play(&self) -> PlayableBoard {
        PlayableBoard {
            categories: self
                .categories
                .iter()
                .map(|cat| Category {
                    name: cat.name.clone(),
                    questions: cat
                        .questions
                        .iter()
                        .map(|q| Question {
                            asked: false,
                            ..q.clone()
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// In-play copy of a board. Owned by the session; the authoring [`Board`]
/// is a distinct value once a round starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayableBoard {
    pub categories: Vec<Category>,
}

impl PlayableBoard {
    pub fn question(&self, category: usize, row: usize) -> Option<&Question> {
        self.categories.get(category)?.questions.get(row)
    }

    /// Fuse selection and `asked`: flips the flag exactly once and hands back
    /// a copy of the question for the active-question slot.
    pub fn mark_asked(&mut self, category: usize, row: usize) -> Result<Question, GameError> {
        let q = self
            .categories
            .get_mut(category)
            .and_then(|c| c.questions.get_mut(row))
            .ok_or(GameError::BadCoordinates)?;
        if q.asked {
            return Err(GameError::QuestionAsked);
        }
        q.asked = true;
        Ok(q.clone())
    }

    /// Board-completion predicate: true iff every question has been asked.
    /// Callers guarantee the board is non-empty.
    pub fn is_complete(&self) -> bool {
        self.categories
            .iter()
            .all(|c| c.questions.iter().all(|q| q.asked))
    }
}

/// Authoring operations, host-only (enforced at the dispatch layer) and
/// permitted only while the session is still in setup.
impl super::AppState {
    pub async fn author_add_category(
        &self,
        code: &str,
        kind: RoundKind,
        name: String,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            if session.stage != Stage::Setup {
                return Err(GameError::BadStage(session.stage));
            }
            session.board_mut(kind).add_category(name);
            Ok(())
        })
        .await
    }

    pub async fn author_remove_category(
        &self,
        code: &str,
        kind: RoundKind,
        index: usize,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            if session.stage != Stage::Setup {
                return Err(GameError::BadStage(session.stage));
            }
            session.board_mut(kind).remove_category(index)
        })
        .await
    }

    pub async fn author_rename_category(
        &self,
        code: &str,
        kind: RoundKind,
        index: usize,
        name: String,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            if session.stage != Stage::Setup {
                return Err(GameError::BadStage(session.stage));
            }
            session.board_mut(kind).rename_category(index, name)
        })
        .await
    }

    pub async fn author_edit_question(
        &self,
        code: &str,
        kind: RoundKind,
        category: usize,
        row: usize,
        content: MediaContent,
        answer: String,
    ) -> Result<(), GameError> {
        self.with_session(code, |session| {
            if session.stage != Stage::Setup {
                return Err(GameError::BadStage(session.stage));
            }
            session
                .board_mut(kind)
                .set_question(category, row, content, answer)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn science_board() -> Board {
        let mut board = Board::create(vec!["Science".into()], vec![100, 200]);
        board
            .set_question(0, 0, MediaContent::text("Q1"), "A1".into())
            .unwrap();
        board
            .set_question(0, 1, MediaContent::text("Q2"), "A2".into())
            .unwrap();
        board
    }

    #[test]
    fn create_is_rectangular_and_unasked() {
        let board = Board::numbered("Category", 5, &[100, 200, 400, 600, 1000]);
        assert_eq!(board.categories.len(), 5);
        for cat in &board.categories {
            assert_eq!(cat.questions.len(), 5);
            assert!(cat.questions.iter().all(|q| !q.asked));
            assert!(cat.questions.iter().all(|q| q.answer.is_empty()));
        }
        assert_eq!(board.categories[2].name, "Category 3");
        board.validate().unwrap();
    }

    #[test]
    fn add_and_remove_preserve_the_grid() {
        let mut board = Board::numbered("Category", 2, &[100, 200]);
        board.add_category("History".into());
        assert_eq!(board.categories.len(), 3);
        assert_eq!(board.categories[2].questions.len(), 2);
        board.validate().unwrap();

        board.remove_category(0).unwrap();
        assert_eq!(board.categories.len(), 2);
        assert_eq!(board.categories[1].name, "History");
        board.validate().unwrap();

        assert_eq!(board.remove_category(9), Err(GameError::BadCoordinates));
    }

    #[test]
    fn rename_keeps_question_content() {
        let mut board = science_board();
        board.rename_category(0, "Nature".into()).unwrap();
        assert_eq!(board.categories[0].name, "Nature");
        assert_eq!(
            board.categories[0].questions[0].content.text.as_deref(),
            Some("Q1")
        );
        assert_eq!(board.categories[0].questions[1].answer, "A2");
    }

    #[test]
    fn instantiate_matches_source_and_is_independent() {
        let mut source = science_board();
        // Stale flag on the authoring copy must not leak into play
        source.categories[0].questions[0].asked = true;

        let mut playable = source.instantiate_for_play();
        assert_eq!(playable.categories[0].name, "Science");
        assert_eq!(playable.categories[0].questions[0].points, 100);
        assert_eq!(playable.categories[0].questions[1].points, 200);
        assert!(playable.categories[0].questions.iter().all(|q| !q.asked));

        playable.mark_asked(0, 1).unwrap();
        playable.categories[0].questions[1].answer = "mutated".into();
        assert!(!source.categories[0].questions[1].asked);
        assert_eq!(source.categories[0].questions[1].answer, "A2");
    }

    #[test]
    fn mark_asked_rejects_a_second_selection() {
        let mut playable = science_board().instantiate_for_play();
        let q = playable.mark_asked(0, 0).unwrap();
        assert_eq!(q.points, 100);
        assert_eq!(playable.mark_asked(0, 0), Err(GameError::QuestionAsked));
        assert_eq!(playable.mark_asked(3, 0), Err(GameError::BadCoordinates));
    }

    #[test]
    fn completion_requires_every_cell() {
        let mut playable = science_board().instantiate_for_play();
        assert!(!playable.is_complete());
        playable.mark_asked(0, 0).unwrap();
        assert!(!playable.is_complete());
        playable.mark_asked(0, 1).unwrap();
        assert!(playable.is_complete());
    }

    #[tokio::test]
    async fn authoring_is_setup_only() {
        use crate::state::AppState;

        let state = AppState::new();
        let (code, _cap, _rx) = state.create_room(3).await;
        state
            .author_add_category(&code, RoundKind::Normal, "History".into())
            .await
            .unwrap();
        state
            .author_rename_category(&code, RoundKind::Double, 0, "Myths".into())
            .await
            .unwrap();
        state
            .author_edit_question(&code, RoundKind::Normal, 0, 0, MediaContent::text("Q"), "A".into())
            .await
            .unwrap();

        {
            let rooms = state.rooms.read().await;
            let session = rooms.get(&code).unwrap();
            assert_eq!(session.normal_board.categories.len(), 6);
            assert_eq!(session.double_board.categories[0].name, "Myths");
            assert_eq!(session.normal_board.categories[0].questions[0].answer, "A");
        }

        state
            .start_round(&code, crate::types::RoundKind::Normal, None)
            .await
            .unwrap();
        assert_eq!(
            state
                .author_add_category(&code, RoundKind::Normal, "Nope".into())
                .await
                .err(),
            Some(GameError::BadStage(Stage::Normal))
        );
    }

    #[test]
    fn validate_rejects_malformed_wire_boards() {
        let mut ragged = Board::create(vec!["A".into(), "B".into()], vec![100, 200]);
        ragged.categories[1].questions.pop();
        assert!(matches!(ragged.validate(), Err(GameError::BadBoard(_))));

        let mut zero = Board::create(vec!["A".into()], vec![100]);
        zero.categories[0].questions[0].points = 0;
        assert!(matches!(zero.validate(), Err(GameError::BadBoard(_))));

        let empty = Board::create(vec![], vec![100]);
        assert_eq!(empty.validate(), Err(GameError::EmptyBoard));
    }
}
