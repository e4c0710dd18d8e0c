//! Wire protocol
//!
//! A closed, tagged set of intent and broadcast messages. Anything the
//! server cannot parse into [`ClientMessage`] is rejected at the boundary.
//! View types redact answer text until the corresponding reveal: clients
//! only ever learn an answer through an explicit host reveal.

use crate::state::board::{Board, MediaContent, PlayableBoard};
use crate::state::final_round::{FinalResultEntry, FinalRound};
use crate::state::question::ActiveQuestion;
use crate::state::score::PlayerScore;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens a room and makes this connection its host
    CreateRoom {
        capacity: usize,
    },
    JoinRoom {
        code: RoomCode,
        name: String,
    },
    UpdateCapacity {
        capacity: usize,
    },
    SendChat {
        sender: String,
        text: String,
    },
    // Board authoring (host, setup stage only)
    AddCategory {
        round: RoundKind,
        name: String,
    },
    RemoveCategory {
        round: RoundKind,
        index: usize,
    },
    RenameCategory {
        round: RoundKind,
        index: usize,
        name: String,
    },
    EditQuestion {
        round: RoundKind,
        category: usize,
        row: usize,
        content: MediaContent,
        answer: String,
    },
    /// Leaves setup. An attached board replaces the stored authoring board
    /// before it is snapshotted for play.
    StartRound {
        kind: RoundKind,
        #[serde(default)]
        board: Option<Board>,
    },
    AdvanceStage {
        stage: Stage,
        #[serde(default)]
        board: Option<Board>,
    },
    // Question lifecycle (host)
    SelectQuestion {
        category: usize,
        row: usize,
    },
    RevealAnswer,
    AllocatePoints {
        player_id: PlayerId,
        delta: i64,
    },
    CloseQuestion,
    // Final round
    RevealFinalCategory {
        category: String,
    },
    StartFinalRound {
        question: FinalQuestion,
    },
    SubmitFinalWager {
        wager: i64,
    },
    SubmitFinalAnswer {
        answer: String,
    },
    /// Correctness judgments are host-supplied; players missing from the map
    /// are judged incorrect.
    RevealFinalResults {
        judgments: HashMap<PlayerId, bool>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
    },
    RoomCreated {
        code: RoomCode,
        capacity: usize,
    },
    /// Reply to a successful join; carries the full state snapshot so a
    /// reconnecting client converges in one message.
    RoomJoined {
        code: RoomCode,
        player_id: PlayerId,
        snapshot: RoomSnapshot,
    },
    PlayersUpdated {
        players: Vec<Player>,
    },
    ChatUpdated {
        messages: Vec<ChatMessage>,
    },
    RoundStarted {
        stage: Stage,
        board: BoardView,
        scores: Vec<PlayerScore>,
    },
    StageAdvanced {
        stage: Stage,
        #[serde(skip_serializing_if = "Option::is_none")]
        board: Option<BoardView>,
    },
    QuestionOpened {
        question: ActiveQuestionView,
    },
    CellMarked {
        category: usize,
        row: usize,
    },
    /// Reveal (Some, with answer) and close (None) both land here
    QuestionModal {
        question: Option<ActiveQuestionView>,
    },
    ScoreSnapshot {
        scores: Vec<PlayerScore>,
    },
    /// Whether the host's advance affordance should be shown
    BoardCompletion {
        complete: bool,
    },
    FinalCategoryRevealed {
        category: String,
    },
    FinalWagersUpdated {
        wagers: HashMap<PlayerId, i64>,
        all_submitted: bool,
    },
    FinalRoundStarted {
        question: FinalQuestionView,
    },
    FinalAnswersUpdated {
        all_submitted: bool,
    },
    FinalResults {
        answer: String,
        results: Vec<FinalResultEntry>,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Host-authored final question as it arrives over the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalQuestion {
    pub category: String,
    pub content: MediaContent,
    pub answer: String,
}

/// What players see of the final question (no answer)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalQuestionView {
    pub category: String,
    pub content: MediaContent,
}

/// One cell as broadcast to clients: value and asked flag only. Content and
/// answers stay server-side until the cell is selected/revealed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellView {
    pub points: u32,
    pub asked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryView {
    pub name: String,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardView {
    pub categories: Vec<CategoryView>,
}

impl From<&PlayableBoard> for BoardView {
    fn from(board: &PlayableBoard) -> Self {
        Self {
            categories: board
                .categories
                .iter()
                .map(|cat| CategoryView {
                    name: cat.name.clone(),
                    cells: cat
                        .questions
                        .iter()
                        .map(|q| CellView {
                            points: q.points,
                            asked: q.asked,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// The open question as clients see it; the answer only appears once revealed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveQuestionView {
    pub category: usize,
    pub row: usize,
    pub points: u32,
    pub content: MediaContent,
    pub revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl From<&ActiveQuestion> for ActiveQuestionView {
    fn from(q: &ActiveQuestion) -> Self {
        Self {
            category: q.category,
            row: q.row,
            points: q.points,
            content: q.content.clone(),
            revealed: q.revealed,
            answer: q.revealed.then(|| q.answer.clone()),
        }
    }
}

/// Final-round state as clients see it, gated by the two revelation flags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalRoundView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<FinalQuestionView>,
    pub wagers: HashMap<PlayerId, i64>,
    pub wagers_complete: bool,
    pub answers_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<FinalResultEntry>>,
}

impl FinalRoundView {
    pub fn of(fr: &FinalRound, players: &[Player]) -> Self {
        Self {
            category: fr.category_revealed.then(|| fr.category.clone()),
            question: fr.question_revealed.then(|| FinalQuestionView {
                category: fr.category.clone(),
                content: fr.content.clone(),
            }),
            wagers: fr.wagers.clone(),
            wagers_complete: fr.wagers_complete(players),
            answers_complete: fr.answers_complete(players),
            results: fr.results.clone(),
        }
    }
}

/// Everything a (re)connecting client needs to render the room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub stage: Stage,
    pub capacity: usize,
    pub players: Vec<Player>,
    pub scores: Vec<PlayerScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<ActiveQuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_round: Option<FinalRoundView>,
    pub chat: Vec<ChatMessage>,
}
