use crate::types::{PlayerId, Stage};
use thiserror::Error;

/// Everything that can make the session authority refuse an intent.
///
/// All of these are local to the offending intent: they are surfaced to the
/// originating connection only (or swallowed entirely for permission
/// violations) and never tear down the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("no room with that code")]
    UnknownRoom,
    #[error("room is full")]
    RoomFull,
    #[error("display name must not be empty")]
    EmptyName,
    #[error("not allowed while the session is in the {0:?} stage")]
    BadStage(Stage),
    #[error("stage can only advance forward, one step at a time")]
    BadTransition,
    #[error("board has no categories")]
    EmptyBoard,
    #[error("board is malformed: {0}")]
    BadBoard(&'static str),
    #[error("no category/row at those coordinates")]
    BadCoordinates,
    #[error("that question was already asked")]
    QuestionAsked,
    #[error("another question is still open")]
    QuestionOpen,
    #[error("no question is open")]
    NoActiveQuestion,
    #[error("the answer has not been revealed yet")]
    NotRevealed,
    #[error("point delta must be +/- the question value of {0}")]
    BadDelta(u32),
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("the board still has unasked questions")]
    BoardIncomplete,
    #[error("wager must be between 0 and {0}")]
    WagerOutOfRange(i64),
    #[error("already submitted")]
    DuplicateSubmission,
    #[error("already revealed")]
    AlreadyRevealed,
    #[error("the collection window is not open")]
    CollectionClosed,
    #[error("collection is not complete yet")]
    CollectionIncomplete,
    #[error("this connection has not joined a room")]
    NotInRoom,
}

impl GameError {
    /// Stable wire code for `ServerMessage::Error`
    pub fn code(&self) -> &'static str {
        match self {
            GameError::UnknownRoom => "UNKNOWN_ROOM",
            GameError::RoomFull => "ROOM_FULL",
            GameError::EmptyName => "EMPTY_NAME",
            GameError::BadStage(_) => "BAD_STAGE",
            GameError::BadTransition => "BAD_TRANSITION",
            GameError::EmptyBoard => "EMPTY_BOARD",
            GameError::BadBoard(_) => "BAD_BOARD",
            GameError::BadCoordinates => "BAD_COORDINATES",
            GameError::QuestionAsked => "QUESTION_ASKED",
            GameError::QuestionOpen => "QUESTION_OPEN",
            GameError::NoActiveQuestion => "NO_ACTIVE_QUESTION",
            GameError::NotRevealed => "NOT_REVEALED",
            GameError::BadDelta(_) => "BAD_DELTA",
            GameError::UnknownPlayer(_) => "UNKNOWN_PLAYER",
            GameError::BoardIncomplete => "BOARD_INCOMPLETE",
            GameError::WagerOutOfRange(_) => "WAGER_OUT_OF_RANGE",
            GameError::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            GameError::AlreadyRevealed => "ALREADY_REVEALED",
            GameError::CollectionClosed => "COLLECTION_CLOSED",
            GameError::CollectionIncomplete => "COLLECTION_INCOMPLETE",
            GameError::NotInRoom => "NOT_IN_ROOM",
        }
    }
}
