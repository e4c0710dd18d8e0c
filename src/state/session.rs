//! One game room: participants, boards, phase, and the room's event channel.

use std::time::Instant;
use tokio::sync::broadcast;

use crate::protocol::{ActiveQuestionView, BoardView, FinalRoundView, RoomSnapshot, ServerMessage};
use crate::state::board::{Board, PlayableBoard};
use crate::state::final_round::FinalRound;
use crate::state::question::ActiveQuestion;
use crate::state::score::{PlayerScore, ScoreLedger};
use crate::types::*;

/// Per-room broadcast buffer; a client that lags this far behind misses
/// messages and should rejoin for a fresh snapshot.
const BROADCAST_CAPACITY: usize = 100;

pub struct Session {
    pub code: RoomCode,
    pub capacity: usize,
    pub stage: Stage,
    pub host_connected: bool,
    /// Join order; doubles as the tie-break order for final results
    pub players: Vec<Player>,
    pub normal_board: Board,
    pub double_board: Board,
    pub playable: Option<PlayableBoard>,
    pub active_question: Option<ActiveQuestion>,
    pub final_round: Option<FinalRound>,
    pub scores: ScoreLedger,
    pub chat: Vec<ChatMessage>,
    pub last_activity: Instant,
    tx: broadcast::Sender<ServerMessage>,
}

impl Session {
    pub fn new(code: RoomCode, capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            code,
            capacity: capacity.clamp(MIN_CAPACITY, MAX_CAPACITY),
            stage: Stage::Setup,
            host_connected: true,
            players: Vec::new(),
            normal_board: Board::numbered("Category", 5, NORMAL_POINT_VALUES),
            double_board: Board::numbered("Double", 5, DOUBLE_POINT_VALUES),
            playable: None,
            active_question: None,
            final_round: None,
            scores: ScoreLedger::new(),
            chat: Vec::new(),
            last_activity: Instant::now(),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    /// Callers hold the registry's write lock while broadcasting, so every
    /// subscriber observes state-change events in one total order per room.
    pub fn broadcast(&self, msg: ServerMessage) {
        // A send error just means nobody is subscribed right now
        let _ = self.tx.send(msg);
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn connections(&self) -> usize {
        self.players.len() + usize::from(self.host_connected)
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn board(&self, kind: RoundKind) -> &Board {
        match kind {
            RoundKind::Normal => &self.normal_board,
            RoundKind::Double => &self.double_board,
        }
    }

    pub fn board_mut(&mut self, kind: RoundKind) -> &mut Board {
        match kind {
            RoundKind::Normal => &mut self.normal_board,
            RoundKind::Double => &mut self.double_board,
        }
    }

    /// Board-completion predicate over the in-play board; false when no
    /// round is in play.
    pub fn board_complete(&self) -> bool {
        self.playable.as_ref().is_some_and(|b| b.is_complete())
    }

    pub fn score_snapshot(&self) -> Vec<PlayerScore> {
        self.scores.snapshot(&self.players)
    }

    /// Full-state view used to bring a (re)connecting client consistent.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            stage: self.stage,
            capacity: self.capacity,
            players: self.players.clone(),
            scores: self.score_snapshot(),
            board: self.playable.as_ref().map(BoardView::from),
            question: self.active_question.as_ref().map(ActiveQuestionView::from),
            final_round: self
                .final_round
                .as_ref()
                .map(|fr| FinalRoundView::of(fr, &self.players)),
            chat: self.chat.clone(),
        }
    }
}
