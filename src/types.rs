use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type RoomCode = String;

/// Session phases, strictly forward: setup → normal → double → final → results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Setup,
    Normal,
    Double,
    Final,
    Results,
}

/// Which of the two authored boards an intent targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundKind {
    Normal,
    Double,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Player,
}

/// A joined, currently-connected player. Scores live in the ledger, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
    pub ts: String,
}

/// Room capacity bounds; capacities outside this range are clamped.
pub const MIN_CAPACITY: usize = 2;
pub const MAX_CAPACITY: usize = 10;

/// Point rows a fresh normal-round board is generated with
pub const NORMAL_POINT_VALUES: &[u32] = &[100, 200, 400, 600, 1000];
/// Point rows a fresh double-round board is generated with
pub const DOUBLE_POINT_VALUES: &[u32] = &[200, 400, 800, 1200, 2000];
