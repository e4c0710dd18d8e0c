//! Score ledger
//!
//! Authoritative player → score mapping. All mutation goes through
//! [`ScoreLedger::apply_delta`] under the session authority's write lock;
//! every mutation is followed by a broadcast of the *full* snapshot so a
//! client that missed intermediate events still converges.

use crate::error::GameError;
use crate::types::{Player, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the broadcast score snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerScore {
    pub id: PlayerId,
    pub name: String,
    pub score: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreLedger {
    entries: HashMap<PlayerId, i64>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero entries for everyone currently joined (round start).
    pub fn init_players(&mut self, players: &[Player]) {
        self.entries = players.iter().map(|p| (p.id.clone(), 0)).collect();
    }

    /// Late joiners enter the ledger at zero; existing scores are untouched.
    pub fn ensure(&mut self, player_id: &PlayerId) {
        self.entries.entry(player_id.clone()).or_insert(0);
    }

    pub fn get(&self, player_id: &str) -> i64 {
        self.entries.get(player_id).copied().unwrap_or(0)
    }

    /// Apply a signed delta and return the player's new score. Scores may go
    /// negative.
    pub fn apply_delta(&mut self, player_id: &str, delta: i64) -> Result<i64, GameError> {
        let entry = self
            .entries
            .get_mut(player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.to_string()))?;
        *entry += delta;
        Ok(*entry)
    }

    /// Full snapshot in player join order; departed players are omitted.
    pub fn snapshot(&self, players: &[Player]) -> Vec<PlayerScore> {
        players
            .iter()
            .map(|p| PlayerScore {
                id: p.id.clone(),
                name: p.name.clone(),
                score: self.get(&p.id),
            })
            .collect()
    }
}
