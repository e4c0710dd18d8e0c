pub mod board;
pub mod final_round;
pub mod question;
pub mod score;
pub mod session;
mod stage;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, RwLock};

use crate::error::GameError;
use crate::protocol::{RoomSnapshot, ServerMessage};
use crate::types::*;
use session::Session;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Shared application state: the room registry.
///
/// Every state-mutating intent takes the write lock, mutates exactly one
/// session and sends its broadcasts before the lock is released. That is the
/// whole concurrency story: one writer at a time per registry, a single
/// total order of broadcasts per room.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomCode, Session>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Run a closure against one session under the write lock.
    pub(crate) async fn with_session<T>(
        &self,
        code: &str,
        f: impl FnOnce(&mut Session) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let mut rooms = self.rooms.write().await;
        let session = rooms.get_mut(code).ok_or(GameError::UnknownRoom)?;
        let out = f(session);
        if out.is_ok() {
            session.touch();
        }
        out
    }

    /// Open a room with this connection as host. Returns the fresh code,
    /// the (clamped) capacity and a subscription to the room's event channel.
    pub async fn create_room(
        &self,
        capacity: usize,
    ) -> (RoomCode, usize, broadcast::Receiver<ServerMessage>) {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };
        let session = Session::new(code.clone(), capacity);
        let capacity = session.capacity;
        let rx = session.subscribe();
        tracing::info!(code = %session.code, capacity, "room created");
        rooms.insert(code.clone(), session);
        (code, capacity, rx)
    }

    /// Join as a player. The reply carries a full room snapshot; everyone
    /// else learns about the newcomer from the broadcasts.
    pub async fn join_room(
        &self,
        code: &str,
        name: &str,
    ) -> Result<(Player, RoomSnapshot, broadcast::Receiver<ServerMessage>), GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }

        let mut rooms = self.rooms.write().await;
        let session = rooms.get_mut(code).ok_or(GameError::UnknownRoom)?;
        if session.players.len() >= session.capacity {
            return Err(GameError::RoomFull);
        }

        let player = Player {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
        };
        session.players.push(player.clone());
        // Mid-game joiners enter the ledger at zero
        if session.stage != Stage::Setup {
            session.scores.ensure(&player.id);
        }

        let rx = session.subscribe();
        session.broadcast(ServerMessage::PlayersUpdated {
            players: session.players.clone(),
        });
        if session.stage != Stage::Setup {
            session.broadcast(ServerMessage::ScoreSnapshot {
                scores: session.score_snapshot(),
            });
        }

        tracing::info!(code = %session.code, player = %player.id, name = %player.name, "player joined");
        let snapshot = session.snapshot();
        session.touch();
        Ok((player, snapshot, rx))
    }

    /// Connection teardown. Player departures shrink the completion
    /// denominators of any open final-round collection, so both predicates
    /// are recomputed and pushed; a host departure leaves the session (and
    /// any open question) exactly as it was.
    pub async fn handle_disconnect(&self, code: &str, role: Role, player_id: Option<&str>) {
        let mut rooms = self.rooms.write().await;
        let Some(session) = rooms.get_mut(code) else {
            return;
        };

        match role {
            Role::Host => {
                session.host_connected = false;
                tracing::info!(code = %session.code, "host disconnected");
            }
            Role::Player => {
                let Some(pid) = player_id else { return };
                let before = session.players.len();
                session.players.retain(|p| p.id != pid);
                if session.players.len() == before {
                    return;
                }
                tracing::info!(code = %session.code, player = %pid, "player disconnected");

                session.broadcast(ServerMessage::PlayersUpdated {
                    players: session.players.clone(),
                });
                if session.stage != Stage::Setup {
                    session.broadcast(ServerMessage::ScoreSnapshot {
                        scores: session.score_snapshot(),
                    });
                }

                if let Some(fr) = &session.final_round {
                    if fr.results.is_none() {
                        if fr.category_revealed && !fr.question_revealed {
                            session.broadcast(ServerMessage::FinalWagersUpdated {
                                wagers: fr.wagers.clone(),
                                all_submitted: fr.wagers_complete(&session.players),
                            });
                        }
                        if fr.question_revealed {
                            session.broadcast(ServerMessage::FinalAnswersUpdated {
                                all_submitted: fr.answers_complete(&session.players),
                            });
                        }
                    }
                }
            }
        }
        session.touch();
    }

    pub async fn send_chat(&self, code: &str, sender: &str, text: &str) -> Result<(), GameError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.with_session(code, |session| {
            session.chat.push(ChatMessage {
                sender: sender.to_string(),
                text: text.to_string(),
                ts: chrono::Utc::now().to_rfc3339(),
            });
            session.broadcast(ServerMessage::ChatUpdated {
                messages: session.chat.clone(),
            });
            Ok(())
        })
        .await
    }

    /// Adjust the player cap. Never kicks players already in the room.
    pub async fn update_capacity(&self, code: &str, capacity: usize) -> Result<usize, GameError> {
        self.with_session(code, |session| {
            session.capacity = capacity.clamp(MIN_CAPACITY, MAX_CAPACITY);
            tracing::info!(code = %session.code, capacity = session.capacity, "capacity updated");
            Ok(session.capacity)
        })
        .await
    }

    /// Drop rooms that have had no connected participants for `ttl`.
    pub async fn sweep_idle_rooms(&self, ttl: Duration) -> usize {
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();
        rooms.retain(|code, session| {
            let keep = session.connections() > 0 || session.last_activity.elapsed() < ttl;
            if !keep {
                tracing::info!(%code, "destroying idle room");
            }
            keep
        });
        before - rooms.len()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
