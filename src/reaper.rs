//! Idle-room reaper
//!
//! Sessions live only in memory, so abandoned rooms would otherwise pile up
//! forever. A room with zero connected participants gets a grace period
//! (players can still rejoin with the code) and is destroyed after that.

use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// How long an empty room survives before it is destroyed
pub const IDLE_TTL: Duration = Duration::from_secs(5 * 60);

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the background task that periodically destroys abandoned rooms.
pub fn spawn_room_reaper(state: Arc<AppState>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;
            let reaped = state.sweep_idle_rooms(IDLE_TTL).await;
            if reaped > 0 {
                tracing::info!(reaped, "destroyed idle rooms");
            }
        }
    });
}
