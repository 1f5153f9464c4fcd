use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::protocol::{PlayerId, PlayerInfo, SessionId};

use super::connection::Connection;

/// A player attached to a lobby: identity, reconnect secret, the live
/// channel, and the task polling it.
///
/// The channel and poll task are swapped on reconnect; the number is
/// reassigned when earlier players leave.
#[derive(Debug)]
pub struct Player {
    player_id: PlayerId,
    session_id: SessionId,
    number: AtomicU32,
    connection: Mutex<Arc<Connection>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    pub fn new(number: u32, connection: Arc<Connection>) -> Self {
        Self {
            player_id: PlayerId::new_v4(),
            session_id: SessionId::new_v4(),
            number: AtomicU32::new(number),
            connection: Mutex::new(connection),
            poll_task: Mutex::new(None),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn number(&self) -> u32 {
        self.number.load(Ordering::Relaxed)
    }

    pub fn set_number(&self, number: u32) {
        self.number.store(number, Ordering::Relaxed);
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.player_id,
            number: self.number(),
        }
    }

    pub fn connection(&self) -> Arc<Connection> {
        self.connection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Install the channel of a reconnecting player.
    pub fn replace_connection(&self, connection: Arc<Connection>) {
        *self
            .connection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = connection;
    }

    /// Install a new poll task, cancelling the previous one. The old task
    /// observes the cancellation at its next suspension point and exits
    /// without running its disconnect branch.
    pub fn set_poll_task(&self, task: Option<JoinHandle<()>>) {
        let mut slot = self
            .poll_task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(existing) = slot.take() {
            existing.abort();
        }
        *slot = task;
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.set_poll_task(None);
    }
}
