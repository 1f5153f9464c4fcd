//! Server behavior configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_gc_interval_secs, default_join_code_min_len, default_max_lobby_lifespan_secs,
    default_max_message_size, default_min_lobby_lifespan_secs,
};

/// Lobby lifecycle and transport limits.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Maximum accepted WebSocket text frame size (bytes)
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Interval of the lobby garbage collector (seconds)
    #[serde(default = "default_gc_interval_secs")]
    pub gc_interval_secs: u64,
    /// Lobbies younger than this are never reaped (seconds)
    #[serde(default = "default_min_lobby_lifespan_secs")]
    pub min_lobby_lifespan_secs: u64,
    /// Lobbies older than this are always reaped (seconds)
    #[serde(default = "default_max_lobby_lifespan_secs")]
    pub max_lobby_lifespan_secs: u64,
    /// Minimum join code length; bumped on collision, reset after GC
    #[serde(default = "default_join_code_min_len")]
    pub join_code_min_len: usize,
}

impl ServerConfig {
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }

    pub fn min_lobby_lifespan(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.min_lobby_lifespan_secs as i64)
    }

    pub fn max_lobby_lifespan(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_lobby_lifespan_secs as i64)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            gc_interval_secs: default_gc_interval_secs(),
            min_lobby_lifespan_secs: default_min_lobby_lifespan_secs(),
            max_lobby_lifespan_secs: default_max_lobby_lifespan_secs(),
            join_code_min_len: default_join_code_min_len(),
        }
    }
}
