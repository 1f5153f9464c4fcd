//! Game pacing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_duration_per_event_secs, default_pieces_per_player, default_player_reconnect_secs,
    default_pre_game_duration_secs, default_round_duration_secs, default_round_grace_secs,
};

/// Timings and sizes driving the per-lobby round loop.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GameConfig {
    /// How long a round accepts player moves (seconds)
    #[serde(default = "default_round_duration_secs")]
    pub round_duration_secs: f64,
    /// Extra time granted to stragglers after the round deadline (seconds)
    #[serde(default = "default_round_grace_secs")]
    pub round_grace_secs: f64,
    /// Countdown between game start and the first round (seconds)
    #[serde(default = "default_pre_game_duration_secs")]
    pub pre_game_duration_secs: f64,
    /// How long a disconnected player may reconnect before being dropped (seconds)
    #[serde(default = "default_player_reconnect_secs")]
    pub player_reconnect_secs: f64,
    /// Client animation budget per timeline event (seconds)
    #[serde(default = "default_duration_per_event_secs")]
    pub duration_per_event_secs: f64,
    /// Starting pieces per player, capped by platform capacity
    #[serde(default = "default_pieces_per_player")]
    pub pieces_per_player: u32,
}

impl GameConfig {
    pub fn round_duration(&self) -> Duration {
        Duration::from_secs_f64(self.round_duration_secs)
    }

    pub fn round_grace(&self) -> Duration {
        Duration::from_secs_f64(self.round_grace_secs)
    }

    pub fn pre_game_duration(&self) -> Duration {
        Duration::from_secs_f64(self.pre_game_duration_secs)
    }

    pub fn player_reconnect(&self) -> Duration {
        Duration::from_secs_f64(self.player_reconnect_secs)
    }

    pub fn duration_per_event(&self) -> Duration {
        Duration::from_secs_f64(self.duration_per_event_secs)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_duration_secs: default_round_duration_secs(),
            round_grace_secs: default_round_grace_secs(),
            pre_game_duration_secs: default_pre_game_duration_secs(),
            player_reconnect_secs: default_player_reconnect_secs(),
            duration_per_event_secs: default_duration_per_event_secs(),
            pieces_per_player: default_pieces_per_player(),
        }
    }
}
