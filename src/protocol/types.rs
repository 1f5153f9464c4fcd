use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{PieceAction, Position};

/// Unique identifier for players
pub type PlayerId = Uuid;
/// Unique identifier for pieces
pub type PieceId = Uuid;
/// Unique identifier for lobbies
pub type LobbyId = Uuid;
/// Private per-player reconnect secret
pub type SessionId = Uuid;

/// Public identity of a player inside a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Globally unique identifier of the player
    pub id: PlayerId,
    /// Human-friendly identifier, 1..N, only unique within the lobby
    pub number: u32,
}

/// A piece and where it currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPiecePosition {
    pub player_id: PlayerId,
    pub piece_id: PieceId,
    pub position: Position,
}

/// One planned piece action submitted by a player for the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMove {
    pub piece_id: PieceId,
    pub action: PieceAction,
}

/// Terminal result of a game; `None` winner means everyone was eliminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    pub winner_player_id: Option<PlayerId>,
}
