use serde::{Deserialize, Serialize};

use crate::game::{BoardPlatform, TimelineEvent};

use super::error::ErrorPayload;
use super::types::{GameOver, PlayerInfo, PlayerMove, PlayerPiecePosition, SessionId};

/// Message types sent from client to server.
///
/// Wire envelope: `{ "type": "<tag>", "payload": { ... } }`. The union is
/// closed; an unknown tag fails deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Host-only: build the platform and start the game
    HostStartGame { platform: BoardPlatform },
    /// The sender's piece actions for the current round
    PlayerMoves { moves: Vec<PlayerMove> },
    /// The sender finished animating the round result
    ReadyForNextRound {},
}

/// Payload for the ServerHello server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerHelloPayload {
    /// Private session id; lets the player reconnect to the lobby after a
    /// disconnect. Never broadcast to other players.
    pub session_id: SessionId,
    pub is_host: bool,
    pub player: PlayerInfo,
    /// Other players already in the lobby.
    pub other_players: Vec<PlayerInfo>,
}

/// Payload for the ServerStartGame server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStartGamePayload {
    pub platform: BoardPlatform,
    pub players: Vec<PlayerInfo>,
    pub pieces: Vec<PlayerPiecePosition>,
    /// Time until the first round starts, in seconds.
    pub round_start_in: f64,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message after joining (boxed to reduce enum size)
    ServerHello(Box<ServerHelloPayload>),
    /// Another player joined, or came back after a disconnect
    PlayerJoined { player: PlayerInfo, reconnect: bool },
    /// Another player left for good
    PlayerLeft { player: PlayerInfo },
    /// The host started the game (boxed to reduce enum size)
    ServerStartGame(Box<ServerStartGamePayload>),
    /// A new round is open for move submission
    RoundStart {
        round_number: u32,
        /// How long moves are accepted, in seconds
        round_duration: f64,
        board_state: Vec<PlayerPiecePosition>,
    },
    /// The resolved timeline for the round just played
    RoundResult {
        timeline: Vec<TimelineEvent>,
        game_over: Option<GameOver>,
    },
    /// Request-scoped error reply, sent only to the offending player
    Error(ErrorPayload),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{PieceAction, Position, TileType};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_client_message_tags() {
        let raw = json!({
            "type": "player_moves",
            "payload": {
                "moves": [
                    { "piece_id": Uuid::nil(), "action": "move_up" },
                    { "piece_id": Uuid::nil(), "action": "no_action" },
                ]
            }
        });
        let msg: ClientMessage = serde_json::from_value(raw).unwrap();
        let ClientMessage::PlayerMoves { moves } = msg else {
            panic!("wrong variant");
        };
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].action, PieceAction::MoveUp);
    }

    #[test]
    fn test_ready_for_next_round_empty_payload() {
        let raw = json!({ "type": "ready_for_next_round", "payload": {} });
        let msg: ClientMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg, ClientMessage::ReadyForNextRound {});

        let json = serde_json::to_value(&ClientMessage::ReadyForNextRound {}).unwrap();
        assert_eq!(json["type"], "ready_for_next_round");
    }

    #[test]
    fn test_host_start_game_platform_tiles() {
        let raw = json!({
            "type": "host_start_game",
            "payload": {
                "platform": {
                    "tiles": [
                        {
                            "position": { "x": 0, "y": 0 },
                            "texture_id": "grass",
                            "tile_type": "floor"
                        },
                        {
                            "position": { "x": 1, "y": 0 },
                            "texture_id": "hole",
                            "tile_type": "void"
                        }
                    ]
                }
            }
        });
        let msg: ClientMessage = serde_json::from_value(raw).unwrap();
        let ClientMessage::HostStartGame { platform } = msg else {
            panic!("wrong variant");
        };
        assert_eq!(platform.tiles.len(), 2);
        assert_eq!(platform.tiles[0].tile_type, TileType::Floor);
        assert_eq!(platform.tiles[1].position, Position::new(1, 0));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let raw = json!({ "type": "matchmake", "payload": {} });
        assert!(serde_json::from_value::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn test_server_message_envelope() {
        let hello = ServerMessage::ServerHello(Box::new(ServerHelloPayload {
            session_id: Uuid::nil(),
            is_host: true,
            player: PlayerInfo {
                id: Uuid::nil(),
                number: 1,
            },
            other_players: vec![],
        }));
        let json = serde_json::to_value(&hello).unwrap();
        assert_eq!(json["type"], "server_hello");
        assert_eq!(json["payload"]["is_host"], true);
        assert_eq!(json["payload"]["player"]["number"], 1);

        let round_trip: ServerMessage = serde_json::from_value(json).unwrap();
        assert_eq!(round_trip, hello);
    }

    #[test]
    fn test_round_result_round_trip() {
        let msg = ServerMessage::RoundResult {
            timeline: vec![TimelineEvent::new()],
            game_over: Some(GameOver {
                winner_player_id: Some(Uuid::nil()),
            }),
        };
        let text = serde_json::to_string(&msg).unwrap();
        let parsed: ServerMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, msg);
    }
}
