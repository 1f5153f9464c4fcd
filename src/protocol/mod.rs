// Protocol module: message types, error payloads, close codes and join codes

pub mod close_codes;
pub mod error;
pub mod join_codes;
pub mod messages;
pub mod types;

pub use close_codes::CloseCode;
pub use error::ErrorPayload;
pub use join_codes::{JoinCodeMint, MIN_CODE_LENGTH};
pub use messages::{ClientMessage, ServerHelloPayload, ServerMessage, ServerStartGamePayload};
pub use types::{
    GameOver, LobbyId, PieceId, PlayerId, PlayerInfo, PlayerMove, PlayerPiecePosition, SessionId,
};
