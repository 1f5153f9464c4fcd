use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::IllegalMove;

/// Body of the `error` server message. `kind` is a stable machine-readable
/// discriminator; `extra` carries per-kind context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ErrorPayload {
    pub const KIND_FORBIDDEN: &'static str = "protocol:forbidden";
    pub const KIND_FLOW: &'static str = "protocol:flow";
    pub const KIND_ILLEGAL_MOVE: &'static str = "game:illegal-move";

    fn new(kind: &str, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            message: Some(message.into()),
            extra: BTreeMap::new(),
        }
    }

    pub fn must_be_host() -> Self {
        Self::new(
            Self::KIND_FORBIDDEN,
            "only the host may perform this operation",
        )
    }

    pub fn invalid_lobby_state() -> Self {
        Self::new(
            Self::KIND_FLOW,
            "the lobby isn't in the correct state for this message",
        )
    }

    pub fn unhandled_message() -> Self {
        Self::new(Self::KIND_FLOW, "this message isn't handled by the server")
    }

    pub fn illegal_player_move(illegal: &IllegalMove) -> Self {
        let mut payload = Self::new(Self::KIND_ILLEGAL_MOVE, illegal.reason);
        payload.extra.insert(
            "piece_id".to_string(),
            serde_json::Value::String(illegal.piece_id.to_string()),
        );
        payload
    }
}
