use serde::{Deserialize, Serialize};

use crate::protocol::{PieceId, PlayerId};

use super::grid::{Direction, PieceAction, Position};

/// The intent half of a timeline event: which player asked which piece to do
/// what. Recorded even for moves that end in a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEventAction {
    pub player_id: PlayerId,
    pub piece_id: PieceId,
    pub action: PieceAction,
}

/// A pusher advancing one step, dragging its victim chain along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcomePayload {
    pub pusher_piece_id: PieceId,
    /// Pieces moved along with the pusher, nearest first.
    pub victim_piece_ids: Vec<PieceId>,
    pub direction: Direction,
}

/// Two or more pushers converging on the same empty cell. Nobody moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveConflictOutcomePayload {
    pub piece_ids: Vec<PieceId>,
    pub collision_point: Position,
}

/// A head-on pusher pair, or several pushers contesting the same victim.
/// Nobody moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConflictOutcomePayload {
    pub piece_ids: Vec<PieceId>,
    pub collision_point: Option<Position>,
}

/// One resolved group within a timeline event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Outcome {
    Push(PushOutcomePayload),
    MoveConflict(MoveConflictOutcomePayload),
    PushConflict(PushConflictOutcomePayload),
}

/// One atomic step of a round's resolution. The round's timeline is the
/// ordered sequence of these, replayed by clients as an animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub actions: Vec<TimelineEventAction>,
    pub outcomes: Vec<Outcome>,
}

impl TimelineEvent {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.outcomes.is_empty()
    }
}

impl Default for TimelineEvent {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_outcome_wire_tags() {
        let push = Outcome::Push(PushOutcomePayload {
            pusher_piece_id: Uuid::nil(),
            victim_piece_ids: vec![],
            direction: Direction::Right,
        });
        let json = serde_json::to_value(&push).unwrap();
        assert_eq!(json["type"], "push");
        assert_eq!(json["payload"]["direction"], "right");

        let conflict = Outcome::PushConflict(PushConflictOutcomePayload {
            piece_ids: vec![Uuid::nil()],
            collision_point: None,
        });
        let json = serde_json::to_value(&conflict).unwrap();
        assert_eq!(json["type"], "push_conflict");
        assert!(json["payload"]["collision_point"].is_null());
    }

    #[test]
    fn test_event_serde_round_trip() {
        let event = TimelineEvent {
            actions: vec![TimelineEventAction {
                player_id: Uuid::new_v4(),
                piece_id: Uuid::new_v4(),
                action: PieceAction::MoveUp,
            }],
            outcomes: vec![
                Outcome::MoveConflict(MoveConflictOutcomePayload {
                    piece_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
                    collision_point: Position::new(1, 0),
                }),
                Outcome::Push(PushOutcomePayload {
                    pusher_piece_id: Uuid::new_v4(),
                    victim_piece_ids: vec![Uuid::new_v4()],
                    direction: Direction::Down,
                }),
            ],
        };

        let json = serde_json::to_string(&event).unwrap();
        let parsed: TimelineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_unknown_outcome_tag_rejected() {
        let raw = r#"{"type":"teleport","payload":{}}"#;
        assert!(serde_json::from_str::<Outcome>(raw).is_err());
    }

    #[test]
    fn test_empty_event() {
        assert!(TimelineEvent::new().is_empty());
    }
}
