// Game module: grid primitives, platforms, push resolution and timelines

pub mod board;
pub mod grid;
pub mod platform;
pub mod timeline;


pub use board::{Board, BoardError, IllegalMove};
pub use grid::{Direction, PieceAction, Position};
pub use platform::{BoardPlatform, BoardPlatformTile, Platform, TileType};
pub use timeline::{
    MoveConflictOutcomePayload, Outcome, PushConflictOutcomePayload, PushOutcomePayload,
    TimelineEvent, TimelineEventAction,
};
