use serde::{Deserialize, Serialize};

/// A cell on the (conceptually unbounded) game grid.
///
/// `y` grows downwards: [`Direction::Up`] decreases `y`, [`Direction::Down`]
/// increases it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The position `steps` cells away in `direction`.
    #[must_use]
    pub fn offset_in_direction(self, direction: Direction, steps: u32) -> Self {
        let steps = steps as i32;
        let Self { mut x, mut y } = self;
        match direction {
            Direction::Up => y -= steps,
            Direction::Down => y += steps,
            Direction::Left => x -= steps,
            Direction::Right => x += steps,
        }
        Self { x, y }
    }
}

/// One of the four cardinal push directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// What a player wants a single piece to do this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceAction {
    NoAction,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
}

impl PieceAction {
    /// `None` for [`PieceAction::NoAction`].
    pub fn as_direction(self) -> Option<Direction> {
        match self {
            Self::NoAction => None,
            Self::MoveUp => Some(Direction::Up),
            Self::MoveDown => Some(Direction::Down),
            Self::MoveLeft => Some(Direction::Left),
            Self::MoveRight => Some(Direction::Right),
        }
    }
}
