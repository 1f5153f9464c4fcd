use std::collections::{BTreeSet, HashSet};

use rand::RngExt;
use serde::{Deserialize, Serialize};

use super::grid::Position;

/// Tile classification inside a client-defined platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    Void,
    Floor,
}

impl TileType {
    /// A floor tile is on-board; a void tile is off-board.
    pub fn is_off_board(self) -> bool {
        self == Self::Void
    }
}

/// One tile of a client-defined platform, as sent by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPlatformTile {
    pub position: Position,
    /// Purely cosmetic; echoed back to clients untouched (e.g. "grass", "sand").
    pub texture_id: String,
    pub tile_type: TileType,
}

/// The wire model of a platform: an explicit tile list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPlatform {
    pub tiles: Vec<BoardPlatformTile>,
}

/// Which grid positions count as on-board for a given game.
///
/// Pieces pushed onto an off-board position fall off and are removed.
#[derive(Debug, Clone)]
pub enum Platform {
    /// Every position is on-board. Random placement draws from a bounded
    /// window so pieces still start near each other.
    Infinite,
    /// All positions within the inclusive rectangle are on-board.
    Rectangle {
        top_left: Position,
        bottom_right: Position,
    },
    /// Exactly the floor tiles of a client-defined tile list are on-board.
    ClientDefined { floor: BTreeSet<Position> },
}

impl Platform {
    pub fn rectangle(top_left: Position, bottom_right: Position) -> Self {
        Self::Rectangle {
            top_left,
            bottom_right,
        }
    }

    pub fn from_model(model: &BoardPlatform) -> Self {
        let floor = model
            .tiles
            .iter()
            .filter(|tile| !tile.tile_type.is_off_board())
            .map(|tile| tile.position)
            .collect();
        Self::ClientDefined { floor }
    }

    pub fn is_position_on_board(&self, pos: Position) -> bool {
        match self {
            Self::Infinite => true,
            Self::Rectangle {
                top_left,
                bottom_right,
            } => {
                (top_left.x..=bottom_right.x).contains(&pos.x)
                    && (top_left.y..=bottom_right.y).contains(&pos.y)
            }
            Self::ClientDefined { floor } => floor.contains(&pos),
        }
    }

    /// Number of on-board positions, or `None` when unbounded.
    pub fn on_board_positions(&self) -> Option<u64> {
        match self {
            Self::Infinite => None,
            Self::Rectangle {
                top_left,
                bottom_right,
            } => {
                let width = u64::from(bottom_right.x.abs_diff(top_left.x)) + 1;
                let height = u64::from(bottom_right.y.abs_diff(top_left.y)) + 1;
                Some(width * height)
            }
            Self::ClientDefined { floor } => Some(floor.len() as u64),
        }
    }

    /// A uniformly random on-board position outside `exclude`, or `None`
    /// when the platform has no free position left.
    pub fn random_position_on_board<R: RngExt>(
        &self,
        rng: &mut R,
        exclude: &HashSet<Position>,
    ) -> Option<Position> {
        match self {
            Self::Infinite => {
                const WINDOW_BITS: u32 = 16;
                let center = rng.random_range(0..1i32 << WINDOW_BITS);
                loop {
                    let x = rng.random_range(0..1i32 << WINDOW_BITS) - center;
                    let y = rng.random_range(0..1i32 << WINDOW_BITS) - center;
                    let pos = Position::new(x, y);
                    if !exclude.contains(&pos) {
                        return Some(pos);
                    }
                }
            }
            Self::Rectangle {
                top_left,
                bottom_right,
            } => {
                if exclude.is_empty() {
                    let x = rng.random_range(top_left.x..=bottom_right.x);
                    let y = rng.random_range(top_left.y..=bottom_right.y);
                    return Some(Position::new(x, y));
                }

                let choices: Vec<Position> = (top_left.x..=bottom_right.x)
                    .flat_map(|x| (top_left.y..=bottom_right.y).map(move |y| Position::new(x, y)))
                    .filter(|pos| !exclude.contains(pos))
                    .collect();
                pick(rng, &choices)
            }
            Self::ClientDefined { floor } => {
                let choices: Vec<Position> = floor
                    .iter()
                    .copied()
                    .filter(|pos| !exclude.contains(pos))
                    .collect();
                pick(rng, &choices)
            }
        }
    }
}

fn pick<R: RngExt>(rng: &mut R, choices: &[Position]) -> Option<Position> {
    if choices.is_empty() {
        return None;
    }
    Some(choices[rng.random_range(0..choices.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn floor_row(len: i32) -> BoardPlatform {
        BoardPlatform {
            tiles: (0..len)
                .map(|x| BoardPlatformTile {
                    position: Position::new(x, 0),
                    texture_id: "grass".to_string(),
                    tile_type: TileType::Floor,
                })
                .collect(),
        }
    }

    #[test]
    fn test_tile_type_orientation() {
        assert!(TileType::Void.is_off_board());
        assert!(!TileType::Floor.is_off_board());
    }

    #[test]
    fn test_rectangle_bounds_inclusive() {
        let platform = Platform::rectangle(Position::new(0, 0), Position::new(3, 1));
        assert!(platform.is_position_on_board(Position::new(0, 0)));
        assert!(platform.is_position_on_board(Position::new(3, 1)));
        assert!(!platform.is_position_on_board(Position::new(4, 0)));
        assert!(!platform.is_position_on_board(Position::new(0, -1)));
        assert_eq!(platform.on_board_positions(), Some(8));
    }

    #[test]
    fn test_client_defined_void_tiles_are_off_board() {
        let mut model = floor_row(3);
        model.tiles.push(BoardPlatformTile {
            position: Position::new(3, 0),
            texture_id: "hole".to_string(),
            tile_type: TileType::Void,
        });

        let platform = Platform::from_model(&model);
        assert!(platform.is_position_on_board(Position::new(2, 0)));
        assert!(!platform.is_position_on_board(Position::new(3, 0)));
        assert!(!platform.is_position_on_board(Position::new(0, 1)));
        assert_eq!(platform.on_board_positions(), Some(3));
    }

    #[test]
    fn test_infinite_is_unbounded() {
        let platform = Platform::Infinite;
        assert!(platform.is_position_on_board(Position::new(i32::MIN / 2, i32::MAX / 2)));
        assert_eq!(platform.on_board_positions(), None);
    }

    #[test]
    fn test_random_position_respects_exclusions() {
        let platform = Platform::from_model(&floor_row(4));
        let mut rng = StdRng::seed_from_u64(7);

        let mut taken = HashSet::new();
        for _ in 0..4 {
            let pos = platform
                .random_position_on_board(&mut rng, &taken)
                .expect("free position available");
            assert!(platform.is_position_on_board(pos));
            assert!(taken.insert(pos));
        }
        assert_eq!(platform.random_position_on_board(&mut rng, &taken), None);
    }

    #[test]
    fn test_infinite_random_position_avoids_exclusions() {
        let mut rng = StdRng::seed_from_u64(3);
        let first = Platform::Infinite
            .random_position_on_board(&mut rng, &HashSet::new())
            .unwrap();
        let exclude: HashSet<Position> = [first].into_iter().collect();
        let second = Platform::Infinite
            .random_position_on_board(&mut rng, &exclude)
            .unwrap();
        assert_ne!(first, second);
    }
}
