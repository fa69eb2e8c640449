//! Board and goods for the rails ruleset.
//!
//! The board is a hexagon of axial coordinates; a tile is owned track on one
//! coordinate. There is no track graph: income is simply tiles owned.

use serde::{Deserialize, Serialize};

use crate::core::player::PlayerColor;

/// Board radius used by every rails map.
pub const BOARD_RADIUS: i32 = 3;

/// Track placed on one coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub q: i32,
    pub r: i32,
    pub owner: PlayerColor,
}

/// Placed track, kept sorted by coordinate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub radius: i32,
    pub tiles: Vec<Tile>,
}

impl Board {
    /// Empty board.
    #[must_use]
    pub fn new(radius: i32) -> Self {
        Self {
            radius,
            tiles: Vec::new(),
        }
    }

    /// Whether `(q, r)` lies on the board.
    #[must_use]
    pub fn contains(&self, q: i32, r: i32) -> bool {
        q.abs() <= self.radius && r.abs() <= self.radius && (q + r).abs() <= self.radius
    }

    /// The tile at `(q, r)`, if any.
    #[must_use]
    pub fn tile(&self, q: i32, r: i32) -> Option<&Tile> {
        self.position(q, r).ok().map(|i| &self.tiles[i])
    }

    /// Place a tile. Returns `false` if the coordinate is taken or off-board.
    pub fn place(&mut self, q: i32, r: i32, owner: PlayerColor) -> bool {
        if !self.contains(q, r) {
            return false;
        }
        match self.position(q, r) {
            Ok(_) => false,
            Err(index) => {
                self.tiles.insert(index, Tile { q, r, owner });
                true
            }
        }
    }

    /// Tiles owned by `owner`.
    #[must_use]
    pub fn owned_by(&self, owner: PlayerColor) -> usize {
        self.tiles.iter().filter(|t| t.owner == owner).count()
    }

    /// Number of coordinates on the board. A negative radius has none
    /// but the centre.
    #[must_use]
    pub fn capacity(&self) -> usize {
        let n = self.radius.max(0) as usize;
        3 * n * (n + 1) + 1
    }

    fn position(&self, q: i32, r: i32) -> Result<usize, usize> {
        self.tiles.binary_search_by(|t| (t.q, t.r).cmp(&(q, r)))
    }
}

/// A goods cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Goods {
    Coal,
    Grain,
    Iron,
    Timber,
    Wool,
}

impl Goods {
    pub const ALL: [Goods; 5] = [Goods::Coal, Goods::Grain, Goods::Iron, Goods::Timber, Goods::Wool];
}

impl std::fmt::Display for Goods {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The starting bag: `per_kind` cubes of every kind, in a fixed order.
#[must_use]
pub fn starting_bag(per_kind: usize) -> Vec<Goods> {
    Goods::ALL
        .iter()
        .flat_map(|g| std::iter::repeat(*g).take(per_kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let board = Board::new(BOARD_RADIUS);
        assert!(board.contains(0, 0));
        assert!(board.contains(3, -3));
        assert!(!board.contains(3, 1));
        assert!(!board.contains(-4, 0));
        assert_eq!(board.capacity(), 37);
    }

    #[test]
    fn test_place_keeps_tiles_sorted() {
        let mut board = Board::new(BOARD_RADIUS);
        assert!(board.place(1, 0, PlayerColor::Red));
        assert!(board.place(-1, 2, PlayerColor::Blue));
        assert!(board.place(0, 0, PlayerColor::Red));

        let coords: Vec<_> = board.tiles.iter().map(|t| (t.q, t.r)).collect();
        assert_eq!(coords, vec![(-1, 2), (0, 0), (1, 0)]);
        assert_eq!(board.owned_by(PlayerColor::Red), 2);
    }

    #[test]
    fn test_place_rejects_taken_and_off_board() {
        let mut board = Board::new(BOARD_RADIUS);
        assert!(board.place(0, 0, PlayerColor::Red));
        assert!(!board.place(0, 0, PlayerColor::Blue));
        assert!(!board.place(5, 5, PlayerColor::Blue));
        assert_eq!(board.tile(0, 0).map(|t| t.owner), Some(PlayerColor::Red));
    }

    #[test]
    fn test_starting_bag() {
        let bag = starting_bag(2);
        assert_eq!(bag.len(), 10);
        assert_eq!(bag[0], Goods::Coal);
        assert_eq!(bag[9], Goods::Wool);
    }
}
