//! Board coordinates and single-step moves.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hard upper bound on board rows.
pub const MAX_ROWS: i16 = 26;
/// Hard upper bound on board columns.
pub const MAX_COLS: i16 = 26;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A (row, col) coordinate. Positions are not bounds-checked on their own;
/// the [`Board`](crate::board::Board) owns the current dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub row: i16,
    pub col: i16,
}

impl Position {
    pub const fn new(row: i16, col: i16) -> Self {
        Self { row, col }
    }

    /// The neighbouring position one step in direction `mv`.
    #[must_use]
    pub fn step(self, mv: Move) -> Position {
        let (dr, dc) = mv.delta();
        Position {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Manhattan distance.
    pub fn distance(self, other: Position) -> u16 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// Every position within Manhattan distance `radius`, including `self`,
    /// in row-major order. Positions may lie off the board.
    pub fn area(self, radius: u16) -> impl Iterator<Item = Position> {
        let r = radius.min(i16::MAX as u16) as i16;
        (self.row - r..=self.row + r).flat_map(move |row| {
            (self.col - r..=self.col + r)
                .map(move |col| Position { row, col })
                .filter(move |p| p.distance(self) <= radius)
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// One orthogonal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    #[serde(rename = "n")]
    North,
    #[serde(rename = "e")]
    East,
    #[serde(rename = "s")]
    South,
    #[serde(rename = "w")]
    West,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::North, Move::East, Move::South, Move::West];

    /// (row, col) delta; north is towards row 0.
    pub fn delta(self) -> (i16, i16) {
        match self {
            Move::North => (-1, 0),
            Move::East => (0, 1),
            Move::South => (1, 0),
            Move::West => (0, -1),
        }
    }
}
