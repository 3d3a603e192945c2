//! Core type definitions for the simulation.

use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a worm. Ids are handed out in increasing order and never reused,
/// so ordering by id is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WormId(pub u64);

impl WormId {
    /// The id that follows this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for WormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worm#{}", self.0)
    }
}

/// 2D position on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Position one step away in the given direction
    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.to_delta();
        self.add(dx, dy)
    }

    /// Chebyshev distance (king moves) to another position
    pub fn chebyshev_distance(&self, other: &Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// True when `other` is one of the eight cells surrounding this one
    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.chebyshev_distance(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Heading of a worm's head. Variants are listed clockwise starting at north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const COUNT: usize = 8;

    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        Direction::all()
            .into_iter()
            .find(|d| d.to_delta() == (dx.signum(), dy.signum()) && (dx, dy) != (0, 0))
    }

    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::NorthEast,
            Direction::East,
            Direction::SouthEast,
            Direction::South,
            Direction::SouthWest,
            Direction::West,
            Direction::NorthWest,
        ]
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// Rotate clockwise by `eighths` eighths of a full turn
    pub fn turned(&self, eighths: usize) -> Direction {
        Direction::all()[(self.index() + eighths) % Self::COUNT]
    }

    pub fn opposite(&self) -> Direction {
        self.turned(4)
    }

    /// Heading after bouncing off a wall: the horizontal and/or vertical component is
    /// reversed.
    pub fn reflected(&self, flip_x: bool, flip_y: bool) -> Direction {
        let (dx, dy) = self.to_delta();
        let dx = if flip_x { -dx } else { dx };
        let dy = if flip_y { -dy } else { dy };
        Direction::from_delta(dx, dy).unwrap_or(self.opposite())
    }
}

impl Distribution<Direction> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        Direction::all()[rng.gen_range(0..Direction::COUNT)]
    }
}

/// The three kinds of worm. Behavior for each kind lives in the type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WormKind {
    Vegetarian,
    Scissorhead,
    Cannibal,
}

impl WormKind {
    pub fn all() -> [WormKind; 3] {
        [WormKind::Vegetarian, WormKind::Scissorhead, WormKind::Cannibal]
    }
}

impl fmt::Display for WormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WormKind::Vegetarian => "vegetarian",
            WormKind::Scissorhead => "scissorhead",
            WormKind::Cannibal => "cannibal",
        };
        f.write_str(name)
    }
}

/// Life status of a worm. Only `Alive` worms act; the other two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WormStatus {
    Alive,
    Eaten,
    Dead,
}

impl WormStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WormStatus::Alive)
    }
}

/// Passive terrain of a board square
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Empty,
    Carrot,
    /// Left behind where a worm starved
    DeadMarker,
}
