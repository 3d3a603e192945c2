//! Error types for the simulation.

use crate::types::WormId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Position ({x}, {y}) is outside the {width}x{height} board")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    #[error("Board full: no free square available")]
    BoardFull,

    #[error("Square ({x}, {y}) is already occupied")]
    Occupied { x: i32, y: i32 },

    #[error("Segment index {index} is out of range for a worm of {len} segments")]
    InvalidSliceIndex { index: usize, len: usize },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Not found: {0}")]
    WormNotFound(WormId),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
