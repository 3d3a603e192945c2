//! Worm world simulation engine.
//!
//! Worms of three kinds crawl over a bounded board, eat carrots, and eat or slice each
//! other. [`Simulation`] owns the board and the worms and advances them tick by tick;
//! [`Board`] keeps the terrain and the screen image presentation layers read.

pub mod board;
pub mod registry;
pub mod simulation;
pub mod square;
pub mod worm;

pub use board::Board;
pub use registry::{type_info, worm_types, Aggression, WormTypeInfo};
pub use simulation::{Simulation, SimulationResult, TickReport};
pub use square::{Occupant, Square};
pub use worm::{SliceRemainder, Worm, WormData};
