//! A single board cell.

use serde::{Deserialize, Serialize};
use wormsim_core::{Terrain, WormId};

/// Which worm, and which of its segments, sits on a square.
/// Holds an id rather than a reference; the simulation owns the worms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub worm: WormId,
    pub segment: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    pub terrain: Terrain,
    pub occupant: Option<Occupant>,
}

impl Square {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_terrain(terrain: Terrain) -> Self {
        Self {
            terrain,
            occupant: None,
        }
    }

    pub fn is_carrot(&self) -> bool {
        self.terrain == Terrain::Carrot
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// A worm may be placed here: no carrot underneath and nobody on it
    pub fn is_free(&self) -> bool {
        !self.is_carrot() && !self.is_occupied()
    }
}
