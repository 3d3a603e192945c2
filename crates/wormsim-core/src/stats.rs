//! Population statistics tracked across a simulation run.

use crate::types::WormKind;
use serde::{Deserialize, Serialize};

/// Live worm counts per kind plus cumulative event totals.
///
/// Live counts go up when a worm is created (including the tail half of a sliced worm)
/// and down when a dead or eaten worm is swept from the simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WormCensus {
    pub vegetarians: usize,
    pub scissorheads: usize,
    pub cannibals: usize,
    /// Worms created since the last reset
    pub total_created: u64,
    pub carrots_eaten: u64,
    pub worms_eaten: u64,
    pub worms_starved: u64,
    pub slices: u64,
}

impl WormCensus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_vegetarians(&self) -> usize {
        self.vegetarians
    }

    /// Spelling kept from the classic worms program's `getNumCanibals`
    pub fn num_canibals(&self) -> usize {
        self.cannibals
    }

    pub fn num_scissorheads(&self) -> usize {
        self.scissorheads
    }

    pub fn num_alive(&self) -> usize {
        self.vegetarians + self.scissorheads + self.cannibals
    }

    pub fn count_of(&self, kind: WormKind) -> usize {
        match kind {
            WormKind::Vegetarian => self.vegetarians,
            WormKind::Scissorhead => self.scissorheads,
            WormKind::Cannibal => self.cannibals,
        }
    }

    fn count_mut(&mut self, kind: WormKind) -> &mut usize {
        match kind {
            WormKind::Vegetarian => &mut self.vegetarians,
            WormKind::Scissorhead => &mut self.scissorheads,
            WormKind::Cannibal => &mut self.cannibals,
        }
    }

    pub fn record_created(&mut self, kind: WormKind) {
        *self.count_mut(kind) += 1;
        self.total_created += 1;
    }

    /// A worm of `kind` has left the live collection
    pub fn record_retired(&mut self, kind: WormKind) {
        let count = self.count_mut(kind);
        *count = count.saturating_sub(1);
    }

    /// Zero every counter, live and cumulative
    pub fn reset_worm_counters(&mut self) {
        *self = Self::default();
    }
}
