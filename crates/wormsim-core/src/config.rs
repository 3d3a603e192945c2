//! Configuration types for the simulation.

use crate::error::{Error, Result};
use crate::types::WormKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Largest number of squares a board may have
pub const MAX_BOARD_SQUARES: i32 = 1 << 24;

/// Board dimensions and terrain parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Requested board width (clamped to `1..=max_board_width`)
    pub width: i32,
    /// Requested board height (clamped to `1..=max_board_height`)
    pub height: i32,
    /// Largest width any board may have
    pub max_board_width: i32,
    /// Largest height any board may have
    pub max_board_height: i32,
    /// Fraction of free squares that receive a carrot on restart (0.0 to 1.0)
    pub carrot_density: f32,
    /// Carrots sprinkled at the end of every tick
    pub carrot_regrowth_per_tick: usize,
    /// Random probes `find_slot` makes before scanning the whole board
    pub max_probes: usize,
    /// Terrain left where an eaten worm's segments were
    pub eaten_remnant: RemnantPolicy,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 40,
            max_board_width: 100,
            max_board_height: 100,
            carrot_density: 0.6,
            carrot_regrowth_per_tick: 0,
            max_probes: 64,
            eaten_remnant: RemnantPolicy::Empty,
        }
    }
}

/// What an eaten worm leaves behind on the passive board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemnantPolicy {
    Empty,
    Carrot,
}

/// Stomach and food arithmetic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetabolismConfig {
    /// Food burned by every living worm per tick
    pub metabolism_rate: i32,
    /// A worm whose stomach drops below this value starves
    pub starvation_threshold: i32,
    /// Stomach of a freshly created worm and of the tail half of a sliced worm
    pub spawn_stomach: i32,
    /// Food gained from one carrot
    pub carrot_food_value: i32,
    /// Multiplier on each type's per-segment capacity. A worm holds at most
    /// `len * capacity_per_segment * capacity_scale` food and only eats while its stomach
    /// is below three quarters of that.
    pub capacity_scale: i32,
}

impl Default for MetabolismConfig {
    fn default() -> Self {
        Self {
            metabolism_rate: 1,
            starvation_threshold: 1,
            spawn_stomach: 30,
            carrot_food_value: 2,
            capacity_scale: 10,
        }
    }
}

/// Randomized heading changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Relative weight of turning clockwise by 0..8 eighths each tick.
    /// `[1, 0, 0, 0, 0, 0, 0, 0]` makes every worm go straight.
    pub turn_weights: [u32; 8],
}

impl MovementConfig {
    /// Worms never change heading on their own
    pub fn straight() -> Self {
        Self {
            turn_weights: [1, 0, 0, 0, 0, 0, 0, 0],
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            // Mostly straight ahead, occasionally veering left or right
            turn_weights: [8, 3, 1, 0, 0, 0, 1, 3],
        }
    }
}

/// Initial population
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Fixed number of worms created on restart; `None` draws
    /// `min_worms + rand(worm_variation)`
    pub initial_worms: Option<usize>,
    pub min_worms: usize,
    pub worm_variation: usize,
    /// Relative weights of each worm kind when one is chosen at random
    pub type_mix: TypeMix,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_worms: None,
            min_worms: 3,
            worm_variation: 6,
            type_mix: TypeMix::default(),
        }
    }
}

/// Weights used to pick a worm kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeMix {
    pub vegetarian: u32,
    pub scissorhead: u32,
    pub cannibal: u32,
}

impl TypeMix {
    pub fn weight_of(&self, kind: WormKind) -> u32 {
        match kind {
            WormKind::Vegetarian => self.vegetarian,
            WormKind::Scissorhead => self.scissorhead,
            WormKind::Cannibal => self.cannibal,
        }
    }

    pub fn total(&self) -> u32 {
        self.vegetarian + self.scissorhead + self.cannibal
    }
}

impl Default for TypeMix {
    fn default() -> Self {
        Self {
            vegetarian: 1,
            scissorhead: 1,
            cannibal: 1,
        }
    }
}

/// Top level configuration of one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of ticks `run` executes
    pub num_ticks: u64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Ticks between population reports in the log (0 disables them)
    pub report_interval: u64,
    pub board: BoardConfig,
    pub metabolism: MetabolismConfig,
    pub movement: MovementConfig,
    pub population: PopulationConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_ticks: 1_000,
            seed: 0,
            report_interval: 100,
            board: BoardConfig::default(),
            metabolism: MetabolismConfig::default(),
            movement: MovementConfig::default(),
            population: PopulationConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load a configuration from a JSON file. Missing fields are an error; use
    /// `SimConfig::default()` as a starting point when writing one.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "Loaded simulation config");
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let board = &self.board;
        if board.max_board_width < 1 || board.max_board_height < 1 {
            return Err(Error::Validation(format!(
                "maximum board size must be positive, got {}x{}",
                board.max_board_width, board.max_board_height
            )));
        }
        let squares = board
            .max_board_width
            .checked_mul(board.max_board_height)
            .filter(|&squares| squares <= MAX_BOARD_SQUARES);
        if squares.is_none() {
            return Err(Error::Validation(format!(
                "maximum board size {}x{} exceeds {} squares",
                board.max_board_width, board.max_board_height, MAX_BOARD_SQUARES
            )));
        }
        if !(0.0..=1.0).contains(&board.carrot_density) {
            return Err(Error::Validation(format!(
                "carrot_density must be within 0.0..=1.0, got {}",
                board.carrot_density
            )));
        }
        if self.metabolism.metabolism_rate < 0 {
            return Err(Error::Validation(format!(
                "metabolism_rate must not be negative, got {}",
                self.metabolism.metabolism_rate
            )));
        }
        if self.metabolism.spawn_stomach < self.metabolism.starvation_threshold {
            return Err(Error::Validation(format!(
                "spawn_stomach ({}) is below starvation_threshold ({})",
                self.metabolism.spawn_stomach, self.metabolism.starvation_threshold
            )));
        }
        if self.metabolism.capacity_scale < 1 {
            return Err(Error::Validation(format!(
                "capacity_scale must be positive, got {}",
                self.metabolism.capacity_scale
            )));
        }
        if self.movement.turn_weights.iter().all(|&w| w == 0) {
            return Err(Error::Validation(
                "turn_weights must contain at least one non-zero weight".to_string(),
            ));
        }
        if self.population.type_mix.total() == 0 {
            return Err(Error::Validation(
                "type_mix must contain at least one non-zero weight".to_string(),
            ));
        }
        Ok(())
    }
}
