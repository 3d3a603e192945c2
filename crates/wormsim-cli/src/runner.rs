//! Runs one configured simulation to completion.

use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{info, instrument};
use wormsim_core::SimConfig;
use wormsim_world::{Simulation, SimulationResult};

pub struct Runner {
    config: SimConfig,
}

impl Runner {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Build the simulation and run it for `num_ticks` ticks
    #[instrument(skip(self), fields(seed = self.config.seed, ticks = self.config.num_ticks))]
    pub fn execute(&self) -> Result<SimulationResult> {
        let start = Instant::now();

        let mut simulation =
            Simulation::new(self.config.clone()).context("failed to set up the simulation")?;
        info!(
            width = simulation.width(),
            height = simulation.height(),
            worms = simulation.worms().count(),
            "Simulation ready"
        );

        let result = simulation.run().context("simulation aborted")?;

        let duration = start.elapsed();
        info!(
            event = "run_finished",
            ticks_run = result.ticks_run,
            survivors = result.survivors.len(),
            duration_secs = duration.as_secs_f64(),
            "Run completed in {:.2}s",
            duration.as_secs_f64()
        );

        Ok(result)
    }
}
