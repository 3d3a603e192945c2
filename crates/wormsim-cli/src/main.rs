//! Headless runner: `wormsim-cli [config.json]`.
//!
//! Runs one simulation and prints the final result as JSON on stdout.

mod runner;
mod telemetry;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use wormsim_core::SimConfig;

fn main() -> Result<()> {
    telemetry::init_telemetry()?;

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => SimConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            info!("No config file given, using defaults");
            SimConfig::default()
        }
    };

    let runner = runner::Runner::new(config);
    info!(
        seed = runner.config().seed,
        num_ticks = runner.config().num_ticks,
        "Starting WormSim"
    );

    let result = runner.execute()?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
