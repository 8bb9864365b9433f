//! Subcommands of the `springnet` binary.

pub mod ensemble;
pub mod generate;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use springnet::SimulationConfig;

/// Run parameters shared by the simulating subcommands.
#[derive(Args, Debug)]
pub struct ParameterArgs {
    /// JSON file with run parameters
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the number of strain steps
    #[arg(long)]
    pub total_steps: Option<usize>,

    /// Override the strain applied per step
    #[arg(long)]
    pub strain_increment: Option<f64>,

    /// Override the strain limit
    #[arg(long)]
    pub strain_limit: Option<f64>,
}

impl ParameterArgs {
    /// Load the parameters file, apply the overrides and validate the result.
    pub fn load(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_path(path)
                .with_context(|| format!("loading run parameters from {}", path.display()))?,
            None => SimulationConfig::default(),
        };
        if let Some(total_steps) = self.total_steps {
            config.total_steps = total_steps;
        }
        if let Some(strain_increment) = self.strain_increment {
            config.strain_increment = strain_increment;
        }
        if let Some(strain_limit) = self.strain_limit {
            config.strain_limit = strain_limit;
        }
        config.validate().context("invalid run parameters")?;
        Ok(config)
    }
}
