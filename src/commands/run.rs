//! Simulate one sample read from disk.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use springnet::{
    read_data_file, render_summary, run_sample, write_records, StepRecord, ThresholdTable,
};
use tracing::info;

use super::ParameterArgs;

/// Single-sample arguments.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Network data file
    #[arg(short, long)]
    pub network: PathBuf,

    /// Threshold file keyed by bond type
    #[arg(short, long)]
    pub thresholds: PathBuf,

    /// Sample id reported in logs and errors
    #[arg(long, default_value = "0")]
    pub sample: u64,

    /// Write step records to this JSON-lines file
    #[arg(short, long)]
    pub records: Option<PathBuf>,

    #[command(flatten)]
    pub parameters: ParameterArgs,
}

/// Load the sample, run it and print the summary.
pub fn execute(args: RunArgs) -> Result<()> {
    let config = args.parameters.load()?;
    let description = read_data_file(&args.network)?;
    let thresholds = ThresholdTable::from_path(&args.thresholds, config.threshold_unit)?;
    let network = description
        .build(&thresholds)
        .context("building the network")?;
    info!(
        particles = network.particle_count(),
        bonds = network.bond_count(),
        steps = config.total_steps,
        increment = config.strain_increment,
        "starting run"
    );

    let start = Instant::now();
    let result = run_sample(args.sample, network, &config);
    info!("finished in {:.2} s", start.elapsed().as_secs_f64());

    let records = match &result {
        Ok(run) => run.records.as_slice(),
        Err(error) => error.records(),
    };
    if let Some(path) = &args.records {
        save_records(path, records)?;
    }
    let run = result?;
    print!("{}", render_summary(&run.report, &run.records));
    Ok(())
}

/// Write `records` as JSON lines to `path`.
pub(crate) fn save_records(path: &Path, records: &[StepRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_records(BufWriter::new(file), records)
        .with_context(|| format!("writing {}", path.display()))
}
