//! Simulate many threshold draws of a generated lattice in parallel.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use springnet::{render_ensemble, run_ensemble, LatticeSpec};
use tracing::info;

use super::run::save_records;
use super::ParameterArgs;

/// Ensemble arguments.
#[derive(Args, Debug)]
pub struct EnsembleArgs {
    /// Rows and columns of the triangular lattice
    #[arg(short = 'n', long, default_value = "32")]
    pub size: usize,

    /// Period of the unbreakable matrix (0 disables it)
    #[arg(short = 'l', long, default_value = "8")]
    pub matrix_period: usize,

    /// Number of samples
    #[arg(long, default_value = "16")]
    pub samples: u64,

    /// Seed of sample 0; sample i uses seed + i
    #[arg(short, long, default_value = "0")]
    pub seed: u64,

    /// Write per-sample step records into this directory
    #[arg(long)]
    pub records_dir: Option<PathBuf>,

    #[command(flatten)]
    pub parameters: ParameterArgs,
}

/// Run the ensemble and print one line per sample.
pub fn execute(args: EnsembleArgs) -> Result<()> {
    anyhow::ensure!(args.size >= 2, "lattice size must be at least 2");
    let config = args.parameters.load()?;
    let description = LatticeSpec::new(args.size, args.matrix_period).generate();
    info!(
        samples = args.samples,
        threads = rayon::current_num_threads(),
        "starting ensemble"
    );

    let start = Instant::now();
    let outcomes = run_ensemble(&description, &config, args.samples, args.seed);
    info!("finished in {:.2} s", start.elapsed().as_secs_f64());

    if let Some(dir) = &args.records_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        for outcome in &outcomes {
            let records = match &outcome.result {
                Ok(run) => run.records.as_slice(),
                Err(error) => error.records(),
            };
            if records.is_empty() {
                continue;
            }
            let path = dir.join(format!("sample_{:04}.jsonl", outcome.sample));
            save_records(&path, records)?;
        }
    }
    print!("{}", render_ensemble(&outcomes));
    Ok(())
}
