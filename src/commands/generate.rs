//! Write a lattice data file and one threshold draw.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use springnet::{draw_thresholds, render_data_file, LatticeSpec};
use tracing::info;

/// Lattice generation arguments.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Rows and columns of the triangular lattice
    #[arg(short = 'n', long, default_value = "32")]
    pub size: usize,

    /// Period of the unbreakable matrix (0 disables it)
    #[arg(short = 'l', long, default_value = "8")]
    pub matrix_period: usize,

    /// Nearest-neighbour distance
    #[arg(long, default_value = "1.0")]
    pub spacing: f64,

    /// Seed of the threshold draw
    #[arg(short, long, default_value = "0")]
    pub seed: u64,

    /// Directory receiving network.data and thresholds.txt
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,
}

/// Generate the lattice and write both files.
pub fn execute(args: GenerateArgs) -> Result<()> {
    anyhow::ensure!(args.size >= 2, "lattice size must be at least 2");
    let spec = LatticeSpec {
        spacing: args.spacing,
        ..LatticeSpec::new(args.size, args.matrix_period)
    };
    let description = spec.generate();
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let thresholds = draw_thresholds(&description, &mut rng);

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let network_path = args.output_dir.join("network.data");
    let title = format!(
        "spring network (N={}, L={}, seed={})",
        args.size, args.matrix_period, args.seed
    );
    std::fs::write(&network_path, render_data_file(&description, &title))
        .with_context(|| format!("writing {}", network_path.display()))?;
    let thresholds_path = args.output_dir.join("thresholds.txt");
    std::fs::write(&thresholds_path, thresholds.to_text())
        .with_context(|| format!("writing {}", thresholds_path.display()))?;

    info!(
        particles = description.particles.len(),
        bonds = description.bonds.len(),
        breakable = thresholds.len(),
        "wrote {} and {}",
        network_path.display(),
        thresholds_path.display()
    );
    Ok(())
}
