mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Quasi-static fracture avalanches in spring networks
#[derive(Parser)]
#[command(name = "springnet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Strain a spring network until it fractures", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a triangular lattice and a threshold draw
    Generate(commands::generate::GenerateArgs),
    /// Simulate one sample from files
    Run(commands::run::RunArgs),
    /// Simulate many samples of a generated lattice in parallel
    Ensemble(commands::ensemble::EnsembleArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args),
        Commands::Run(args) => commands::run::execute(args),
        Commands::Ensemble(args) => commands::ensemble::execute(args),
    }
}
