#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

pub mod analysis;
pub mod config;
pub mod data_file;
pub mod description;
pub mod ensemble;
pub mod errors;
pub mod geometry;
pub mod lattice;
pub mod loading;
pub mod network;
pub mod report;
pub mod scanner;
pub mod simulation;
pub mod solver;
pub mod termination;
pub mod thresholds;

pub use analysis::{
    cluster_moment, crack_clusters, delta_c, global_stress, CrackCluster, StressChange,
};
pub use config::{RetryPolicy, SimulationConfig};
pub use data_file::{parse_data_file, read_data_file, render_data_file};
pub use description::{
    BondCoefficients, BondRecord, NetworkDescription, ParticleRecord, BROKEN_CLASS,
    UNBREAKABLE_CLASS,
};
pub use ensemble::{run_ensemble, run_sample, SampleOutcome, SampleRun};
pub use errors::{
    BondPropertyError, ConfigError, DataFileError, NetworkEditError, SampleError,
    SimulationError, SolverError,
};
pub use geometry::{displacement, minimum_image, point, Displacement, Point, Positions};
pub use lattice::{draw_thresholds, LatticeSpec};
pub use loading::{HeldGroups, StrainDriver};
pub use network::{Bond, BondId, BondState, Group, Network, Particle, ParticleId};
pub use report::{render_ensemble, render_summary, write_records};
pub use scanner::{scan, ScanReport};
pub use simulation::{RunReport, Simulation, SimulationState, StepRecord};
pub use solver::{
    accumulate_forces, EquilibriumSolver, FireParameters, FireSolver, RelaxReport, Tolerance,
};
pub use termination::{spans_boundaries, TerminationCause, TerminationMonitor};
pub use thresholds::{ThresholdTable, ThresholdUnit};
