//! Error types produced while building networks, relaxing them and running samples.

use std::path::PathBuf;

use petgraph::graph::{EdgeIndex, NodeIndex};
use thiserror::Error;

use crate::simulation::StepRecord;

/// Error returned when a bond is given physically meaningless properties.
///
/// The variants describe the reason the supplied value is rejected so callers can
/// present actionable feedback to users.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum BondPropertyError {
    /// Returned when the rest length is zero, negative or not finite.
    #[error("rest length must be positive (received {rest_length})")]
    NonPositiveRestLength {
        /// Identifier of the affected bond.
        bond: EdgeIndex,
        /// Rejected rest length.
        rest_length: f64,
    },
    /// Returned when the spring constant is zero, negative or not finite.
    #[error("stiffness must be positive (received {stiffness})")]
    NonPositiveStiffness {
        /// Identifier of the affected bond.
        bond: EdgeIndex,
        /// Rejected spring constant.
        stiffness: f64,
    },
    /// Returned when a breaking strain is negative or NaN.
    #[error("breaking threshold must be non-negative (received {threshold})")]
    InvalidThreshold {
        /// Identifier of the affected bond.
        bond: EdgeIndex,
        /// Rejected threshold.
        threshold: f64,
    },
}

/// Error returned when editing a [`Network`](crate::Network) with invalid indices.
///
/// # Examples
///
/// ```
/// use petgraph::graph::EdgeIndex;
/// use springnet::{Network, NetworkEditError};
///
/// let mut network = Network::new(4.0);
/// let invalid_bond = EdgeIndex::new(42);
/// let error = network
///     .set_bond_stiffness(invalid_bond, 2.0)
///     .expect_err("unknown bond is rejected");
/// assert_eq!(error, NetworkEditError::UnknownBond(invalid_bond));
/// ```
#[derive(Debug, Error, PartialEq)]
pub enum NetworkEditError {
    /// Returned when a particle cannot be found in the network.
    #[error("particle {0:?} does not exist in this network")]
    UnknownParticle(NodeIndex),
    /// Returned when a bond cannot be found in the network.
    #[error("bond {0:?} does not exist in this network")]
    UnknownBond(EdgeIndex),
    /// Returned when a bond would join a particle to itself.
    #[error("bond endpoints must differ (both are {0:?})")]
    SelfBond(NodeIndex),
    /// Returned when the supplied bond properties are invalid.
    #[error("{0}")]
    InvalidBondProperties(BondPropertyError),
}

/// Error raised while reading a network data file.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DataFileError {
    /// A line inside a section or header could not be parsed.
    #[error("line {line}: {message}")]
    Malformed {
        /// One-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },
    /// A mandatory header entry or section is absent.
    #[error("missing {0}")]
    Missing(&'static str),
    /// The number of entries in a section disagrees with the header.
    #[error("header declares {declared} {what} but {found} were listed")]
    CountMismatch {
        /// Name of the section.
        what: &'static str,
        /// Count from the header.
        declared: usize,
        /// Count actually read.
        found: usize,
    },
}

/// Fatal configuration problem detected before the first strain step.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An input file could not be opened or read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The run parameters file is not valid JSON for [`SimulationConfig`](crate::SimulationConfig).
    #[error("invalid run parameters: {0}")]
    Parameters(#[from] serde_json::Error),
    /// A run parameter is out of range or inconsistent with another one.
    #[error("invalid run parameter `{field}`: {reason}")]
    InvalidParameter {
        /// Name of the offending field.
        field: &'static str,
        /// Explanation of the constraint that failed.
        reason: String,
    },
    /// The network data file is malformed.
    #[error("malformed network description: {0}")]
    DataFile(#[from] DataFileError),
    /// A threshold file line could not be parsed.
    #[error("threshold source line {line}: cannot parse `{content}`")]
    MalformedThreshold {
        /// One-based line number.
        line: usize,
        /// Offending text.
        content: String,
    },
    /// The threshold source yielded no entries.
    #[error("threshold source contains no thresholds")]
    EmptyThresholds,
    /// A breakable bond has no threshold assigned.
    #[error("no breaking threshold for bond {bond} of class {class}")]
    MissingThreshold {
        /// External tag of the bond.
        bond: u64,
        /// Bond class used as the threshold key.
        class: u32,
    },
    /// A particle tag appears more than once.
    #[error("particle {0} is declared twice")]
    DuplicateParticle(u64),
    /// A bond refers to a particle tag that was never declared.
    #[error("bond {bond} references unknown particle {particle}")]
    UnknownEndpoint {
        /// External tag of the bond.
        bond: u64,
        /// Missing particle tag.
        particle: u64,
    },
    /// The network lacks a fixed or driven boundary group.
    #[error("network has no {0} particles")]
    MissingGroup(&'static str),
    /// The periodic period is not strictly positive.
    #[error("periodic length must be positive (received {0})")]
    InvalidPeriod(f64),
    /// The network has zero extent along the loading axis.
    #[error("network has zero transverse extent")]
    DegenerateHeight,
    /// Editing the network failed while applying the description.
    #[error(transparent)]
    Network(#[from] NetworkEditError),
}

/// Failure reported by an [`EquilibriumSolver`](crate::EquilibriumSolver).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SolverError {
    /// The iteration budget ran out before the force tolerance was met.
    #[error("no convergence after {iterations} iterations (force norm {residual:.3e})")]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Global force norm when the solver gave up.
        residual: f64,
    },
    /// The solver could not expose particle or bond data.
    #[error("solver data unavailable: {0}")]
    DataAccess(String),
}

/// Fatal failure of one simulation sample after the run started.
///
/// Every variant carries the sample id and the strain step so the failing
/// state can be reproduced.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimulationError {
    /// Relaxation did not converge even after the configured retries.
    #[error("sample {sample}, step {step}: equilibrium solver failed after {attempts} attempts: {source}")]
    Solver {
        /// Sample identifier.
        sample: u64,
        /// One-based strain step.
        step: usize,
        /// Number of Relax calls made for the failing iteration.
        attempts: usize,
        /// Last solver error.
        #[source]
        source: SolverError,
    },
    /// Per-particle data needed by the scanner was not available.
    #[error("sample {sample}, step {step}: {detail}")]
    DataAccess {
        /// Sample identifier.
        sample: u64,
        /// One-based strain step.
        step: usize,
        /// Description of the missing data.
        detail: String,
    },
    /// The avalanche loop exceeded its iteration guard.
    #[error("sample {sample}, step {step}: avalanche did not settle within {iterations} iterations")]
    AvalancheLimit {
        /// Sample identifier.
        sample: u64,
        /// One-based strain step.
        step: usize,
        /// Configured guard that was hit.
        iterations: usize,
    },
    /// A step was requested after the run had already terminated.
    #[error("sample {sample}: run already terminated")]
    Finished {
        /// Sample identifier.
        sample: u64,
    },
}

/// Failure of one ensemble sample, before or after its run started.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The sample could not be set up.
    #[error("sample {sample}: {source}")]
    Config {
        /// Sample identifier.
        sample: u64,
        /// Configuration problem.
        #[source]
        source: ConfigError,
    },
    /// The sample aborted during the run.
    #[error("{source}")]
    Aborted {
        /// Fatal simulation error.
        #[source]
        source: SimulationError,
        /// Records of the steps completed before the failure.
        records: Vec<StepRecord>,
    },
}

impl SampleError {
    /// Step records that were completed before the sample failed.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        match self {
            Self::Config { .. } => &[],
            Self::Aborted { records, .. } => records,
        }
    }
}
