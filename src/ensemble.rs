//! Independent samples of one network description, run in parallel.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::SimulationConfig;
use crate::description::NetworkDescription;
use crate::errors::SampleError;
use crate::lattice::draw_thresholds;
use crate::network::Network;
use crate::simulation::{RunReport, Simulation, StepRecord};
use crate::solver::{EquilibriumSolver, FireSolver};

/// Report and step records of a completed sample.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleRun {
    /// Termination report.
    pub report: RunReport,
    /// One record per strain step.
    pub records: Vec<StepRecord>,
}

/// Result of one ensemble member.
#[derive(Debug)]
pub struct SampleOutcome {
    /// Sample identifier.
    pub sample: u64,
    /// Completed run or the reason it failed.
    pub result: Result<SampleRun, SampleError>,
}

/// Run one sample with the built-in FIRE solver.
///
/// # Errors
///
/// Returns [`SampleError::Config`] when the parameters are invalid and
/// [`SampleError::Aborted`], carrying the records of the completed steps,
/// when the run aborts.
pub fn run_sample(
    sample: u64,
    network: Network,
    config: &SimulationConfig,
) -> Result<SampleRun, SampleError> {
    let solver = FireSolver::new(config.fire);
    let simulation = Simulation::new(sample, network, solver, config.clone())
        .map_err(|source| SampleError::Config { sample, source })?;
    finish(simulation)
}

/// Run `simulation` to the end and collect its records, keeping them when
/// the run aborts.
pub(crate) fn finish<S: EquilibriumSolver>(
    mut simulation: Simulation<S>,
) -> Result<SampleRun, SampleError> {
    match simulation.run() {
        Ok(report) => Ok(SampleRun {
            report,
            records: simulation.records().to_vec(),
        }),
        Err(source) => Err(SampleError::Aborted {
            source,
            records: simulation.records().to_vec(),
        }),
    }
}

/// Run `samples` independent threshold draws of `description` in parallel.
///
/// Sample `i` draws its thresholds from a generator seeded with
/// `base_seed + i`, so any sample can be reproduced on its own. Outcomes are
/// returned in sample order, failures included.
#[must_use]
pub fn run_ensemble(
    description: &NetworkDescription,
    config: &SimulationConfig,
    samples: u64,
    base_seed: u64,
) -> Vec<SampleOutcome> {
    (0..samples)
        .into_par_iter()
        .map(|sample| {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(sample));
            let thresholds = draw_thresholds(description, &mut rng);
            let result = description
                .build(&thresholds)
                .map_err(|source| SampleError::Config { sample, source })
                .and_then(|network| run_sample(sample, network, config));
            if let Err(error) = &result {
                tracing::warn!(
                    sample,
                    %error,
                    completed_steps = error.records().len(),
                    "sample failed"
                );
            }
            SampleOutcome { sample, result }
        })
        .collect()
}
