//! The avalanche loop and the strain-controlled run of one sample.

use serde::Serialize;

use crate::analysis::{cluster_moment, crack_clusters, delta_c, global_stress, StressChange};
use crate::config::SimulationConfig;
use crate::errors::{ConfigError, SimulationError, SolverError};
use crate::geometry::Positions;
use crate::loading::StrainDriver;
use crate::network::Network;
use crate::scanner::scan;
use crate::solver::{EquilibriumSolver, RelaxReport};
use crate::termination::{TerminationCause, TerminationMonitor};

/// Mutable progress of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SimulationState {
    /// Applied strain.
    pub strain: f64,
    /// Number of completed strain steps.
    pub step: usize,
    /// Bonds broken since the run started.
    pub broken_total: usize,
    /// Scan passes that broke at least one bond, over the whole run.
    pub avalanche_iterations: usize,
}

/// Everything measured for one strain step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepRecord {
    /// One-based step index.
    pub step: usize,
    /// Applied strain after the step.
    pub strain: f64,
    /// Avalanche size: bonds broken during the step.
    pub size: usize,
    /// Relax and Scan pairs performed, the final stable one included.
    pub scan_passes: usize,
    /// Global stress of the previous stable configuration, before the
    /// increment was applied.
    pub stress_previous: f64,
    /// Pre-loop stress: the loaded configuration after its first relaxation,
    /// before any bond of this step broke.
    pub stress_before: f64,
    /// Global stress once the avalanche settled.
    pub stress_after: f64,
    /// Stress change and stress drop from `stress_before` to `stress_after`.
    pub stress: StressChange,
    /// Cluster moment before the step.
    pub moment_before: u64,
    /// Cluster moment after the step.
    pub moment_after: u64,
    /// `sqrt(|moment_after - moment_before|)`.
    pub delta_c: f64,
    /// Number of crack clusters after the step.
    pub clusters: usize,
    /// Bonds broken since the run started.
    pub broken_total: usize,
    /// Bonds still carrying load.
    pub live_bonds: usize,
}

/// How a completed run ended.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RunReport {
    /// Sample identifier.
    pub sample: u64,
    /// Termination cause.
    pub cause: TerminationCause,
    /// Applied strain at the end.
    pub final_strain: f64,
    /// Steps executed.
    pub steps: usize,
    /// Bonds broken during the run.
    pub total_broken: usize,
}

/// One sample: a network, its solver and the loading protocol.
pub struct Simulation<S> {
    /// Sample identifier carried into every error.
    sample: u64,
    /// Bond liveness, mutated only by the scanner.
    network: Network,
    /// Particle positions, written only by the solver and the driver.
    positions: Positions,
    /// Equilibrium solver.
    solver: S,
    /// Run parameters.
    config: SimulationConfig,
    /// Loading of the driven group.
    driver: StrainDriver,
    /// End-of-run detection.
    monitor: TerminationMonitor,
    /// Progress counters.
    state: SimulationState,
    /// One record per completed step.
    records: Vec<StepRecord>,
    /// Stress of the last stable configuration.
    stress: f64,
    /// Cluster moment of the last stable configuration.
    moment: u64,
    /// Cause of termination, once reached.
    outcome: Option<TerminationCause>,
    /// Set when a step failed fatally.
    aborted: bool,
}

impl<S: EquilibriumSolver> Simulation<S> {
    /// Prepare a run starting from the reference configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` does not validate or the network
    /// has no transverse extent.
    pub fn new(
        sample: u64,
        network: Network,
        solver: S,
        config: SimulationConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let height = network.height();
        if height <= 0.0 {
            return Err(ConfigError::DegenerateHeight);
        }
        let positions = network.reference_positions();
        let stress = global_stress(&network, &positions);
        let moment = cluster_moment(&crack_clusters(&network));
        Ok(Self {
            sample,
            driver: StrainDriver::new(config.strain_increment),
            monitor: TerminationMonitor::new(config.strain_limit),
            network,
            positions,
            solver,
            config,
            state: SimulationState::default(),
            records: Vec::new(),
            stress,
            moment,
            outcome: None,
            aborted: false,
        })
    }

    /// Sample identifier.
    #[must_use]
    pub fn sample(&self) -> u64 {
        self.sample
    }

    /// Current progress.
    #[must_use]
    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// The network in its current state.
    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Particle positions of the last relaxation.
    #[must_use]
    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    /// Records of every completed step.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Records of the steps that broke at least one bond.
    pub fn avalanches(&self) -> impl Iterator<Item = &StepRecord> + '_ {
        self.records.iter().filter(|record| record.size > 0)
    }

    /// Termination report, once the run has ended.
    #[must_use]
    pub fn report(&self) -> Option<RunReport> {
        self.outcome.map(|cause| RunReport {
            sample: self.sample,
            cause,
            final_strain: self.state.strain,
            steps: self.state.step,
            total_broken: self.state.broken_total,
        })
    }

    /// Apply one strain increment and let the resulting avalanche settle.
    ///
    /// Returns the termination cause when this step ended the run.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Finished`] once the run has ended or
    /// aborted, and any fatal error raised while relaxing or scanning. A
    /// failed step emits no record and leaves the sample aborted.
    pub fn step(&mut self) -> Result<Option<TerminationCause>, SimulationError> {
        if self.outcome.is_some() || self.aborted || self.state.step >= self.config.total_steps {
            return Err(SimulationError::Finished {
                sample: self.sample,
            });
        }
        self.state.step += 1;
        self.state.strain = self.state.step as f64 * self.config.strain_increment;
        let stress_previous = self.stress;
        let moment_before = self.moment;

        self.driver.apply_increment(&self.network, &mut self.positions);
        let (size, scan_passes, stress_before) = match self.settle() {
            Ok(settled) => settled,
            Err(error) => {
                self.aborted = true;
                tracing::error!(sample = self.sample, step = self.state.step, %error, "sample aborted");
                return Err(error);
            }
        };
        self.driver.release();

        let stress_after = global_stress(&self.network, &self.positions);
        let clusters = crack_clusters(&self.network);
        let moment_after = cluster_moment(&clusters);
        let record = StepRecord {
            step: self.state.step,
            strain: self.state.strain,
            size,
            scan_passes,
            stress_previous,
            stress_before,
            stress_after,
            stress: StressChange::between(stress_before, stress_after),
            moment_before,
            moment_after,
            delta_c: delta_c(moment_before, moment_after),
            clusters: clusters.len(),
            broken_total: self.state.broken_total,
            live_bonds: self.network.live_bond_count(),
        };
        tracing::info!(
            sample = self.sample,
            step = record.step,
            strain = record.strain,
            size = record.size,
            stress = record.stress_after,
            drop = record.stress.drop,
            delta_c = record.delta_c,
            "strain step settled"
        );
        self.records.push(record);
        self.stress = stress_after;
        self.moment = moment_after;

        self.outcome = self.monitor.check(&self.network, self.state.strain);
        if let Some(cause) = self.outcome {
            tracing::info!(sample = self.sample, step = self.state.step, %cause, "run terminated");
        }
        Ok(self.outcome)
    }

    /// Step until the run terminates.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`SimulationError`].
    pub fn run(&mut self) -> Result<RunReport, SimulationError> {
        loop {
            if self.step()?.is_some() {
                break;
            }
        }
        self.report().ok_or(SimulationError::Finished {
            sample: self.sample,
        })
    }

    /// Relax and scan until a pass breaks nothing.
    ///
    /// Returns the number of bonds broken, the number of passes made and the
    /// stress after the first relaxation, before anything broke.
    fn settle(&mut self) -> Result<(usize, usize, f64), SimulationError> {
        let mut size = 0;
        let mut passes = 0;
        let mut loaded_stress = 0.0;
        loop {
            if passes >= self.config.max_avalanche_iterations {
                return Err(SimulationError::AvalancheLimit {
                    sample: self.sample,
                    step: self.state.step,
                    iterations: self.config.max_avalanche_iterations,
                });
            }
            self.relax()?;
            if self.positions.is_empty() {
                return Err(self.data_access("solver returned no particle positions".to_owned()));
            }
            if passes == 0 {
                loaded_stress = global_stress(&self.network, &self.positions);
            }
            let report = scan(&mut self.network, &self.positions);
            passes += 1;
            tracing::debug!(
                sample = self.sample,
                step = self.state.step,
                pass = passes,
                broken = report.broken_count(),
                skipped = report.skipped.len(),
                "scan pass"
            );
            if report.broken.is_empty() {
                return Ok((size, passes, loaded_stress));
            }
            size += report.broken_count();
            self.state.broken_total += report.broken_count();
            self.state.avalanche_iterations += 1;
        }
    }

    /// Call the solver, loosening the tolerance after each non-converged
    /// attempt.
    fn relax(&mut self) -> Result<RelaxReport, SimulationError> {
        let holds = self.driver.holds();
        let mut tolerance = self.config.tolerance;
        let mut attempt = 1;
        loop {
            match self
                .solver
                .relax(&self.network, &holds, &mut self.positions, tolerance)
            {
                Ok(report) => {
                    tracing::debug!(
                        attempt,
                        iterations = report.iterations,
                        residual = report.residual,
                        energy = report.energy,
                        "relaxed"
                    );
                    return Ok(report);
                }
                Err(SolverError::DataAccess(detail)) => return Err(self.data_access(detail)),
                Err(source) if attempt > self.config.retry.max_retries => {
                    return Err(SimulationError::Solver {
                        sample: self.sample,
                        step: self.state.step,
                        attempts: attempt,
                        source,
                    });
                }
                Err(source) => {
                    tracing::warn!(
                        sample = self.sample,
                        step = self.state.step,
                        attempt,
                        %source,
                        "relaxation did not converge, retrying with a looser tolerance"
                    );
                    tolerance = tolerance.relaxed(self.config.retry.tolerance_growth);
                    attempt += 1;
                }
            }
        }
    }

    /// Wrap a data-access failure with the sample and step.
    fn data_access(&self, detail: String) -> SimulationError {
        SimulationError::DataAccess {
            sample: self.sample,
            step: self.state.step,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;
    use crate::loading::HeldGroups;
    use crate::network::{BondState, Group};
    use crate::solver::{FireSolver, Tolerance};

    /// Solver that never moves anything.
    struct Frozen;

    impl EquilibriumSolver for Frozen {
        fn relax(
            &mut self,
            _network: &Network,
            _holds: &HeldGroups,
            _positions: &mut Positions,
            _tolerance: Tolerance,
        ) -> Result<RelaxReport, SolverError> {
            Ok(RelaxReport {
                iterations: 0,
                residual: 0.0,
                energy: 0.0,
            })
        }
    }

    /// Solver that empties the position buffer.
    struct Leaky;

    impl EquilibriumSolver for Leaky {
        fn relax(
            &mut self,
            _network: &Network,
            _holds: &HeldGroups,
            positions: &mut Positions,
            _tolerance: Tolerance,
        ) -> Result<RelaxReport, SolverError> {
            *positions = Positions::default();
            Ok(RelaxReport {
                iterations: 0,
                residual: 0.0,
                energy: 0.0,
            })
        }
    }

    fn column(threshold: f64) -> Network {
        let mut network = Network::new(4.0);
        let bottom = network.add_particle(1, point(0.0, 0.0), Group::Fixed);
        let top = network.add_particle(2, point(0.0, 1.0), Group::Driven);
        network
            .add_bond(1, bottom, top, BondState::Breakable { threshold })
            .expect("bond accepted");
        network
    }

    fn config(total_steps: usize, strain_increment: f64, strain_limit: f64) -> SimulationConfig {
        SimulationConfig {
            total_steps,
            strain_increment,
            strain_limit,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn stress_is_tracked_across_steps() {
        let mut simulation =
            Simulation::new(0, column(10.0), Frozen, config(2, 0.5, 1.0)).expect("valid setup");
        assert_eq!(simulation.step().expect("first step"), None);
        assert_eq!(
            simulation.step().expect("second step"),
            Some(TerminationCause::StrainLimit)
        );
        let records = simulation.records();
        assert_relative_eq!(records[0].stress_previous, 0.0);
        assert_relative_eq!(records[0].stress_before, 0.5);
        assert_relative_eq!(records[0].stress_after, 0.5);
        assert_relative_eq!(records[1].stress_previous, 0.5);
        assert_relative_eq!(records[1].stress_before, 1.0);
        assert_relative_eq!(records[1].stress_after, 1.0);
        assert_eq!(records[1].stress.drop, 0.0);
        assert_eq!(simulation.avalanches().count(), 0);
        assert!(matches!(
            simulation.step(),
            Err(SimulationError::Finished { sample: 0 })
        ));
    }

    #[test]
    fn breaking_the_only_path_is_global_fracture() {
        let mut simulation =
            Simulation::new(3, column(0.05), FireSolver::default(), config(10, 0.1, 1.0))
                .expect("valid setup");
        let report = simulation.run().expect("run completes");
        assert_eq!(report.cause, TerminationCause::GlobalFracture);
        assert_eq!(report.steps, 1);
        assert_eq!(report.total_broken, 1);
        let record = &simulation.records()[0];
        assert_eq!(record.size, 1);
        assert_eq!(record.scan_passes, 2);
        assert_relative_eq!(record.stress_previous, 0.0);
        assert_relative_eq!(record.stress_before, 0.1, epsilon = 1.0e-9);
        assert_eq!(record.stress_after, 0.0);
        assert!(record.stress_after.is_sign_positive());
        assert_relative_eq!(record.stress.drop, 0.1, epsilon = 1.0e-9);
        assert_relative_eq!(record.stress.raw, -0.1, epsilon = 1.0e-9);
        assert_relative_eq!(record.delta_c, 1.0);
    }

    #[test]
    fn empty_positions_abort_the_sample() {
        let mut simulation =
            Simulation::new(7, column(10.0), Leaky, config(10, 0.1, 1.0)).expect("valid setup");
        let error = simulation.run().expect_err("no positions");
        assert!(matches!(
            error,
            SimulationError::DataAccess {
                sample: 7,
                step: 1,
                ..
            }
        ));
        assert!(simulation.records().is_empty());
        assert!(simulation.report().is_none());
    }

    #[test]
    fn avalanche_guard_is_enforced() {
        let mut network = Network::new(4.0);
        let bottom = network.add_particle(1, point(0.0, 0.0), Group::Fixed);
        let top = network.add_particle(2, point(0.0, 1.0), Group::Driven);
        let side = network.add_particle(3, point(1.0, 1.0), Group::Mobile);
        network
            .add_bond(1, bottom, top, BondState::Breakable { threshold: 0.0 })
            .expect("bond accepted");
        network
            .add_bond(2, bottom, side, BondState::Unbreakable)
            .expect("bond accepted");
        let config = SimulationConfig {
            max_avalanche_iterations: 1,
            ..config(10, 0.1, 1.0)
        };
        let mut simulation = Simulation::new(1, network, Frozen, config).expect("valid setup");
        let error = simulation.step().expect_err("second pass exceeds the guard");
        assert_eq!(
            error,
            SimulationError::AvalancheLimit {
                sample: 1,
                step: 1,
                iterations: 1
            }
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_any_step() {
        let result = Simulation::new(0, column(1.0), Frozen, config(2, 0.1, 1.0));
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));
    }
}
