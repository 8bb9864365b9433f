//! Mechanical equilibrium: the solver contract used by the avalanche loop and a
//! fast inertial relaxation (FIRE) implementation for harmonic spring networks.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::errors::SolverError;
use crate::geometry::Positions;
use crate::loading::HeldGroups;
use crate::network::Network;

/// Convergence criteria for one relaxation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tolerance {
    /// Global force norm below which the configuration counts as balanced.
    pub force: f64,
    /// Maximum number of minimisation iterations.
    pub max_iterations: usize,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            force: 1.0e-6,
            max_iterations: 50_000,
        }
    }
}

impl Tolerance {
    /// Loosen the force criterion by `factor`.
    #[must_use]
    pub fn relaxed(self, factor: f64) -> Self {
        Self {
            force: self.force * factor,
            ..self
        }
    }
}

/// Outcome of a converged relaxation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelaxReport {
    /// Iterations performed.
    pub iterations: usize,
    /// Global force norm over free particles at exit.
    pub residual: f64,
    /// Elastic energy at exit.
    pub energy: f64,
}

/// Anything able to bring a network to force balance.
///
/// Implementations receive the bond liveness read-only and may only move
/// particles that `holds` leaves free. A call either returns a complete,
/// balanced position set or fails; a partially relaxed state must be reported
/// as [`SolverError::NotConverged`].
pub trait EquilibriumSolver {
    /// Relax `positions` towards a local minimum of the elastic energy.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::NotConverged`] when `tolerance` is not met within
    /// its iteration budget and [`SolverError::DataAccess`] when the position
    /// buffer does not match the network.
    fn relax(
        &mut self,
        network: &Network,
        holds: &HeldGroups,
        positions: &mut Positions,
        tolerance: Tolerance,
    ) -> Result<RelaxReport, SolverError>;
}

/// Accumulate spring forces into `forces` and return the elastic energy.
///
/// Every non-broken bond contributes `K (r - r0)^2`; separations use the
/// minimum image along X. `forces` must hold one entry per particle.
pub fn accumulate_forces(
    network: &Network,
    positions: &Positions,
    forces: &mut [Vector2<f64>],
) -> f64 {
    forces.iter_mut().for_each(|force| *force = Vector2::zeros());
    let mut energy = 0.0;
    for (bond, start, end, spring) in network.bonds() {
        if !spring.state().is_live() {
            continue;
        }
        let Some(delta) = network.bond_vector(bond, positions) else {
            continue;
        };
        let length = delta.norm();
        if length == 0.0 {
            continue;
        }
        let stretch = length - spring.rest_length();
        energy += spring.stiffness() * stretch * stretch;
        let pull = delta * (2.0 * spring.stiffness() * stretch / length);
        if let Some(force) = forces.get_mut(start.index()) {
            *force += pull;
        }
        if let Some(force) = forces.get_mut(end.index()) {
            *force -= pull;
        }
    }
    energy
}

/// Tuning constants of the FIRE integrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FireParameters {
    /// Initial time step.
    pub time_step: f64,
    /// Upper bound on the time step.
    pub max_time_step: f64,
    /// Downhill steps required before the time step may grow.
    pub min_steps: usize,
    /// Time step growth factor.
    pub time_step_growth: f64,
    /// Time step shrink factor after an uphill step.
    pub time_step_shrink: f64,
    /// Initial velocity mixing coefficient.
    pub alpha_start: f64,
    /// Decay of the mixing coefficient on downhill steps.
    pub alpha_decay: f64,
}

impl Default for FireParameters {
    fn default() -> Self {
        Self {
            time_step: 0.05,
            max_time_step: 0.5,
            min_steps: 5,
            time_step_growth: 1.1,
            time_step_shrink: 0.5,
            alpha_start: 0.1,
            alpha_decay: 0.99,
        }
    }
}

/// Fast inertial relaxation engine with unit particle masses.
#[derive(Clone, Debug, Default)]
pub struct FireSolver {
    /// Integrator constants.
    parameters: FireParameters,
}

impl FireSolver {
    /// Create a solver with the given constants.
    #[must_use]
    pub fn new(parameters: FireParameters) -> Self {
        Self { parameters }
    }
}

impl EquilibriumSolver for FireSolver {
    fn relax(
        &mut self,
        network: &Network,
        holds: &HeldGroups,
        positions: &mut Positions,
        tolerance: Tolerance,
    ) -> Result<RelaxReport, SolverError> {
        let count = network.particle_count();
        if positions.len() != count {
            return Err(SolverError::DataAccess(format!(
                "position buffer covers {} of {count} particles",
                positions.len()
            )));
        }
        let free: Vec<bool> = network
            .particles()
            .map(|(_, particle)| !holds.is_held(particle.group))
            .collect();
        let params = self.parameters;
        let mut velocities = vec![Vector2::<f64>::zeros(); count];
        let mut forces = vec![Vector2::<f64>::zeros(); count];
        let mut time_step = params.time_step;
        let mut alpha = params.alpha_start;
        let mut downhill = 0;
        let mut iteration = 0;

        loop {
            let energy = accumulate_forces(network, positions, &mut forces);
            for (force, is_free) in forces.iter_mut().zip(&free) {
                if !is_free {
                    *force = Vector2::zeros();
                }
            }
            let residual = forces
                .iter()
                .map(|force| force.norm_squared())
                .sum::<f64>()
                .sqrt();
            if residual <= tolerance.force {
                tracing::trace!(iteration, residual, energy, "relaxation converged");
                return Ok(RelaxReport {
                    iterations: iteration,
                    residual,
                    energy,
                });
            }
            if iteration >= tolerance.max_iterations {
                return Err(SolverError::NotConverged {
                    iterations: iteration,
                    residual,
                });
            }

            let power: f64 = forces
                .iter()
                .zip(&velocities)
                .map(|(force, velocity)| force.dot(velocity))
                .sum();
            if power >= 0.0 {
                let speed = velocities
                    .iter()
                    .map(|velocity| velocity.norm_squared())
                    .sum::<f64>()
                    .sqrt();
                let steer = alpha * speed / residual;
                for (velocity, force) in velocities.iter_mut().zip(&forces) {
                    *velocity = *velocity * (1.0 - alpha) + force * steer;
                }
                downhill += 1;
                if downhill > params.min_steps {
                    time_step = (time_step * params.time_step_growth).min(params.max_time_step);
                    alpha *= params.alpha_decay;
                }
            } else {
                time_step *= params.time_step_shrink;
                alpha = params.alpha_start;
                downhill = 0;
                velocities
                    .iter_mut()
                    .for_each(|velocity| *velocity = Vector2::zeros());
            }

            let coords = positions.as_mut_slice();
            for index in 0..count {
                if free[index] {
                    velocities[index] += forces[index] * time_step;
                    coords[index] += velocities[index] * time_step;
                }
            }
            iteration += 1;
        }
    }
}
