//! Run parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::solver::{FireParameters, Tolerance};
use crate::termination;
use crate::thresholds::ThresholdUnit;

/// How non-converged relaxations are retried.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Extra Relax calls allowed after the first one fails.
    pub max_retries: usize,
    /// Factor applied to the force tolerance before each retry.
    pub tolerance_growth: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            tolerance_growth: 10.0,
        }
    }
}

/// Parameters of one strain-controlled run.
///
/// Every field has a default, so a parameters file only needs to list the
/// values it changes.
///
/// # Examples
/// ```
/// use springnet::SimulationConfig;
///
/// let config: SimulationConfig = serde_json::from_str(r#"{ "total_steps": 20, "strain_increment": 0.05 }"#).unwrap();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.strain_limit, 1.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Maximum number of strain steps.
    pub total_steps: usize,
    /// Strain applied per step.
    pub strain_increment: f64,
    /// Strain at which the run stops.
    pub strain_limit: f64,
    /// Guard on Relax and Scan pairs within one step.
    pub max_avalanche_iterations: usize,
    /// Convergence criteria of the first Relax attempt.
    pub tolerance: Tolerance,
    /// Retry policy for non-converged relaxations.
    pub retry: RetryPolicy,
    /// Constants of the built-in FIRE solver.
    pub fire: FireParameters,
    /// Unit of the threshold file values.
    pub threshold_unit: ThresholdUnit,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_steps: 10,
            strain_increment: 0.1,
            strain_limit: 1.0,
            max_avalanche_iterations: 10_000,
            tolerance: Tolerance::default(),
            retry: RetryPolicy::default(),
            fire: FireParameters::default(),
            threshold_unit: ThresholdUnit::default(),
        }
    }
}

/// Build an [`ConfigError::InvalidParameter`].
fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        field,
        reason: reason.into(),
    }
}

impl SimulationConfig {
    /// Read parameters from a JSON file and validate them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read,
    /// [`ConfigError::Parameters`] when it is not valid JSON for this type and
    /// [`ConfigError::InvalidParameter`] when validation fails.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every parameter is in range and that the run is guaranteed
    /// to end by fracture or by reaching the strain limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_steps == 0 {
            return Err(invalid("total_steps", "must be at least 1"));
        }
        if !(self.strain_increment > 0.0 && self.strain_increment.is_finite()) {
            return Err(invalid("strain_increment", "must be positive and finite"));
        }
        if !(self.strain_limit > 0.0 && self.strain_limit.is_finite()) {
            return Err(invalid("strain_limit", "must be positive and finite"));
        }
        if self.max_avalanche_iterations == 0 {
            return Err(invalid("max_avalanche_iterations", "must be at least 1"));
        }
        if !(self.tolerance.force > 0.0 && self.tolerance.force.is_finite()) {
            return Err(invalid("tolerance.force", "must be positive and finite"));
        }
        if self.tolerance.max_iterations == 0 {
            return Err(invalid("tolerance.max_iterations", "must be at least 1"));
        }
        if !(self.retry.tolerance_growth >= 1.0 && self.retry.tolerance_growth.is_finite()) {
            return Err(invalid("retry.tolerance_growth", "must be finite and at least 1"));
        }
        if !(self.fire.time_step > 0.0 && self.fire.max_time_step >= self.fire.time_step) {
            return Err(invalid(
                "fire.time_step",
                "must be positive and not above fire.max_time_step",
            ));
        }
        let reachable = self.total_steps as f64 * self.strain_increment;
        if !termination::reaches(reachable, self.strain_limit) {
            return Err(invalid(
                "total_steps",
                format!(
                    "{} steps of {} reach strain {reachable}, short of the limit {}",
                    self.total_steps, self.strain_increment, self.strain_limit
                ),
            ));
        }
        Ok(())
    }
}
