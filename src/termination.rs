//! End-of-run detection.

use petgraph::unionfind::UnionFind;
use serde::Serialize;

use crate::network::{Group, Network};

/// Relative slack used when comparing accumulated strain to the limit.
pub(crate) const STRAIN_TOLERANCE: f64 = 1.0e-9;

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    /// No live path joins the fixed and driven groups any more.
    GlobalFracture,
    /// The applied strain reached the configured limit.
    StrainLimit,
}

impl std::fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GlobalFracture => f.write_str("global fracture"),
            Self::StrainLimit => f.write_str("strain limit reached"),
        }
    }
}

/// Return `true` when `strain` has reached `limit` up to rounding.
pub(crate) fn reaches(strain: f64, limit: f64) -> bool {
    strain >= limit - STRAIN_TOLERANCE * limit.abs().max(1.0)
}

/// Return `true` while at least one fixed particle is joined to a driven
/// particle through live bonds.
#[must_use]
pub fn spans_boundaries(network: &Network) -> bool {
    let mut components = UnionFind::<usize>::new(network.particle_count());
    for (_, start, end, spring) in network.bonds() {
        if spring.state().is_live() {
            components.union(start.index(), end.index());
        }
    }
    let fixed: Vec<usize> = network
        .group_members(Group::Fixed)
        .into_iter()
        .map(|particle| components.find(particle.index()))
        .collect();
    network
        .group_members(Group::Driven)
        .into_iter()
        .any(|particle| fixed.contains(&components.find(particle.index())))
}

/// Decides after every strain step whether the run is over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerminationMonitor {
    /// Strain at which the run stops.
    strain_limit: f64,
}

impl TerminationMonitor {
    /// Create a monitor for the given strain limit.
    #[must_use]
    pub fn new(strain_limit: f64) -> Self {
        Self { strain_limit }
    }

    /// Check a stable configuration at the given applied strain.
    ///
    /// Fracture is reported in preference to the strain limit when both hold.
    #[must_use]
    pub fn check(&self, network: &Network, strain: f64) -> Option<TerminationCause> {
        if !spans_boundaries(network) {
            Some(TerminationCause::GlobalFracture)
        } else if reaches(strain, self.strain_limit) {
            Some(TerminationCause::StrainLimit)
        } else {
            None
        }
    }
}
