//! Strain-controlled loading of the driven boundary.

use crate::geometry::{displacement, Positions};
use crate::network::{Group, Network};

/// Which boundary groups the solver must keep in place.
///
/// The fixed group is always held; the driven group is held only while an
/// avalanche is being relaxed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeldGroups {
    /// Whether the driven group is currently clamped.
    driven: bool,
}

impl HeldGroups {
    /// Only the fixed group is held.
    #[must_use]
    pub const fn released() -> Self {
        Self { driven: false }
    }

    /// Both boundary groups are held.
    #[must_use]
    pub const fn loaded() -> Self {
        Self { driven: true }
    }

    /// Return `true` when particles of `group` may not move.
    #[must_use]
    pub fn is_held(&self, group: Group) -> bool {
        match group {
            Group::Fixed => true,
            Group::Driven => self.driven,
            Group::Mobile => false,
        }
    }
}

impl Default for HeldGroups {
    fn default() -> Self {
        Self::released()
    }
}

/// Applies fixed strain increments to the driven group along Y.
///
/// The increment is a displacement in lattice units: each step moves the
/// driven group by `increment`, and the nominal strain after `n` steps is
/// `n * increment`.
#[derive(Clone, Debug)]
pub struct StrainDriver {
    /// Displacement added by each step.
    increment: f64,
    /// Hold state of the boundary groups.
    holds: HeldGroups,
}

impl StrainDriver {
    /// Create a driver moving the driven group by `increment` per step.
    #[must_use]
    pub fn new(increment: f64) -> Self {
        Self {
            increment,
            holds: HeldGroups::released(),
        }
    }

    /// Displacement of the driven group per step.
    #[must_use]
    pub fn step_displacement(&self) -> f64 {
        self.increment
    }

    /// Current hold state.
    #[must_use]
    pub fn holds(&self) -> HeldGroups {
        self.holds
    }

    /// Displace every driven particle by one increment and clamp the group
    /// for the duration of the avalanche.
    ///
    /// Returns the number of particles moved.
    pub fn apply_increment(&mut self, network: &Network, positions: &mut Positions) -> usize {
        let shift = displacement(0.0, self.step_displacement());
        let moved = network
            .group_members(Group::Driven)
            .into_iter()
            .filter(|particle| positions.translate(*particle, shift))
            .count();
        self.holds = HeldGroups::loaded();
        moved
    }

    /// Release the driven group once the avalanche has settled.
    pub fn release(&mut self) {
        self.holds = HeldGroups::released();
    }
}
