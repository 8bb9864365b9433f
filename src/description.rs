//! Static description of a network, as read from disk or produced by the lattice
//! generator, and its conversion into a validated [`Network`].

use std::collections::{BTreeMap, HashMap};

use crate::errors::ConfigError;
use crate::geometry::Point;
use crate::network::{BondState, Group, Network, ParticleId};
use crate::thresholds::ThresholdTable;

/// Bond class of springs that have already been removed.
pub const BROKEN_CLASS: u32 = 0;

/// Bond class of springs that never break.
pub const UNBREAKABLE_CLASS: u32 = 1;

/// A particle entry of the description.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleRecord {
    /// External identifier, unique within the description.
    pub tag: u64,
    /// Boundary group.
    pub group: Group,
    /// Reference position.
    pub position: Point,
}

/// A bond entry of the description.
#[derive(Clone, Debug, PartialEq)]
pub struct BondRecord {
    /// External identifier.
    pub tag: u64,
    /// Bond class: [`BROKEN_CLASS`], [`UNBREAKABLE_CLASS`] or a breakable class.
    pub class: u32,
    /// Tag of the first particle.
    pub start: u64,
    /// Tag of the second particle.
    pub end: u64,
}

/// Spring coefficients shared by all bonds of a class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BondCoefficients {
    /// Spring constant `K`.
    pub stiffness: f64,
    /// Rest length `r0`; the reference separation is used when absent.
    pub rest_length: Option<f64>,
}

impl Default for BondCoefficients {
    fn default() -> Self {
        Self {
            stiffness: 1.0,
            rest_length: None,
        }
    }
}

/// Minimum-image distance between two particles' reference positions.
fn reference_separation(network: &Network, start: ParticleId, end: ParticleId) -> f64 {
    match (network.particle(start), network.particle(end)) {
        (Some(a), Some(b)) => network
            .separation_between(a.reference.to_vector(), b.reference.to_vector())
            .norm(),
        _ => 0.0,
    }
}

/// Everything needed to build a [`Network`] except the breaking thresholds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkDescription {
    /// Period of the X axis.
    pub period: f64,
    /// Particle entries.
    pub particles: Vec<ParticleRecord>,
    /// Bond entries.
    pub bonds: Vec<BondRecord>,
    /// Coefficients per bond class.
    pub coefficients: BTreeMap<u32, BondCoefficients>,
}

impl NetworkDescription {
    /// Classes of all breakable bonds, in bond order.
    pub fn breakable_classes(&self) -> impl Iterator<Item = u32> + '_ {
        self.bonds
            .iter()
            .map(|bond| bond.class)
            .filter(|class| *class > UNBREAKABLE_CLASS)
    }

    /// Build the network, resolving every breakable bond's threshold.
    ///
    /// Nothing is returned unless every check passes, so a failed build never
    /// leaves a partially-initialised sample behind.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a non-positive period, duplicate particles,
    /// bonds to unknown particles, breakable bonds without a threshold, invalid
    /// coefficients, a missing fixed or driven group, or zero transverse extent.
    pub fn build(&self, thresholds: &ThresholdTable) -> Result<Network, ConfigError> {
        if !(self.period > 0.0 && self.period.is_finite()) {
            return Err(ConfigError::InvalidPeriod(self.period));
        }
        let mut network = Network::new(self.period);
        let mut ids = HashMap::with_capacity(self.particles.len());
        for record in &self.particles {
            let id = network.add_particle(record.tag, record.position, record.group);
            if ids.insert(record.tag, id).is_some() {
                return Err(ConfigError::DuplicateParticle(record.tag));
            }
        }
        for group in [Group::Fixed, Group::Driven] {
            if network.group_members(group).is_empty() {
                return Err(ConfigError::MissingGroup(match group {
                    Group::Fixed => "fixed",
                    _ => "driven",
                }));
            }
        }
        if network.height() <= 0.0 {
            return Err(ConfigError::DegenerateHeight);
        }

        for record in &self.bonds {
            let lookup = |particle: u64| {
                ids.get(&particle)
                    .copied()
                    .ok_or(ConfigError::UnknownEndpoint {
                        bond: record.tag,
                        particle,
                    })
            };
            let start = lookup(record.start)?;
            let end = lookup(record.end)?;
            let coefficients = self
                .coefficients
                .get(&record.class)
                .copied()
                .unwrap_or_default();
            let rest_length = match coefficients.rest_length {
                Some(rest_length) => rest_length,
                None => reference_separation(&network, start, end),
            };
            let state = match record.class {
                BROKEN_CLASS => BondState::Broken,
                UNBREAKABLE_CLASS => BondState::Unbreakable,
                class => BondState::Breakable {
                    threshold: thresholds.strain_threshold(class, rest_length).ok_or(
                        ConfigError::MissingThreshold {
                            bond: record.tag,
                            class,
                        },
                    )?,
                },
            };

            let bond = network.add_bond(record.tag, start, end, state)?;
            if coefficients.rest_length.is_some() {
                network.set_bond_rest_length(bond, rest_length)?;
            }
            network.set_bond_stiffness(bond, coefficients.stiffness)?;
        }
        tracing::debug!(
            particles = network.particle_count(),
            bonds = network.bond_count(),
            "network built"
        );
        Ok(network)
    }
}
