//! Particles, bonds and the network that owns them.

use nalgebra::Vector2;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::errors::{BondPropertyError, NetworkEditError};
use crate::geometry::{minimum_image, Point, Positions};

/// Stable identifier of a particle.
pub type ParticleId = NodeIndex;

/// Stable identifier of a bond.
pub type BondId = EdgeIndex;

/// Boundary group a particle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Group {
    /// Bottom row, held immobile for the whole run.
    Fixed,
    /// Top row, displaced by the strain driver and held during avalanches.
    Driven,
    /// Interior particle, free to relax.
    Mobile,
}

/// A particle of the network.
#[derive(Clone, Debug)]
pub struct Particle {
    /// External identifier from the network description.
    pub tag: u64,
    /// Boundary group membership.
    pub group: Group,
    /// Position at construction time.
    pub reference: Point,
}

/// Liveness of a bond.
///
/// A bond only ever moves from [`BondState::Breakable`] to [`BondState::Broken`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BondState {
    /// Intact spring that breaks once its strain exceeds `threshold`.
    Breakable {
        /// Breaking strain, fixed for the lifetime of the sample.
        threshold: f64,
    },
    /// Intact spring that never breaks.
    Unbreakable,
    /// Removed spring exerting no force.
    Broken,
}

impl BondState {
    /// Return `true` while the bond still carries load.
    #[must_use]
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Broken)
    }

    /// Breaking strain of a live bond; unbreakable bonds report infinity.
    #[must_use]
    pub fn threshold(self) -> Option<f64> {
        match self {
            Self::Breakable { threshold } => Some(threshold),
            Self::Unbreakable => Some(f64::INFINITY),
            Self::Broken => None,
        }
    }
}

/// A harmonic spring between two particles.
#[derive(Clone, Debug)]
pub struct Bond {
    /// External identifier from the network description.
    pub tag: u64,
    /// Current liveness.
    state: BondState,
    /// Length at which the spring is unstressed.
    rest_length: f64,
    /// Spring constant `K` of the energy `K (r - r0)^2`.
    stiffness: f64,
}

impl Bond {
    /// Current liveness.
    #[must_use]
    pub fn state(&self) -> BondState {
        self.state
    }

    /// Unstressed length.
    #[must_use]
    pub fn rest_length(&self) -> f64 {
        self.rest_length
    }

    /// Spring constant.
    #[must_use]
    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Relative elongation `|length - rest| / rest` for a given length.
    #[must_use]
    pub fn strain_at(&self, length: f64) -> f64 {
        (length - self.rest_length).abs() / self.rest_length
    }
}

/// Container for a two-dimensional spring network, periodic along X.
///
/// Bond liveness can only be changed through [`Network::break_bond`], which is
/// reserved for the scanner; particle positions live outside the network in a
/// [`Positions`] buffer handed to the solver.
#[derive(Clone, Debug)]
pub struct Network {
    /// Underlying graph storage for particles and bonds.
    graph: UnGraph<Particle, Bond>,
    /// Period of the X axis.
    period: f64,
}

impl Network {
    /// Create an empty network with the given X period.
    ///
    /// # Examples
    /// ```
    /// use springnet::Network;
    ///
    /// let network = Network::new(10.0);
    /// assert_eq!(network.particle_count(), 0);
    /// ```
    #[must_use]
    pub fn new(period: f64) -> Self {
        Self {
            graph: UnGraph::default(),
            period,
        }
    }

    /// Return the number of particles.
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of bonds, broken ones included.
    #[must_use]
    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Period of the X axis.
    #[must_use]
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Add a particle and return its id.
    ///
    /// # Examples
    /// ```
    /// use springnet::{point, Group, Network};
    ///
    /// let mut network = Network::new(4.0);
    /// let particle = network.add_particle(7, point(0.0, 0.0), Group::Fixed);
    /// assert_eq!(network.particle_count(), 1);
    /// assert_eq!(particle.index(), 0);
    /// ```
    pub fn add_particle(&mut self, tag: u64, reference: Point, group: Group) -> ParticleId {
        self.graph.add_node(Particle {
            tag,
            group,
            reference,
        })
    }

    /// Connect two particles with a unit-stiffness spring whose rest length is
    /// their current minimum-image separation.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkEditError::UnknownParticle`] when an endpoint is not part of
    /// this network, [`NetworkEditError::SelfBond`] when both endpoints coincide, and
    /// [`NetworkEditError::InvalidBondProperties`] for a negative threshold or a
    /// zero-length rest configuration.
    pub fn add_bond(
        &mut self,
        tag: u64,
        start: ParticleId,
        end: ParticleId,
        state: BondState,
    ) -> Result<BondId, NetworkEditError> {
        let a = self
            .graph
            .node_weight(start)
            .ok_or(NetworkEditError::UnknownParticle(start))?;
        let b = self
            .graph
            .node_weight(end)
            .ok_or(NetworkEditError::UnknownParticle(end))?;
        if start == end {
            return Err(NetworkEditError::SelfBond(start));
        }
        let rest_length = self
            .separation_between(a.reference.to_vector(), b.reference.to_vector())
            .norm();
        let bond = EdgeIndex::new(self.graph.edge_count());
        if let BondState::Breakable { threshold } = state {
            if !(threshold >= 0.0) {
                return Err(NetworkEditError::InvalidBondProperties(
                    BondPropertyError::InvalidThreshold { bond, threshold },
                ));
            }
        }
        if !(rest_length > 0.0) {
            return Err(NetworkEditError::InvalidBondProperties(
                BondPropertyError::NonPositiveRestLength { bond, rest_length },
            ));
        }
        Ok(self.graph.add_edge(
            start,
            end,
            Bond {
                tag,
                state,
                rest_length,
                stiffness: 1.0,
            },
        ))
    }

    /// Override the rest length of a bond.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkEditError::UnknownBond`] when `bond` is not part of this network
    /// and [`NetworkEditError::InvalidBondProperties`] when `rest_length` is not
    /// strictly positive.
    pub fn set_bond_rest_length(
        &mut self,
        bond: BondId,
        rest_length: f64,
    ) -> Result<(), NetworkEditError> {
        let edge = self
            .graph
            .edge_weight_mut(bond)
            .ok_or(NetworkEditError::UnknownBond(bond))?;
        if !(rest_length > 0.0 && rest_length.is_finite()) {
            return Err(NetworkEditError::InvalidBondProperties(
                BondPropertyError::NonPositiveRestLength { bond, rest_length },
            ));
        }
        edge.rest_length = rest_length;
        Ok(())
    }

    /// Override the spring constant of a bond.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkEditError::UnknownBond`] when `bond` is not part of this network
    /// and [`NetworkEditError::InvalidBondProperties`] when `stiffness` is not
    /// strictly positive.
    pub fn set_bond_stiffness(
        &mut self,
        bond: BondId,
        stiffness: f64,
    ) -> Result<(), NetworkEditError> {
        let edge = self
            .graph
            .edge_weight_mut(bond)
            .ok_or(NetworkEditError::UnknownBond(bond))?;
        if !(stiffness > 0.0 && stiffness.is_finite()) {
            return Err(NetworkEditError::InvalidBondProperties(
                BondPropertyError::NonPositiveStiffness { bond, stiffness },
            ));
        }
        edge.stiffness = stiffness;
        Ok(())
    }

    /// Retrieve a particle.
    #[must_use]
    pub fn particle(&self, particle: ParticleId) -> Option<&Particle> {
        self.graph.node_weight(particle)
    }

    /// Retrieve a bond.
    #[must_use]
    pub fn bond(&self, bond: BondId) -> Option<&Bond> {
        self.graph.edge_weight(bond)
    }

    /// Endpoints of a bond.
    #[must_use]
    pub fn endpoints(&self, bond: BondId) -> Option<(ParticleId, ParticleId)> {
        self.graph.edge_endpoints(bond)
    }

    /// Iterate over every particle with its id.
    pub fn particles(&self) -> impl Iterator<Item = (ParticleId, &Particle)> + '_ {
        self.graph
            .node_indices()
            .map(move |node| (node, &self.graph[node]))
    }

    /// Iterate over every bond with its id and endpoints.
    pub fn bonds(&self) -> impl Iterator<Item = (BondId, ParticleId, ParticleId, &Bond)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.id(), edge.source(), edge.target(), edge.weight()))
    }

    /// Iterate over the bonds touching a particle.
    pub fn incident_bonds(&self, particle: ParticleId) -> impl Iterator<Item = (BondId, &Bond)> + '_ {
        self.graph
            .edges(particle)
            .map(|edge| (edge.id(), edge.weight()))
    }

    /// Ids of the particles in a boundary group.
    #[must_use]
    pub fn group_members(&self, group: Group) -> Vec<ParticleId> {
        self.particles()
            .filter(|(_, particle)| particle.group == group)
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of bonds that still carry load.
    #[must_use]
    pub fn live_bond_count(&self) -> usize {
        self.graph
            .edge_weights()
            .filter(|bond| bond.state.is_live())
            .count()
    }

    /// Number of broken bonds.
    #[must_use]
    pub fn broken_bond_count(&self) -> usize {
        self.bond_count() - self.live_bond_count()
    }

    /// Extent of the reference configuration along the loading axis.
    #[must_use]
    pub fn height(&self) -> f64 {
        let (low, high) = self.graph.node_weights().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(low, high), particle| (low.min(particle.reference.y), high.max(particle.reference.y)),
        );
        if high >= low {
            high - low
        } else {
            0.0
        }
    }

    /// Reference coordinates of every particle, ready to seed a solver.
    #[must_use]
    pub fn reference_positions(&self) -> Positions {
        Positions::from_vec(
            self.graph
                .node_weights()
                .map(|particle| particle.reference.to_vector())
                .collect(),
        )
    }

    /// Separation vector from `start` to `end` with X wrapped to the nearest image.
    #[must_use]
    pub fn separation_between(&self, start: Vector2<f64>, end: Vector2<f64>) -> Vector2<f64> {
        let delta = end - start;
        Vector2::new(minimum_image(delta.x, self.period), delta.y)
    }

    /// Minimum-image separation vector across a bond, or `None` when an
    /// endpoint has no position.
    #[must_use]
    pub fn bond_vector(&self, bond: BondId, positions: &Positions) -> Option<Vector2<f64>> {
        let (start, end) = self.endpoints(bond)?;
        Some(self.separation_between(positions.get(start)?, positions.get(end)?))
    }

    /// Mark a breakable bond as broken.
    ///
    /// Returns `true` only for an actual `Breakable -> Broken` transition.
    pub(crate) fn break_bond(&mut self, bond: BondId) -> bool {
        match self.graph.edge_weight_mut(bond) {
            Some(edge) if matches!(edge.state, BondState::Breakable { .. }) => {
                edge.state = BondState::Broken;
                true
            }
            _ => false,
        }
    }
}
