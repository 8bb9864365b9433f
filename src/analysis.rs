//! Crack-cluster statistics and the global stress of a relaxed network.
//!
//! Clusters are built from broken bonds only. Two broken bonds belong to the
//! same cluster when they share a particle that is not an endpoint of any
//! unbreakable bond, so the unbreakable matrix cuts cracks apart even where
//! broken bonds touch it.

use std::collections::BTreeMap;

use petgraph::unionfind::UnionFind;
use serde::Serialize;

use crate::geometry::Positions;
use crate::network::{BondId, BondState, Network};

/// Global stress `(1 / H0) sum K |r - r0| |dy| / r` over live bonds.
///
/// `H0` is the reference transverse extent of the network. Bonds with an
/// endpoint missing from `positions` and bonds of zero length contribute
/// nothing.
#[must_use]
pub fn global_stress(network: &Network, positions: &Positions) -> f64 {
    let height = network.height();
    if height <= 0.0 {
        return 0.0;
    }
    let total = network
        .bonds()
        .filter(|(_, _, _, spring)| spring.state().is_live())
        .filter_map(|(bond, _, _, spring)| {
            let delta = network.bond_vector(bond, positions)?;
            let length = delta.norm();
            (length > 0.0).then(|| {
                spring.stiffness() * (length - spring.rest_length()).abs() * delta.y.abs() / length
            })
        })
        .fold(0.0, |total, term| total + term);
    total / height
}

/// A maximal connected set of broken bonds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrackCluster {
    /// Ordinal of the cluster, by its lowest bond id.
    pub id: usize,
    /// Member bonds in ascending id order.
    pub bonds: Vec<BondId>,
}

impl CrackCluster {
    /// Number of member bonds.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bonds.len()
    }
}

/// Partition the broken bonds into crack clusters.
///
/// # Examples
/// ```
/// use springnet::{crack_clusters, point, BondState, Group, Network};
///
/// let mut network = Network::new(10.0);
/// let a = network.add_particle(1, point(0.0, 0.0), Group::Fixed);
/// let b = network.add_particle(2, point(1.0, 0.0), Group::Mobile);
/// let c = network.add_particle(3, point(2.0, 0.0), Group::Driven);
/// network.add_bond(1, a, b, BondState::Broken).unwrap();
/// network.add_bond(2, b, c, BondState::Broken).unwrap();
///
/// let clusters = crack_clusters(&network);
/// assert_eq!(clusters.len(), 1);
/// assert_eq!(clusters[0].size(), 2);
/// ```
#[must_use]
pub fn crack_clusters(network: &Network) -> Vec<CrackCluster> {
    let mut sets = UnionFind::<usize>::new(network.bond_count());
    for (particle, _) in network.particles() {
        let mut pinned = false;
        let mut broken = Vec::new();
        for (bond, spring) in network.incident_bonds(particle) {
            match spring.state() {
                BondState::Unbreakable => pinned = true,
                BondState::Broken => broken.push(bond.index()),
                BondState::Breakable { .. } => {}
            }
        }
        if pinned {
            continue;
        }
        if let Some((first, rest)) = broken.split_first() {
            for other in rest {
                sets.union(*first, *other);
            }
        }
    }

    let mut members: BTreeMap<usize, Vec<BondId>> = BTreeMap::new();
    let mut order = Vec::new();
    for (bond, _, _, spring) in network.bonds() {
        if spring.state() != BondState::Broken {
            continue;
        }
        let root = sets.find(bond.index());
        let entry = members.entry(root).or_default();
        if entry.is_empty() {
            order.push(root);
        }
        entry.push(bond);
    }

    order
        .into_iter()
        .enumerate()
        .map(|(id, root)| {
            let mut bonds = members.remove(&root).unwrap_or_default();
            bonds.sort();
            CrackCluster { id, bonds }
        })
        .collect()
}

/// Cluster moment `sum size^2`.
#[must_use]
pub fn cluster_moment(clusters: &[CrackCluster]) -> u64 {
    clusters
        .iter()
        .map(|cluster| {
            let size = cluster.size() as u64;
            size * size
        })
        .sum()
}

/// Crack growth `sqrt(|after - before|)` between two cluster moments.
#[must_use]
pub fn delta_c(before: u64, after: u64) -> f64 {
    (after.abs_diff(before) as f64).sqrt()
}

/// Change of global stress across one strain step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StressChange {
    /// Signed change `after - before`.
    pub raw: f64,
    /// Stress decrease, zero when the stress rose.
    pub drop: f64,
}

impl StressChange {
    /// Compare the pre-loop stress of a step with its settled stress.
    #[must_use]
    pub fn between(before: f64, after: f64) -> Self {
        Self {
            raw: after - before,
            drop: (before - after).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use petgraph::graph::NodeIndex;

    use super::*;
    use crate::geometry::point;
    use crate::network::Group;

    /// Unit square with its four sides broken and an unbreakable diagonal.
    fn bisected_square() -> Network {
        let mut network = Network::new(10.0);
        let a = network.add_particle(1, point(0.0, 0.0), Group::Fixed);
        let b = network.add_particle(2, point(1.0, 0.0), Group::Fixed);
        let c = network.add_particle(3, point(1.0, 1.0), Group::Driven);
        let d = network.add_particle(4, point(0.0, 1.0), Group::Driven);
        for (tag, (start, end)) in [(a, b), (b, c), (c, d), (d, a)].into_iter().enumerate() {
            network
                .add_bond(tag as u64 + 1, start, end, BondState::Broken)
                .expect("bond accepted");
        }
        network
            .add_bond(5, a, c, BondState::Unbreakable)
            .expect("bond accepted");
        network
    }

    #[test]
    fn unbreakable_bond_cuts_clusters() {
        let network = bisected_square();
        let clusters = crack_clusters(&network);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].bonds, vec![BondId::new(0), BondId::new(1)]);
        assert_eq!(clusters[1].bonds, vec![BondId::new(2), BondId::new(3)]);
        assert_eq!(cluster_moment(&clusters), 8);
    }

    #[test]
    fn intact_network_has_no_clusters() {
        let mut network = Network::new(10.0);
        let a = network.add_particle(1, point(0.0, 0.0), Group::Fixed);
        let b = network.add_particle(2, point(0.0, 1.0), Group::Driven);
        network
            .add_bond(1, a, b, BondState::Breakable { threshold: 0.5 })
            .expect("bond accepted");
        assert!(crack_clusters(&network).is_empty());
        assert_eq!(cluster_moment(&[]), 0);
    }

    #[test]
    fn isolated_breaks_are_separate_clusters() {
        let mut network = Network::new(10.0);
        let ids: Vec<_> = (0..4)
            .map(|i| network.add_particle(i + 1, point(i as f64, 0.0), Group::Mobile))
            .collect();
        network
            .add_bond(1, ids[0], ids[1], BondState::Broken)
            .expect("bond accepted");
        network
            .add_bond(2, ids[2], ids[3], BondState::Broken)
            .expect("bond accepted");
        let clusters = crack_clusters(&network);
        assert_eq!(clusters.len(), 2);
        assert_eq!(cluster_moment(&clusters), 2);
    }

    #[test]
    fn delta_c_is_symmetric_and_non_negative() {
        assert_relative_eq!(delta_c(1, 10), 3.0);
        assert_relative_eq!(delta_c(10, 1), 3.0);
        assert_eq!(delta_c(4, 4), 0.0);
    }

    #[test]
    fn stress_change_records_only_decreases_as_drops() {
        let rise = StressChange::between(1.0, 1.5);
        assert_relative_eq!(rise.raw, 0.5);
        assert_eq!(rise.drop, 0.0);
        let fall = StressChange::between(1.5, 1.0);
        assert_relative_eq!(fall.raw, -0.5);
        assert_relative_eq!(fall.drop, 0.5);
    }

    #[test]
    fn stress_counts_vertical_projection_of_live_bonds() {
        let mut network = Network::new(10.0);
        let a = network.add_particle(1, point(0.0, 0.0), Group::Fixed);
        let b = network.add_particle(2, point(0.0, 1.0), Group::Driven);
        let c = network.add_particle(3, point(1.0, 0.0), Group::Mobile);
        network
            .add_bond(1, a, b, BondState::Unbreakable)
            .expect("bond accepted");
        let horizontal = network
            .add_bond(2, a, c, BondState::Breakable { threshold: 1.0 })
            .expect("bond accepted");
        let mut positions = network.reference_positions();
        positions.set(NodeIndex::new(1), point(0.0, 1.2).to_vector());
        positions.set(NodeIndex::new(2), point(1.5, 0.0).to_vector());
        // Only the vertical bond projects onto the loading axis.
        assert_relative_eq!(global_stress(&network, &positions), 0.2);

        network.break_bond(horizontal);
        assert_relative_eq!(global_stress(&network, &positions), 0.2);
        assert_eq!(global_stress(&network, &network.reference_positions()), 0.0);
    }

    #[test]
    fn stress_without_live_bonds_is_positive_zero() {
        let mut network = Network::new(10.0);
        let a = network.add_particle(1, point(0.0, 0.0), Group::Fixed);
        let b = network.add_particle(2, point(0.0, 1.0), Group::Driven);
        let bond = network
            .add_bond(1, a, b, BondState::Breakable { threshold: 1.0 })
            .expect("bond accepted");
        network.break_bond(bond);
        let stress = global_stress(&network, &network.reference_positions());
        assert_eq!(stress, 0.0);
        assert!(stress.is_sign_positive());
    }
}
