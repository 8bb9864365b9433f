//! Bond breaking scanner.

use crate::geometry::Positions;
use crate::network::{BondId, BondState, Network};

/// Result of one scan pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Bonds broken by this pass.
    pub broken: Vec<BondId>,
    /// Breakable bonds skipped because an endpoint had no position.
    pub skipped: Vec<BondId>,
}

impl ScanReport {
    /// Number of bonds broken by this pass.
    #[must_use]
    pub fn broken_count(&self) -> usize {
        self.broken.len()
    }
}

/// Break every breakable bond whose strain exceeds its threshold.
///
/// All strains are evaluated against `positions` before any bond changes
/// state, so breaking one bond never affects the test of another within the
/// same pass. Bonds with an endpoint missing from `positions` are left
/// untouched and reported in [`ScanReport::skipped`].
///
/// # Examples
/// ```
/// use springnet::{point, scan, BondState, Group, Network};
///
/// let mut network = Network::new(10.0);
/// let a = network.add_particle(1, point(0.0, 0.0), Group::Fixed);
/// let b = network.add_particle(2, point(0.0, 1.0), Group::Driven);
/// network.add_bond(1, a, b, BondState::Breakable { threshold: 0.1 }).unwrap();
///
/// let mut positions = network.reference_positions();
/// positions.set(b, point(0.0, 1.2).to_vector());
/// assert_eq!(scan(&mut network, &positions).broken_count(), 1);
/// assert_eq!(scan(&mut network, &positions).broken_count(), 0);
/// ```
pub fn scan(network: &mut Network, positions: &Positions) -> ScanReport {
    let mut report = ScanReport::default();
    for (bond, _, _, spring) in network.bonds() {
        let BondState::Breakable { threshold } = spring.state() else {
            continue;
        };
        match network.bond_vector(bond, positions) {
            Some(delta) => {
                if spring.strain_at(delta.norm()) > threshold {
                    report.broken.push(bond);
                }
            }
            None => {
                tracing::warn!(bond = spring.tag, "bond endpoint has no position, skipping");
                report.skipped.push(bond);
            }
        }
    }
    for bond in &report.broken {
        network.break_bond(*bond);
    }
    report
}

#[cfg(test)]
mod tests {
    use petgraph::graph::NodeIndex;

    use super::*;
    use crate::geometry::{point, Positions};
    use crate::network::Group;

    /// Fixed particle with two mobile neighbours above it.
    fn fan() -> Network {
        let mut network = Network::new(4.0);
        let base = network.add_particle(1, point(0.0, 0.0), Group::Fixed);
        let left = network.add_particle(2, point(0.0, 1.0), Group::Driven);
        let right = network.add_particle(3, point(1.0, 0.0), Group::Mobile);
        network
            .add_bond(1, base, left, BondState::Breakable { threshold: 0.1 })
            .expect("bond accepted");
        network
            .add_bond(2, base, right, BondState::Breakable { threshold: 0.1 })
            .expect("bond accepted");
        network
            .add_bond(3, left, right, BondState::Unbreakable)
            .expect("bond accepted");
        network
    }

    #[test]
    fn unstrained_network_is_stable() {
        let mut network = fan();
        let positions = network.reference_positions();
        let report = scan(&mut network, &positions);
        assert_eq!(report, ScanReport::default());
        assert_eq!(network.live_bond_count(), 3);
    }

    #[test]
    fn simultaneous_overloads_break_in_one_pass() {
        let mut network = fan();
        let mut positions = network.reference_positions();
        positions.set(NodeIndex::new(1), point(0.0, 1.5).to_vector());
        positions.set(NodeIndex::new(2), point(1.5, 0.0).to_vector());
        let report = scan(&mut network, &positions);
        assert_eq!(report.broken_count(), 2);
        // The unbreakable bond is stretched too but never breaks.
        assert_eq!(network.live_bond_count(), 1);
        assert_eq!(scan(&mut network, &positions).broken_count(), 0);
    }

    #[test]
    fn compression_counts_as_strain() {
        let mut network = fan();
        let mut positions = network.reference_positions();
        positions.set(NodeIndex::new(1), point(0.0, 0.8).to_vector());
        assert_eq!(scan(&mut network, &positions).broken_count(), 1);
    }

    #[test]
    fn wrapped_coordinates_use_minimum_image() {
        let mut network = fan();
        let mut positions = network.reference_positions();
        // One full period away is the same place.
        positions.set(NodeIndex::new(2), point(5.0, 0.0).to_vector());
        assert_eq!(scan(&mut network, &positions).broken_count(), 0);
    }

    #[test]
    fn bonds_without_positions_are_skipped() {
        let mut network = fan();
        let positions = Positions::from_vec(vec![point(0.0, 0.0).to_vector()]);
        let report = scan(&mut network, &positions);
        assert!(report.broken.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(network.live_bond_count(), 3);
    }
}
