//! Periodic triangular lattice with an embedded matrix of unbreakable springs.

use std::collections::{BTreeMap, HashSet};

use rand::Rng;

use crate::description::{
    BondCoefficients, BondRecord, NetworkDescription, ParticleRecord, UNBREAKABLE_CLASS,
};
use crate::geometry::point;
use crate::network::Group;
use crate::thresholds::{ThresholdTable, ThresholdUnit};

/// Parameters of a generated lattice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeSpec {
    /// Number of rows and of columns.
    pub size: usize,
    /// Spacing of the unbreakable matrix; zero disables it.
    pub matrix_period: usize,
    /// Nearest-neighbour distance.
    pub spacing: f64,
}

impl LatticeSpec {
    /// Lattice parameters with unit spacing.
    #[must_use]
    pub const fn new(size: usize, matrix_period: usize) -> Self {
        Self {
            size,
            matrix_period,
            spacing: 1.0,
        }
    }

    /// Tag of the particle at `(row, column)`, wrapping the column.
    fn tag(&self, row: usize, column: isize) -> u64 {
        let n = self.size as isize;
        let column = column.rem_euclid(n) as usize;
        (row * self.size + column) as u64 + 1
    }

    /// Sites bonded to `(row, column)` in the forward direction.
    fn forward_neighbours(&self, row: usize, column: usize) -> Vec<(usize, isize)> {
        let column = column as isize;
        let mut neighbours = vec![(row, column + 1)];
        if row + 1 < self.size {
            neighbours.push((row + 1, column));
            if row % 2 == 0 {
                neighbours.push((row + 1, column - 1));
            } else {
                neighbours.push((row + 1, column + 1));
            }
        }
        neighbours
    }

    /// Return `true` when the spring between two sites belongs to the matrix.
    ///
    /// Horizontal springs on rows that are multiples of the matrix period are
    /// unbreakable, as are springs joining two sites of the same column when
    /// that column is a multiple of the period.
    fn is_unbreakable(&self, a: (usize, usize), b: (usize, usize)) -> bool {
        let period = self.matrix_period;
        if period == 0 {
            return false;
        }
        let ((row_a, col_a), (row_b, col_b)) = (a, b);
        let column_gap = col_a.abs_diff(col_b);
        if row_a == row_b && row_a % period == 0 && (column_gap == 1 || column_gap == self.size - 1)
        {
            return true;
        }
        col_a == col_b && col_a % period == 0
    }

    /// Generate the lattice description.
    ///
    /// Breakable springs each get their own bond class, starting after
    /// [`UNBREAKABLE_CLASS`], so that every spring can carry its own threshold.
    ///
    /// # Examples
    /// ```
    /// use springnet::LatticeSpec;
    ///
    /// let description = LatticeSpec::new(4, 2).generate();
    /// assert_eq!(description.particles.len(), 16);
    /// assert_eq!(description.period, 4.0);
    /// ```
    #[must_use]
    pub fn generate(&self) -> NetworkDescription {
        let n = self.size;
        let row_height = self.spacing * 3.0_f64.sqrt() / 2.0;
        let mut particles = Vec::with_capacity(n * n);
        for row in 0..n {
            let group = if row == 0 {
                Group::Fixed
            } else if row + 1 == n {
                Group::Driven
            } else {
                Group::Mobile
            };
            for column in 0..n {
                let x = (column as f64 + 0.5 * (row % 2) as f64) * self.spacing;
                particles.push(ParticleRecord {
                    tag: self.tag(row, column as isize),
                    group,
                    position: point(x, row as f64 * row_height),
                });
            }
        }

        let mut seen = HashSet::new();
        let mut bonds = Vec::new();
        let mut next_class = UNBREAKABLE_CLASS + 1;
        for row in 0..n {
            for column in 0..n {
                let start = self.tag(row, column as isize);
                for (other_row, other_column) in self.forward_neighbours(row, column) {
                    let end = self.tag(other_row, other_column);
                    if start == end || !seen.insert((start.min(end), start.max(end))) {
                        continue;
                    }
                    let wrapped = other_column.rem_euclid(n as isize) as usize;
                    let class = if self.is_unbreakable((row, column), (other_row, wrapped)) {
                        UNBREAKABLE_CLASS
                    } else {
                        next_class += 1;
                        next_class - 1
                    };
                    bonds.push(BondRecord {
                        tag: bonds.len() as u64 + 1,
                        class,
                        start,
                        end,
                    });
                }
            }
        }

        let mut coefficients = BTreeMap::new();
        let spring = BondCoefficients {
            stiffness: 1.0,
            rest_length: Some(self.spacing),
        };
        for class in UNBREAKABLE_CLASS..next_class {
            coefficients.insert(class, spring);
        }
        tracing::debug!(
            size = n,
            particles = particles.len(),
            bonds = bonds.len(),
            "generated triangular lattice"
        );
        NetworkDescription {
            period: n as f64 * self.spacing,
            particles,
            bonds,
            coefficients,
        }
    }
}

/// Draw one breaking length per breakable class.
///
/// Breaking strains are uniform in `[0, 1)` and stored as lengths
/// `r0 (1 + strain)`, with `r0` taken from the class coefficients.
pub fn draw_thresholds<R: Rng>(
    description: &NetworkDescription,
    rng: &mut R,
) -> ThresholdTable {
    let mut table = ThresholdTable::new(ThresholdUnit::Length);
    for class in description.breakable_classes() {
        let rest_length = description
            .coefficients
            .get(&class)
            .and_then(|coefficients| coefficients.rest_length)
            .unwrap_or(1.0);
        let strain: f64 = rng.gen_range(0.0..1.0);
        table.insert(class, rest_length * (1.0 + strain));
    }
    table
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::network::BondState;

    #[test]
    fn triangular_lattice_has_expected_topology() {
        let description = LatticeSpec::new(4, 0).generate();
        // Every site has one horizontal forward bond and all but the last row two diagonal/vertical ones.
        assert_eq!(description.bonds.len(), 4 * 4 + 2 * 4 * 3);
        assert!(description
            .bonds
            .iter()
            .all(|bond| bond.class > UNBREAKABLE_CLASS));
        let fixed = description
            .particles
            .iter()
            .filter(|particle| particle.group == Group::Fixed)
            .count();
        assert_eq!(fixed, 4);
    }

    #[test]
    fn matrix_rows_and_columns_are_unbreakable() {
        let spec = LatticeSpec::new(4, 2);
        assert!(spec.is_unbreakable((0, 1), (0, 2)));
        assert!(spec.is_unbreakable((2, 3), (2, 0)));
        assert!(!spec.is_unbreakable((1, 1), (1, 2)));
        assert!(spec.is_unbreakable((1, 2), (2, 2)));
        assert!(!spec.is_unbreakable((1, 1), (2, 1)));
    }

    #[test]
    fn every_spring_has_unit_rest_length() {
        let description = LatticeSpec::new(6, 3).generate();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let thresholds = draw_thresholds(&description, &mut rng);
        let network = description.build(&thresholds).expect("lattice builds");
        let positions = network.reference_positions();
        for (bond, _, _, spring) in network.bonds() {
            let length = network
                .bond_vector(bond, &positions)
                .expect("positions cover the lattice")
                .norm();
            assert_relative_eq!(length, spring.rest_length(), epsilon = 1.0e-9);
            if let BondState::Breakable { threshold } = spring.state() {
                assert!((0.0..1.0 + 1.0e-12).contains(&threshold));
            }
        }
    }

    #[test]
    fn draws_are_reproducible_per_seed() {
        let description = LatticeSpec::new(4, 2).generate();
        let first = draw_thresholds(&description, &mut ChaCha8Rng::seed_from_u64(5));
        let second = draw_thresholds(&description, &mut ChaCha8Rng::seed_from_u64(5));
        let other = draw_thresholds(&description, &mut ChaCha8Rng::seed_from_u64(6));
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(first.len(), description.breakable_classes().count());
    }
}
