//! Planar geometric types shared by the network, the solver and the analysers.

use nalgebra::Vector2;
use petgraph::graph::NodeIndex;

/// Position in the plane of the network, in lattice units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Coordinate along the periodic X axis.
    pub x: f64,
    /// Coordinate along the loading Y axis.
    pub y: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<Vector2<f64>> for Point {
    fn from(value: Vector2<f64>) -> Self {
        Self::new(value.x, value.y)
    }
}

impl From<Point> for Vector2<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Translation applied to a group of particles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Displacement {
    /// Component along the periodic X axis.
    pub x: f64,
    /// Component along the loading Y axis.
    pub y: f64,
}

impl Displacement {
    /// Create a [`Displacement`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert the displacement into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl Default for Displacement {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Wrap a separation along the periodic axis onto its shortest image.
///
/// Periods that are not strictly positive and finite leave `dx` untouched.
///
/// # Examples
/// ```
/// use springnet::minimum_image;
///
/// assert_eq!(minimum_image(9.0, 10.0), -1.0);
/// assert_eq!(minimum_image(5.0, 10.0).abs(), 5.0);
/// ```
#[must_use]
pub fn minimum_image(dx: f64, period: f64) -> f64 {
    if period > 0.0 && period.is_finite() {
        dx - period * (dx / period).round()
    } else {
        dx
    }
}

/// Current coordinates of every particle, indexed by particle id.
///
/// The equilibrium solver owns this buffer while it relaxes the network; the
/// controller only reads it between solver calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Positions {
    /// Coordinates stored in particle index order.
    coords: Vec<Vector2<f64>>,
}

impl Positions {
    /// Build a position set from coordinates in particle index order.
    #[must_use]
    pub fn from_vec(coords: Vec<Vector2<f64>>) -> Self {
        Self { coords }
    }

    /// Number of particles with a known position.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Return `true` when no position is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Position of a particle, if the buffer covers it.
    #[must_use]
    pub fn get(&self, particle: NodeIndex) -> Option<Vector2<f64>> {
        self.coords.get(particle.index()).copied()
    }

    /// Overwrite the position of a particle.
    ///
    /// Returns `false` when the buffer does not cover `particle`.
    pub fn set(&mut self, particle: NodeIndex, position: Vector2<f64>) -> bool {
        match self.coords.get_mut(particle.index()) {
            Some(slot) => {
                *slot = position;
                true
            }
            None => false,
        }
    }

    /// Translate a particle by `displacement`.
    pub fn translate(&mut self, particle: NodeIndex, displacement: Displacement) -> bool {
        match self.coords.get_mut(particle.index()) {
            Some(slot) => {
                *slot += displacement.to_vector();
                true
            }
            None => false,
        }
    }

    /// Mutable view of all coordinates.
    pub fn as_mut_slice(&mut self) -> &mut [Vector2<f64>] {
        &mut self.coords
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use springnet::point;
///
/// let origin = point(0.0, 0.0);
/// assert_eq!(origin.y, 0.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Convenience helper for creating [`Displacement`] instances.
#[must_use]
pub const fn displacement(x: f64, y: f64) -> Displacement {
    Displacement::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_to_vector_roundtrip() {
        let origin = Point::new(1.0, 2.0);
        let vector: Vector2<f64> = origin.into();
        assert_eq!(vector, Vector2::new(1.0, 2.0));
        assert_eq!(Point::from(vector), origin);
    }

    #[test]
    fn half_period_separation_is_half_period_from_any_image() {
        let period = 8.0;
        for raw in [4.0, -4.0, 12.0, -12.0, 20.0] {
            assert_eq!(minimum_image(raw, period).abs(), 4.0);
        }
    }

    #[test]
    fn minimum_image_picks_nearest_copy() {
        assert_eq!(minimum_image(7.0, 8.0), -1.0);
        assert_eq!(minimum_image(-7.5, 8.0), 0.5);
        assert_eq!(minimum_image(0.25, 8.0), 0.25);
    }

    #[test]
    fn non_periodic_axis_is_left_alone() {
        assert_eq!(minimum_image(7.0, 0.0), 7.0);
        assert_eq!(minimum_image(7.0, f64::INFINITY), 7.0);
    }

    #[test]
    fn translate_ignores_unknown_particles() {
        let mut positions = Positions::from_vec(vec![Vector2::new(0.0, 0.0)]);
        assert!(positions.translate(NodeIndex::new(0), displacement(0.0, 0.5)));
        assert!(!positions.translate(NodeIndex::new(3), displacement(0.0, 0.5)));
        assert_eq!(positions.get(NodeIndex::new(0)), Some(Vector2::new(0.0, 0.5)));
    }
}
