//! Geometry primitives shared by the map, movement, and collision modules.
//!
//! The road network lives on an integer grid (`Point`); dogs and items move
//! in continuous coordinates (`Coords`). The segment projection helper is the
//! math core of the gather detector.

use serde::{Deserialize, Serialize};

/// Integer grid coordinate on the road network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Continuous world position of a dog or item.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
}

impl Coords {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Nearest grid point (round-to-nearest on both axes).
    pub fn rounded(self) -> Point {
        Point {
            x: self.x.round() as i32,
            y: self.y.round() as i32,
        }
    }

    pub fn sq_distance_to(self, other: Coords) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

impl From<Point> for Coords {
    fn from(p: Point) -> Self {
        Coords {
            x: p.x as f64,
            y: p.y as f64,
        }
    }
}

/// Velocity in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub dx: f64,
    pub dy: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Result of projecting a stationary point onto a swept segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Position along the segment, 0.0 at the start, 1.0 at the end.
    pub ratio: f64,
    /// Squared distance from the point to the segment's supporting line
    /// (or to the segment start for a degenerate segment).
    pub sq_distance: f64,
}

impl Projection {
    /// The projection falls within the segment itself.
    pub fn within_segment(&self) -> bool {
        (0.0..=1.0).contains(&self.ratio)
    }
}

/// Project point `target` onto the segment `start -> end`.
///
/// A zero-length segment degenerates to plain point distance with ratio 0,
/// so a gatherer that did not move this tick can still collect an item it is
/// standing on.
pub fn project_onto_segment(start: Coords, end: Coords, target: Coords) -> Projection {
    let ux = target.x - start.x;
    let uy = target.y - start.y;
    let vx = end.x - start.x;
    let vy = end.y - start.y;

    let v_sq_len = vx * vx + vy * vy;
    if v_sq_len == 0.0 {
        return Projection {
            ratio: 0.0,
            sq_distance: ux * ux + uy * uy,
        };
    }

    let u_dot_v = ux * vx + uy * vy;
    Projection {
        ratio: u_dot_v / v_sq_len,
        sq_distance: (ux * ux + uy * uy) - u_dot_v * u_dot_v / v_sq_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_to_grid() {
        assert_eq!(Coords::new(1.4, -0.6).rounded(), Point::new(1, -1));
        assert_eq!(Coords::new(1.5, 2.5).rounded(), Point::new(2, 3));
        assert_eq!(Coords::new(0.0, 0.0).rounded(), Point::new(0, 0));
    }

    #[test]
    fn test_projection_midpoint() {
        let p = project_onto_segment(
            Coords::new(0.0, 0.0),
            Coords::new(10.0, 0.0),
            Coords::new(5.0, 3.0),
        );
        assert!((p.ratio - 0.5).abs() < 1e-9);
        assert!((p.sq_distance - 9.0).abs() < 1e-9);
        assert!(p.within_segment());
    }

    #[test]
    fn test_projection_beyond_end() {
        let p = project_onto_segment(
            Coords::new(0.0, 0.0),
            Coords::new(10.0, 0.0),
            Coords::new(12.0, 0.0),
        );
        assert!(p.ratio > 1.0);
        assert!(!p.within_segment());
    }

    #[test]
    fn test_projection_degenerate_segment() {
        let a = Coords::new(3.0, 4.0);
        let p = project_onto_segment(a, a, Coords::new(3.0, 6.0));
        assert_eq!(p.ratio, 0.0);
        assert!((p.sq_distance - 4.0).abs() < 1e-9);
        assert!(p.within_segment());
    }
}
