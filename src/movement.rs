//! Road-constrained movement.
//!
//! Dogs move along their facing axis only; per tick the ballistic target is
//! clamped so a dog never leaves the walkable corridor around a road's
//! centerline (`ROAD_HALF_WIDTH`). Overshooting a road end snaps the dog to
//! the corridor edge and stops it.
//!
//! The four cardinal directions collapse into one clamp routine keyed by
//! an (axis, sign) decomposition rather than four near-identical branches.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geom::{Coords, Vec2};
use crate::map::{Map, ROAD_HALF_WIDTH};

/// Travel axis of a cardinal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Facing of a dog. North is negative y, matching the map's screen-space
/// orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn axis(self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::X,
            Direction::North | Direction::South => Axis::Y,
        }
    }

    /// Sign of motion along the travel axis.
    pub fn sign(self) -> f64 {
        match self {
            Direction::South | Direction::East => 1.0,
            Direction::North | Direction::West => -1.0,
        }
    }

    /// Velocity vector for this facing at the given speed.
    pub fn velocity(self, speed: f64) -> Vec2 {
        match self.axis() {
            Axis::X => Vec2::new(self.sign() * speed, 0.0),
            Axis::Y => Vec2::new(0.0, self.sign() * speed),
        }
    }
}

/// A validated movement command: face-and-go in a cardinal direction, or
/// stop in place. This is the entire move vocabulary the core accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveIntent {
    Go(Direction),
    Stop,
}

/// Rejection of a move command outside the closed vocabulary.
#[derive(Debug, thiserror::Error)]
#[error("invalid move {0:?}, expected one of north/south/east/west/stop")]
pub struct InvalidMove(String);

impl FromStr for MoveIntent {
    type Err = InvalidMove;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "north" => Ok(MoveIntent::Go(Direction::North)),
            "south" => Ok(MoveIntent::Go(Direction::South)),
            "east" => Ok(MoveIntent::Go(Direction::East)),
            "west" => Ok(MoveIntent::Go(Direction::West)),
            "stop" => Ok(MoveIntent::Stop),
            other => Err(InvalidMove(other.to_string())),
        }
    }
}

/// Result of one tick of movement for a single dog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    pub position: Coords,
    /// The ballistic target overshot the corridor and was clamped; the
    /// caller must zero the dog's velocity.
    pub stopped: bool,
}

/// Advance `position` by `velocity` over `delta`, clamped to the road
/// corridor along the facing axis. The cross-axis coordinate is never
/// touched.
///
/// The covering road is looked up at the *rounded current* position; when
/// no road covers it (the dog sits exactly at an unindexed node) the dog
/// may still wander up to the tolerance away from that grid point.
pub fn apply_move(
    map: &Map,
    position: Coords,
    facing: Direction,
    velocity: Vec2,
    delta: Duration,
) -> MoveOutcome {
    let secs = delta.as_secs_f64();
    let raw = Coords::new(
        position.x + velocity.dx * secs,
        position.y + velocity.dy * secs,
    );
    let grid = position.rounded();

    // Travel-axis pieces: the raw target coordinate, the fallback anchor,
    // and the covering road's span (if any) along that axis.
    let (travel_raw, anchor, road_span) = match facing.axis() {
        Axis::X => (
            raw.x,
            grid.x as f64,
            map.horizontal_road_at(grid)
                .map(|r| (r.start().x as f64, r.end().x as f64)),
        ),
        Axis::Y => (
            raw.y,
            grid.y as f64,
            map.vertical_road_at(grid)
                .map(|r| (r.start().y as f64, r.end().y as f64)),
        ),
    };

    let bound = match road_span {
        Some((lo, hi)) => {
            if facing.sign() > 0.0 {
                hi + ROAD_HALF_WIDTH
            } else {
                lo - ROAD_HALF_WIDTH
            }
        }
        None => anchor + facing.sign() * ROAD_HALF_WIDTH,
    };

    let overshoots = if facing.sign() > 0.0 {
        travel_raw > bound
    } else {
        travel_raw < bound
    };
    let travel = if overshoots { bound } else { travel_raw };

    let position = match facing.axis() {
        Axis::X => Coords::new(travel, position.y),
        Axis::Y => Coords::new(position.x, travel),
    };
    MoveOutcome {
        position,
        stopped: overshoots,
    }
}
