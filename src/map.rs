//! Immutable world maps — roads, buildings, offices, and the loot catalog.
//!
//! A `Map` is built once by the config loader and never mutated afterwards;
//! the registry hands it to sessions as `Arc<Map>`, so it is safe to read
//! from every session concurrently without locks. Horizontal roads are
//! indexed by row and vertical roads by column so the movement clamp can
//! find the covering road of a grid point without scanning the full list.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geom::Point;

/// Maximum allowed perpendicular deviation from a road's centerline.
pub const ROAD_HALF_WIDTH: f64 = 0.4;

/// Identifier of a map, unique within the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapId(String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A random road point was requested but the map has no roads.
    #[error("map has no roads to sample a point from")]
    EmptyRoads,
}

// ============================================================================
// Roads
// ============================================================================

/// An axis-aligned road segment.
///
/// Roads are stored normalized: `start <= end` on the travel axis, so range
/// checks and clamping never have to care about the drawing direction. The
/// point the road was drawn from is kept separately; the first road's drawn
/// start is the map's default spawn point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Road {
    start: Point,
    end: Point,
    drawn_start: Point,
}

impl Road {
    /// Horizontal road from `start` to `(end_x, start.y)`.
    pub fn horizontal(start: Point, end_x: i32) -> Self {
        let (x0, x1) = (start.x.min(end_x), start.x.max(end_x));
        Self {
            start: Point::new(x0, start.y),
            end: Point::new(x1, start.y),
            drawn_start: start,
        }
    }

    /// Vertical road from `start` to `(start.x, end_y)`.
    pub fn vertical(start: Point, end_y: i32) -> Self {
        let (y0, y1) = (start.y.min(end_y), start.y.max(end_y));
        Self {
            start: Point::new(start.x, y0),
            end: Point::new(start.x, y1),
            drawn_start: start,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    /// The end the road was drawn from, before normalization.
    pub fn drawn_start(&self) -> Point {
        self.drawn_start
    }
}

// ============================================================================
// Static map furniture
// ============================================================================

/// Decorative building footprint. Not involved in simulation, but part of
/// the map catalog handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Building {
    pub position: Point,
    pub width: i32,
    pub height: i32,
}

/// An office is a deposit base: visiting it converts bagged loot into score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Office {
    pub id: String,
    pub position: Point,
    /// Sprite offset, carried through for the presentation layer.
    pub offset: (i32, i32),
}

/// One entry of the map's loot catalog. Items refer to it by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootType {
    pub name: String,
    pub file: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub scale: f64,
    /// Score awarded when an item of this type is deposited at an office.
    #[serde(default)]
    pub value: u32,
}

// ============================================================================
// Map
// ============================================================================

/// Immutable description of one game world.
#[derive(Debug)]
pub struct Map {
    id: MapId,
    name: String,
    roads: Vec<Road>,
    horizontal_by_row: BTreeMap<i32, Vec<Road>>,
    vertical_by_column: BTreeMap<i32, Vec<Road>>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    loot_types: Vec<LootType>,
    dog_speed: f64,
    bag_capacity: usize,
    max_players: usize,
}

impl Map {
    pub fn new(
        id: MapId,
        name: impl Into<String>,
        dog_speed: f64,
        bag_capacity: usize,
        max_players: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            roads: Vec::new(),
            horizontal_by_row: BTreeMap::new(),
            vertical_by_column: BTreeMap::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            loot_types: Vec::new(),
            dog_speed,
            bag_capacity,
            max_players,
        }
    }

    pub fn add_road(&mut self, road: Road) {
        self.roads.push(road);
        if road.is_horizontal() {
            self.horizontal_by_row
                .entry(road.start.y)
                .or_default()
                .push(road);
        } else {
            self.vertical_by_column
                .entry(road.start.x)
                .or_default()
                .push(road);
        }
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    pub fn add_office(&mut self, office: Office) {
        self.offices.push(office);
    }

    pub fn add_loot_type(&mut self, loot_type: LootType) {
        self.loot_types.push(loot_type);
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    pub fn loot_types(&self) -> &[LootType] {
        &self.loot_types
    }

    /// Dog movement speed on this map, world units per second.
    pub fn dog_speed(&self) -> f64 {
        self.dog_speed
    }

    /// Maximum number of items a dog's bag can hold on this map.
    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    /// Session capacity: dogs per session before a new one is opened.
    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Horizontal road whose span covers the grid point, if any.
    pub fn horizontal_road_at(&self, point: Point) -> Option<&Road> {
        self.horizontal_by_row
            .get(&point.y)?
            .iter()
            .find(|road| (road.start.x..=road.end.x).contains(&point.x))
    }

    /// Vertical road whose span covers the grid point, if any.
    pub fn vertical_road_at(&self, point: Point) -> Option<&Road> {
        self.vertical_by_column
            .get(&point.x)?
            .iter()
            .find(|road| (road.start.y..=road.end.y).contains(&point.y))
    }

    /// Spawn point when randomized spawns are off: the first road's drawn
    /// start, which may be its high-coordinate end.
    pub fn start_point(&self) -> Result<Point, MapError> {
        self.roads
            .first()
            .map(Road::drawn_start)
            .ok_or(MapError::EmptyRoads)
    }

    /// Uniformly random grid point on a uniformly random road.
    pub fn random_road_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Point, MapError> {
        if self.roads.is_empty() {
            return Err(MapError::EmptyRoads);
        }
        let road = &self.roads[rng.gen_range(0..self.roads.len())];
        Ok(if road.is_horizontal() {
            Point::new(rng.gen_range(road.start.x..=road.end.x), road.start.y)
        } else {
            Point::new(road.start.x, rng.gen_range(road.start.y..=road.end.y))
        })
    }
}
