//! World configuration loading.
//!
//! The world file is a single JSON document describing every map: roads,
//! buildings, offices, the loot catalog, per-map speed/capacity overrides,
//! and the loot generator parameters. It is parsed with serde into raw
//! entries, validated, and turned into immutable `Map` values.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::geom::Point;
use crate::map::{Building, LootType, Map, MapId, Office, Road};

const DEFAULT_DOG_SPEED: f64 = 1.0;
const DEFAULT_BAG_CAPACITY: usize = 3;
const DEFAULT_MAX_PLAYERS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read world config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse world config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("map {map}: road must set exactly one of x1/y1")]
    AmbiguousRoad { map: MapId },
    #[error("map {map} has no roads")]
    NoRoads { map: MapId },
    #[error("loot generator period must be positive, got {0}s")]
    InvalidLootPeriod(f64),
    #[error("loot generator probability must lie in [0, 1], got {0}")]
    InvalidLootProbability(f64),
}

/// Fully validated world description, ready to seed the registry.
#[derive(Debug)]
pub struct WorldConfig {
    pub maps: Vec<Map>,
    /// Base spawn period of the loot generator.
    pub loot_interval: Duration,
    /// Per-period spawn probability of the loot generator.
    pub loot_probability: f64,
}

impl WorldConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            maps = config.maps.len(),
            "world config loaded"
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let mut file: ConfigFile = serde_json::from_str(raw)?;

        if file.loot_generator_config.period <= 0.0 {
            return Err(ConfigError::InvalidLootPeriod(
                file.loot_generator_config.period,
            ));
        }
        if !(0.0..=1.0).contains(&file.loot_generator_config.probability) {
            return Err(ConfigError::InvalidLootProbability(
                file.loot_generator_config.probability,
            ));
        }

        // The entries are consumed while the file-level defaults stay
        // borrowed by build_map.
        let entries = std::mem::take(&mut file.maps);
        let mut maps = Vec::with_capacity(entries.len());
        for entry in entries {
            maps.push(build_map(entry, &file)?);
        }

        Ok(WorldConfig {
            maps,
            loot_interval: Duration::from_secs_f64(file.loot_generator_config.period),
            loot_probability: file.loot_generator_config.probability,
        })
    }
}

fn build_map(entry: MapEntry, file: &ConfigFile) -> Result<Map, ConfigError> {
    let id = entry.id.clone();
    let mut map = Map::new(
        entry.id,
        entry.name,
        entry
            .dog_speed
            .or(file.default_dog_speed)
            .unwrap_or(DEFAULT_DOG_SPEED),
        entry
            .bag_capacity
            .or(file.default_bag_capacity)
            .unwrap_or(DEFAULT_BAG_CAPACITY),
        file.max_players_per_session.unwrap_or(DEFAULT_MAX_PLAYERS),
    );

    if entry.roads.is_empty() {
        return Err(ConfigError::NoRoads { map: id });
    }
    for road in entry.roads {
        let start = Point::new(road.x0, road.y0);
        map.add_road(match (road.x1, road.y1) {
            (Some(x1), None) => Road::horizontal(start, x1),
            (None, Some(y1)) => Road::vertical(start, y1),
            _ => return Err(ConfigError::AmbiguousRoad { map: id }),
        });
    }

    for b in entry.buildings {
        map.add_building(Building {
            position: Point::new(b.x, b.y),
            width: b.w,
            height: b.h,
        });
    }
    for o in entry.offices {
        map.add_office(Office {
            id: o.id,
            position: Point::new(o.x, o.y),
            offset: (o.offset_x, o.offset_y),
        });
    }
    for (index, entry) in entry.loot_types.into_iter().enumerate() {
        map.add_loot_type(LootType {
            name: entry.name,
            file: entry.file,
            kind: entry.kind,
            rotation: entry.rotation,
            color: entry.color,
            scale: entry.scale,
            // Configs predating the value field score by catalog position.
            value: entry.value.unwrap_or(index as u32),
        });
    }

    Ok(map)
}

// ============================================================================
// Raw file model
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    default_dog_speed: Option<f64>,
    #[serde(default)]
    default_bag_capacity: Option<usize>,
    #[serde(default)]
    max_players_per_session: Option<usize>,
    loot_generator_config: LootGeneratorEntry,
    maps: Vec<MapEntry>,
}

#[derive(Debug, Deserialize)]
struct LootGeneratorEntry {
    /// Seconds.
    period: f64,
    probability: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapEntry {
    id: MapId,
    name: String,
    #[serde(default)]
    dog_speed: Option<f64>,
    #[serde(default)]
    bag_capacity: Option<usize>,
    roads: Vec<RoadEntry>,
    #[serde(default)]
    buildings: Vec<BuildingEntry>,
    #[serde(default)]
    offices: Vec<OfficeEntry>,
    #[serde(default)]
    loot_types: Vec<LootTypeEntry>,
}

#[derive(Debug, Deserialize)]
struct LootTypeEntry {
    name: String,
    file: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    rotation: Option<i32>,
    #[serde(default)]
    color: Option<String>,
    scale: f64,
    #[serde(default)]
    value: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RoadEntry {
    x0: i32,
    y0: i32,
    #[serde(default)]
    x1: Option<i32>,
    #[serde(default)]
    y1: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BuildingEntry {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfficeEntry {
    id: String,
    x: i32,
    y: i32,
    offset_x: i32,
    offset_y: i32,
}
