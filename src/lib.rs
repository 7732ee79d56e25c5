//! Fetch game server — real-time simulation of dogs fetching lost items on
//! a road network.
//!
//! The library is layered bottom-up:
//!
//! - [`geom`], [`map`]: the integer road grid and continuous positions;
//! - [`movement`]: road-constrained kinematics for one tick;
//! - [`collision`]: swept-segment gather detection;
//! - [`loot`]: the item spawn-count law;
//! - [`dog`], [`session`]: per-session game state behind an actor mailbox;
//! - [`registry`]: map catalog and capacity-based session placement;
//! - [`config`]: the JSON world description.
//!
//! The binary in `main.rs` wires these together from environment knobs and
//! runs sessions on wall-clock tickers; embedders can instead drive
//! [`Game::tick_all`](registry::Game::tick_all) manually for deterministic
//! simulation.

pub mod collision;
pub mod config;
pub mod dog;
pub mod geom;
pub mod loot;
pub mod map;
pub mod movement;
pub mod registry;
pub mod session;

pub use config::{ConfigError, WorldConfig};
pub use map::{Map, MapError, MapId};
pub use movement::{Direction, MoveIntent};
pub use registry::{Game, GameSettings, RegistryError};
pub use session::{SessionError, SessionHandle, SessionSnapshot};
