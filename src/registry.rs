//! Map registry and session placement.
//!
//! The `Game` owns the configured maps and the list of running sessions.
//! Maps are registered once at startup and shared with sessions as
//! `Arc<Map>`; session placement picks an existing session on the target
//! map with a free slot, or spawns a fresh one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use crate::config::WorldConfig;
use crate::map::{Map, MapId};
use crate::session::{self, JoinedDog, SessionConfig, SessionError, SessionHandle};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("map {0} is already registered")]
    DuplicateMap(MapId),
    #[error("map {0} not found")]
    MapNotFound(MapId),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Process-level simulation settings, orthogonal to the world config.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Wall-clock tick period for new sessions. `None` (or zero) leaves
    /// sessions idle until ticked explicitly.
    pub tick_period: Option<Duration>,
    /// Spawn joining dogs at random road points instead of map starts.
    pub randomize_spawns: bool,
    /// Base RNG seed; session `n` runs on `seed + n`. `None` seeds each
    /// session from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            tick_period: None,
            randomize_spawns: false,
            rng_seed: None,
        }
    }
}

/// The top-level simulation object: all maps, all sessions.
pub struct Game {
    maps: BTreeMap<MapId, Arc<Map>>,
    sessions: Mutex<Vec<SessionHandle>>,
    next_session_id: AtomicU64,
    settings: GameSettings,
    loot_interval: Duration,
    loot_probability: f64,
}

impl Game {
    /// Build a registry from a loaded world config.
    pub fn from_world(world: WorldConfig, settings: GameSettings) -> Result<Self, RegistryError> {
        let mut game = Self {
            maps: BTreeMap::new(),
            sessions: Mutex::new(Vec::new()),
            next_session_id: AtomicU64::new(0),
            settings,
            loot_interval: world.loot_interval,
            loot_probability: world.loot_probability,
        };
        for map in world.maps {
            game.add_map(map)?;
        }
        Ok(game)
    }

    /// Register a map. Ids are unique; a duplicate is rejected and the
    /// registry is left unchanged.
    pub fn add_map(&mut self, map: Map) -> Result<(), RegistryError> {
        let id = map.id().clone();
        if self.maps.contains_key(&id) {
            return Err(RegistryError::DuplicateMap(id));
        }
        self.maps.insert(id, Arc::new(map));
        Ok(())
    }

    pub fn find_map(&self, id: &MapId) -> Option<&Arc<Map>> {
        self.maps.get(id)
    }

    /// All maps in ascending id order.
    pub fn maps(&self) -> impl Iterator<Item = &Arc<Map>> {
        self.maps.values()
    }

    /// Session with a free slot on `map_id`, spawning one if every existing
    /// session for that map is at capacity.
    ///
    /// Must be called from within a tokio runtime: new sessions spawn their
    /// mailbox task (and ticker) on the current runtime.
    pub fn find_or_create_session(&self, map_id: &MapId) -> Result<SessionHandle, RegistryError> {
        let map = self
            .find_map(map_id)
            .ok_or_else(|| RegistryError::MapNotFound(map_id.clone()))?;

        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions
            .iter()
            .find(|s| s.map().id() == map_id && s.dog_count() < map.max_players())
        {
            return Ok(existing.clone());
        }

        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let handle = session::spawn(
            id,
            Arc::clone(map),
            SessionConfig {
                tick_period: self.settings.tick_period,
                loot_interval: self.loot_interval,
                loot_probability: self.loot_probability,
                randomize_spawns: self.settings.randomize_spawns,
                rng_seed: self.settings.rng_seed.map(|seed| seed.wrapping_add(id)),
            },
        );
        sessions.push(handle.clone());
        info!(session = id, map = %map_id, total = sessions.len(), "new session created");
        Ok(handle)
    }

    /// Place a dog named `name` on `map_id` and return the session handle
    /// together with the join result.
    pub async fn join(
        &self,
        name: impl Into<String>,
        map_id: &MapId,
    ) -> Result<(SessionHandle, JoinedDog), RegistryError> {
        let handle = self.find_or_create_session(map_id)?;
        let joined = handle.join(name).await?;
        Ok((handle, joined))
    }

    /// Advance every session by `delta`. Each session ticks independently;
    /// a failing session does not stop the others, and the first error is
    /// reported after all sessions have been driven.
    pub async fn tick_all(&self, delta: Duration) -> Result<(), RegistryError> {
        let handles: Vec<SessionHandle> = self.sessions.lock().clone();
        let mut first_error = None;
        for handle in handles {
            if let Err(error) = handle.tick(delta).await {
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("maps", &self.maps.len())
            .field("sessions", &self.session_count())
            .finish_non_exhaustive()
    }
}
