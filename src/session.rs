//! Game session actor — the serialized execution context of one running map.
//!
//! A session owns its dogs, its lost items, its loot generator, and a seeded
//! RNG. All access goes through a command mailbox serviced by one spawned
//! task, so at most one mutation of session state is ever in progress and
//! commands execute strictly in submission order:
//!
//! ```text
//! SessionHandle (any task)
//!       │
//!       ▼
//! SessionCommand → mpsc channel → session task
//!       │                           │
//!       │                           ▼
//!       │                    mutate dogs/items
//!       │                           │
//!       ▼                           ▼
//! oneshot::Receiver ◄── oneshot::Sender (reply)
//! ```
//!
//! The per-tick pipeline (movement → gather resolution → loot generation)
//! runs as one atomic unit inside a single mailbox message. The optional
//! wall-clock ticker is a detached task holding only a weak sender, so it
//! dies with the mailbox instead of keeping the session alive forever.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::collision::{
    find_gather_events, Collectible, CollectibleId, Gatherer, BASE_RADIUS, GATHERER_RADIUS,
    ITEM_RADIUS,
};
use crate::dog::{Dog, LostItem};
use crate::geom::{Coords, Vec2};
use crate::loot::LootGenerator;
use crate::map::{Map, MapError, MapId};
use crate::movement::{apply_move, Direction, MoveIntent};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A tick pipeline stage failed. The session stays alive; its state is
    /// as of the last fully-applied stage.
    #[error("session update failed in {stage} stage")]
    UpdateFailed {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("no dog with id {0} in this session")]
    UnknownDog(u64),
    #[error("could not place dog on the map")]
    Spawn(#[from] MapError),
    /// The session's mailbox is gone (registry teardown).
    #[error("session is shut down")]
    Closed,
}

/// Knobs for one session, derived from the world config and process flags.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wall-clock tick period. `None` (or zero) leaves the session idle:
    /// it only advances on explicit `tick` calls.
    pub tick_period: Option<Duration>,
    /// Base period of the loot generator law.
    pub loot_interval: Duration,
    /// Per-period spawn probability of the loot generator.
    pub loot_probability: f64,
    /// Spawn joining dogs at random road points instead of the map start.
    pub randomize_spawns: bool,
    /// RNG seed for reproducible runs; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

// ============================================================================
// Snapshots (read-only state export)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct BaggedItem {
    pub id: u64,
    pub type_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DogSnapshot {
    pub id: u64,
    pub name: String,
    pub position: Coords,
    pub velocity: Vec2,
    pub direction: Direction,
    pub bag: Vec<BaggedItem>,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemSnapshot {
    pub id: u64,
    pub type_index: usize,
    pub position: Coords,
}

/// Point-in-time view of a session, safe to serialize and ship out.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub map_id: MapId,
    pub dogs: Vec<DogSnapshot>,
    pub items: Vec<ItemSnapshot>,
}

/// Result of a successful join.
#[derive(Debug, Clone, Copy)]
pub struct JoinedDog {
    pub dog_id: u64,
    pub position: Coords,
}

// ============================================================================
// Mailbox commands
// ============================================================================

enum SessionCommand {
    Join {
        name: String,
        reply: oneshot::Sender<Result<JoinedDog, SessionError>>,
    },
    SetIntent {
        dog_id: u64,
        intent: MoveIntent,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Tick {
        delta: Duration,
        /// Ticker-driven ticks carry no reply channel.
        reply: Option<oneshot::Sender<Result<(), SessionError>>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Cheap clonable handle submitting commands into a session's mailbox.
#[derive(Clone)]
pub struct SessionHandle {
    id: u64,
    map: Arc<Map>,
    tx: mpsc::UnboundedSender<SessionCommand>,
    dog_count: Arc<AtomicUsize>,
}

impl SessionHandle {
    /// Registry-assigned session number, stable for the session's lifetime.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn map(&self) -> &Arc<Map> {
        &self.map
    }

    /// Number of dogs in the session. Updated by the session task on join;
    /// used by the registry for capacity-based placement.
    pub fn dog_count(&self) -> usize {
        self.dog_count.load(Ordering::Relaxed)
    }

    /// Add a dog to the session and return its id and spawn position.
    pub async fn join(&self, name: impl Into<String>) -> Result<JoinedDog, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Join {
                name: name.into(),
                reply,
            })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Set a dog's movement intent (validated vocabulary only).
    pub async fn set_intent(&self, dog_id: u64, intent: MoveIntent) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::SetIntent {
                dog_id,
                intent,
                reply,
            })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Run one synchronous pipeline pass: movement, gather resolution,
    /// loot generation, atomically with respect to other commands.
    pub async fn tick(&self, delta: Duration) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Tick {
                delta,
                reply: Some(reply),
            })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Read-only snapshot of dogs and items.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Snapshot { reply })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("map", &self.map.id())
            .field("dog_count", &self.dog_count())
            .finish()
    }
}

/// Spawn a session task (and its wall-clock ticker, if configured) on the
/// current tokio runtime and return a handle to its mailbox.
pub fn spawn(id: u64, map: Arc<Map>, config: SessionConfig) -> SessionHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let dog_count = Arc::new(AtomicUsize::new(0));

    let state = SessionState::new(id, Arc::clone(&map), &config, Arc::clone(&dog_count));
    tokio::spawn(run_session(state, rx));

    if let Some(period) = config.tick_period.filter(|p| !p.is_zero()) {
        spawn_ticker(id, &tx, period);
    }

    info!(
        session = id,
        map = %map.id(),
        ticking = config.tick_period.map_or(false, |p| !p.is_zero()),
        "session started"
    );

    SessionHandle {
        id,
        map,
        tx,
        dog_count,
    }
}

/// Periodic driver feeding `Tick` commands into the mailbox with the real
/// measured elapsed time. Holds only a weak sender: once every handle is
/// dropped and the mailbox closes, the ticker exits on its own.
fn spawn_ticker(session_id: u64, tx: &mpsc::UnboundedSender<SessionCommand>, period: Duration) {
    let weak = tx.downgrade();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // completes immediately
        let mut last = tokio::time::Instant::now();
        loop {
            interval.tick().await;
            let now = tokio::time::Instant::now();
            let delta = now - last;
            last = now;

            let Some(tx) = weak.upgrade() else { break };
            if tx
                .send(SessionCommand::Tick { delta, reply: None })
                .is_err()
            {
                break;
            }
        }
        debug!(session = session_id, "ticker stopped");
    });
}

async fn run_session(mut state: SessionState, mut rx: mpsc::UnboundedReceiver<SessionCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            SessionCommand::Join { name, reply } => {
                let _ = reply.send(state.join(name));
            }
            SessionCommand::SetIntent {
                dog_id,
                intent,
                reply,
            } => {
                let _ = reply.send(state.set_intent(dog_id, intent));
            }
            SessionCommand::Tick { delta, reply } => {
                let result = state.update(delta);
                if let Err(error) = &result {
                    warn!(session = state.id, %error, "tick pipeline failed");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(state.snapshot());
            }
        }
    }
    debug!(session = state.id, "mailbox closed, session task exiting");
}

// ============================================================================
// Session state (only ever touched by the session task)
// ============================================================================

struct Sweep {
    dog_id: u64,
    start: Coords,
    end: Coords,
}

struct SessionState {
    id: u64,
    map: Arc<Map>,
    dogs: BTreeMap<u64, Dog>,
    items: BTreeMap<u64, LostItem>,
    loot_generator: LootGenerator,
    rng: Xoshiro256PlusPlus,
    randomize_spawns: bool,
    next_dog_id: u64,
    next_item_id: u64,
    dog_count: Arc<AtomicUsize>,
}

impl SessionState {
    fn new(
        id: u64,
        map: Arc<Map>,
        config: &SessionConfig,
        dog_count: Arc<AtomicUsize>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        Self {
            id,
            map,
            dogs: BTreeMap::new(),
            items: BTreeMap::new(),
            loot_generator: LootGenerator::new(config.loot_interval, config.loot_probability),
            rng,
            randomize_spawns: config.randomize_spawns,
            next_dog_id: 0,
            next_item_id: 0,
            dog_count,
        }
    }

    fn join(&mut self, name: String) -> Result<JoinedDog, SessionError> {
        let spawn_point = if self.randomize_spawns {
            self.map.random_road_point(&mut self.rng)?
        } else {
            self.map.start_point()?
        };
        let position = Coords::from(spawn_point);

        let dog_id = self.next_dog_id;
        self.next_dog_id += 1;
        self.dogs
            .insert(dog_id, Dog::new(dog_id, &name, position, self.map.bag_capacity()));
        self.dog_count.store(self.dogs.len(), Ordering::Relaxed);

        info!(session = self.id, dog = dog_id, %name, ?position, "dog joined");
        Ok(JoinedDog { dog_id, position })
    }

    fn set_intent(&mut self, dog_id: u64, intent: MoveIntent) -> Result<(), SessionError> {
        let speed = self.map.dog_speed();
        let dog = self
            .dogs
            .get_mut(&dog_id)
            .ok_or(SessionError::UnknownDog(dog_id))?;
        dog.apply_intent(intent, speed);
        Ok(())
    }

    /// The per-tick pipeline. Stages run in fixed order; a stage failure is
    /// wrapped with the stage name and aborts the remaining stages without
    /// rolling back the ones already applied.
    fn update(&mut self, delta: Duration) -> Result<(), SessionError> {
        let sweeps = self.update_movement(delta);
        self.resolve_gathers(&sweeps)
            .map_err(|source| SessionError::UpdateFailed {
                stage: "collision",
                source,
            })?;
        self.generate_loot(delta)
            .map_err(|source| SessionError::UpdateFailed {
                stage: "loot",
                source,
            })?;
        Ok(())
    }

    fn update_movement(&mut self, delta: Duration) -> Vec<Sweep> {
        let mut sweeps = Vec::with_capacity(self.dogs.len());
        for dog in self.dogs.values_mut() {
            let start = dog.position();
            let outcome = apply_move(&self.map, start, dog.direction(), dog.velocity(), delta);
            dog.set_position(outcome.position);
            if outcome.stopped {
                dog.stop();
            }
            sweeps.push(Sweep {
                dog_id: dog.id(),
                start,
                end: outcome.position,
            });
        }
        sweeps
    }

    fn resolve_gathers(&mut self, sweeps: &[Sweep]) -> anyhow::Result<()> {
        let gatherers: Vec<Gatherer> = sweeps
            .iter()
            .map(|sweep| Gatherer {
                id: sweep.dog_id,
                start: sweep.start,
                end: sweep.end,
                radius: GATHERER_RADIUS,
            })
            .collect();

        let mut collectibles: Vec<Collectible> = self
            .items
            .values()
            .map(|item| Collectible {
                id: CollectibleId::Item(item.id),
                position: item.position,
                radius: ITEM_RADIUS,
            })
            .collect();
        collectibles.extend(self.map.offices().iter().enumerate().map(
            |(index, office)| Collectible {
                id: CollectibleId::Office(index),
                position: office.position.into(),
                radius: BASE_RADIUS,
            },
        ));

        for event in find_gather_events(&gatherers, &collectibles) {
            let dog = self
                .dogs
                .get_mut(&event.gatherer_id)
                .with_context(|| format!("gather event for unknown dog {}", event.gatherer_id))?;

            match event.collectible_id {
                CollectibleId::Item(item_id) => {
                    // An earlier event in this batch may have taken the item
                    // already; a stale reference is silently skipped.
                    let Some(item) = self.items.get(&item_id).copied() else {
                        continue;
                    };
                    match dog.bag_mut().try_add(item) {
                        Ok(()) => {
                            self.items.remove(&item_id);
                            debug!(session = self.id, dog = dog.id(), item = item_id, "item gathered");
                        }
                        Err(_) => {
                            debug!(session = self.id, dog = dog.id(), item = item_id, "bag full, item left in world");
                        }
                    }
                }
                CollectibleId::Office(_) => {
                    if dog.bag().is_empty() {
                        continue;
                    }
                    let mut points = 0u32;
                    for bagged in dog.bag().items() {
                        let loot_type =
                            self.map.loot_types().get(bagged.type_index).with_context(|| {
                                format!("loot type index {} outside catalog", bagged.type_index)
                            })?;
                        points += loot_type.value;
                    }
                    let deposited = dog.bag_mut().drain().len();
                    dog.add_score(points);
                    debug!(
                        session = self.id,
                        dog = dog.id(),
                        deposited,
                        points,
                        "bag deposited at office"
                    );
                }
            }
        }
        Ok(())
    }

    fn generate_loot(&mut self, delta: Duration) -> anyhow::Result<()> {
        let spawn_count = self.loot_generator.generate(
            delta,
            self.items.len() as u32,
            self.dogs.len() as u32,
        );
        if spawn_count == 0 {
            return Ok(());
        }
        if self.map.loot_types().is_empty() {
            // Shortage but nothing in the catalog to spawn from.
            return Ok(());
        }

        for _ in 0..spawn_count {
            let point = self
                .map
                .random_road_point(&mut self.rng)
                .context("sampling a spawn point for new loot")?;
            let type_index = self.rng.gen_range(0..self.map.loot_types().len());
            let id = self.next_item_id;
            self.next_item_id += 1;
            self.items.insert(
                id,
                LostItem {
                    id,
                    type_index,
                    position: point.into(),
                },
            );
        }
        debug!(session = self.id, spawned = spawn_count, "loot spawned");
        Ok(())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            map_id: self.map.id().clone(),
            dogs: self
                .dogs
                .values()
                .map(|dog| DogSnapshot {
                    id: dog.id(),
                    name: dog.name().to_string(),
                    position: dog.position(),
                    velocity: dog.velocity(),
                    direction: dog.direction(),
                    bag: dog
                        .bag()
                        .items()
                        .iter()
                        .map(|item| BaggedItem {
                            id: item.id,
                            type_index: item.type_index,
                        })
                        .collect(),
                    score: dog.score(),
                })
                .collect(),
            items: self
                .items
                .values()
                .map(|item| ItemSnapshot {
                    id: item.id,
                    type_index: item.type_index,
                    position: item.position,
                })
                .collect(),
        }
    }
}
