use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fetch_game_server::{Game, GameSettings, WorldConfig};

/// Environment knobs, read once at startup.
struct ProcessConfig {
    world_path: String,
    tick_period: Option<Duration>,
    randomize_spawns: bool,
    rng_seed: Option<u64>,
}

impl ProcessConfig {
    fn from_env() -> anyhow::Result<Self> {
        let world_path =
            std::env::var("GAME_WORLD_CONFIG").unwrap_or_else(|_| "data/world.json".to_string());

        let tick_ms: u64 = match std::env::var("GAME_TICK_PERIOD_MS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid GAME_TICK_PERIOD_MS: {raw:?}"))?,
            Err(_) => 50,
        };
        // 0 disables wall-clock ticking: sessions then only advance when
        // driven programmatically.
        let tick_period = (tick_ms > 0).then(|| Duration::from_millis(tick_ms));

        let randomize_spawns = std::env::var("GAME_RANDOMIZE_SPAWNS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let rng_seed = match std::env::var("GAME_RNG_SEED") {
            Ok(raw) => Some(
                raw.parse()
                    .with_context(|| format!("invalid GAME_RNG_SEED: {raw:?}"))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            world_path,
            tick_period,
            randomize_spawns,
            rng_seed,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let process = ProcessConfig::from_env()?;

    let world = WorldConfig::from_file(&process.world_path)
        .with_context(|| format!("loading world config from {}", process.world_path))?;

    let game = Game::from_world(
        world,
        GameSettings {
            tick_period: process.tick_period,
            randomize_spawns: process.randomize_spawns,
            rng_seed: process.rng_seed,
        },
    )?;

    for map in game.maps() {
        info!(
            map = %map.id(),
            name = map.name(),
            roads = map.roads().len(),
            offices = map.offices().len(),
            loot_types = map.loot_types().len(),
            "map registered"
        );
    }
    info!(
        ticking = process.tick_period.is_some(),
        randomize_spawns = process.randomize_spawns,
        "game server running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    Ok(())
}
