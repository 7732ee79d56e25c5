//! End-to-end flows through the public API: world config in, joined dogs,
//! ticked sessions, gathered and deposited loot out.

use std::time::Duration;

use fetch_game_server::{Game, GameSettings, MapId, MoveIntent, WorldConfig};

fn settings(seed: u64) -> GameSettings {
    GameSettings {
        tick_period: None,
        randomize_spawns: false,
        rng_seed: Some(seed),
    }
}

/// A single-cell road pins every spawn (dogs and loot) to the origin, which
/// makes the fetch cycle fully deterministic.
const PINNED_WORLD: &str = r#"{
    "lootGeneratorConfig": { "period": 1.0, "probability": 1.0 },
    "maps": [
        {
            "id": "cell",
            "name": "Cell",
            "roads": [ { "x0": 0, "y0": 0, "x1": 0 } ],
            "offices": [ { "id": "o0", "x": 0, "y": 0, "offsetX": 0, "offsetY": 0 } ],
            "lootTypes": [
                { "name": "key", "file": "k.obj", "type": "obj", "scale": 1.0, "value": 7 }
            ]
        }
    ]
}"#;

const ROAD_WORLD: &str = r#"{
    "defaultDogSpeed": 10.0,
    "lootGeneratorConfig": { "period": 1.0, "probability": 1.0 },
    "maps": [
        {
            "id": "strip",
            "name": "Strip",
            "roads": [ { "x0": 0, "y0": 0, "x1": 10 } ],
            "lootTypes": [
                { "name": "key", "file": "k.obj", "type": "obj", "scale": 1.0, "value": 3 }
            ]
        }
    ]
}"#;

#[tokio::test]
async fn test_full_fetch_cycle_scores_at_the_office() {
    let world = WorldConfig::from_json(PINNED_WORLD).unwrap();
    let game = Game::from_world(world, settings(1)).unwrap();
    let (session, dog) = game.join("Rex", &MapId::new("cell")).await.unwrap();

    // First tick: no items exist yet, the loot stage spawns one at the
    // origin, on top of the dog.
    game.tick_all(Duration::from_secs(1)).await.unwrap();
    let snap = session.snapshot().await.unwrap();
    assert_eq!(snap.items.len(), 1);
    assert_eq!(snap.dogs[0].score, 0);

    // Second tick: the dog gathers the item, and the office at the same
    // spot converts it to score within the same tick.
    game.tick_all(Duration::from_secs(1)).await.unwrap();
    let snap = session.snapshot().await.unwrap();
    assert_eq!(snap.dogs[0].score, 7);
    assert!(snap.dogs[0].bag.is_empty());
    assert_eq!(dog.dog_id, snap.dogs[0].id);
}

#[tokio::test]
async fn test_dog_sweeps_up_loot_along_its_run() {
    let world = WorldConfig::from_json(ROAD_WORLD).unwrap();
    let game = Game::from_world(world, settings(2)).unwrap();
    let (session, dog) = game.join("Rex", &MapId::new("strip")).await.unwrap();

    // Let one item spawn somewhere on the road.
    game.tick_all(Duration::from_millis(1)).await.unwrap();
    let before = session.snapshot().await.unwrap();
    assert_eq!(before.items.len(), 1);

    // Run the entire road east; the sweep covers every road cell, so the
    // item is gathered wherever it landed.
    session
        .set_intent(dog.dog_id, MoveIntent::Go(fetch_game_server::Direction::East))
        .await
        .unwrap();
    game.tick_all(Duration::from_secs(2)).await.unwrap();

    let after = session.snapshot().await.unwrap();
    assert_eq!(after.dogs[0].bag.len(), 1);
    // No office on this map, so nothing was scored.
    assert_eq!(after.dogs[0].score, 0);
    // The dog stopped at the road boundary, 0.4 past the last cell.
    assert!((after.dogs[0].position.x - 10.4).abs() < 1e-9);
    assert!(after.dogs[0].velocity.dx == 0.0 && after.dogs[0].velocity.dy == 0.0);
}

#[tokio::test]
async fn test_value_less_loot_types_score_their_catalog_index() {
    // Older world files carry no per-type value; deposits then award the
    // item's position in the loot catalog.
    let raw = r#"{
        "lootGeneratorConfig": { "period": 1.0, "probability": 1.0 },
        "maps": [
            {
                "id": "cell",
                "name": "Cell",
                "roads": [ { "x0": 0, "y0": 0, "x1": 0 } ],
                "offices": [ { "id": "o0", "x": 0, "y": 0, "offsetX": 0, "offsetY": 0 } ],
                "lootTypes": [
                    { "name": "key", "file": "k.obj", "type": "obj", "scale": 1.0 },
                    { "name": "wallet", "file": "w.obj", "type": "obj", "scale": 1.0 }
                ]
            }
        ]
    }"#;
    let world = WorldConfig::from_json(raw).unwrap();
    let game = Game::from_world(world, settings(7)).unwrap();
    let (session, _) = game.join("Rex", &MapId::new("cell")).await.unwrap();

    game.tick_all(Duration::from_secs(1)).await.unwrap();
    let before = session.snapshot().await.unwrap();
    let spawned_type = before.items[0].type_index;

    game.tick_all(Duration::from_secs(1)).await.unwrap();
    let after = session.snapshot().await.unwrap();
    assert_eq!(after.dogs[0].score, spawned_type as u32);
    assert!(after.dogs[0].bag.is_empty());
}

#[tokio::test]
async fn test_full_bag_leaves_items_in_the_world() {
    let raw = r#"{
        "defaultBagCapacity": 1,
        "lootGeneratorConfig": { "period": 1.0, "probability": 1.0 },
        "maps": [
            {
                "id": "cell",
                "name": "Cell",
                "roads": [ { "x0": 0, "y0": 0, "x1": 0 } ],
                "lootTypes": [
                    { "name": "key", "file": "k.obj", "type": "obj", "scale": 1.0, "value": 1 }
                ]
            }
        ]
    }"#;
    let world = WorldConfig::from_json(raw).unwrap();
    let game = Game::from_world(world, settings(3)).unwrap();
    let (session, _) = game.join("Rex", &MapId::new("cell")).await.unwrap();

    // Tick 1 spawns an item; tick 2 gathers it (bag now full) and spawns a
    // replacement; tick 3 leaves the replacement untouched on the ground.
    for _ in 0..3 {
        game.tick_all(Duration::from_secs(1)).await.unwrap();
    }

    let snap = session.snapshot().await.unwrap();
    assert_eq!(snap.dogs[0].bag.len(), 1);
    assert_eq!(snap.items.len(), 1);
}

#[tokio::test]
async fn test_capacity_from_config_splits_sessions() {
    let raw = r#"{
        "maxPlayersPerSession": 2,
        "lootGeneratorConfig": { "period": 5.0, "probability": 0.0 },
        "maps": [
            { "id": "m", "name": "M", "roads": [ { "x0": 0, "y0": 0, "x1": 5 } ] }
        ]
    }"#;
    let world = WorldConfig::from_json(raw).unwrap();
    let game = Game::from_world(world, settings(4)).unwrap();
    let id = MapId::new("m");

    let (s1, _) = game.join("a", &id).await.unwrap();
    let (s2, _) = game.join("b", &id).await.unwrap();
    let (s3, _) = game.join("c", &id).await.unwrap();

    assert_eq!(s1.id(), s2.id());
    assert_ne!(s1.id(), s3.id());
    assert_eq!(game.session_count(), 2);
}

#[tokio::test]
async fn test_world_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.json");
    std::fs::write(&path, PINNED_WORLD).unwrap();

    let world = WorldConfig::from_file(&path).unwrap();
    let game = Game::from_world(world, settings(5)).unwrap();
    let (session, dog) = game.join("Rex", &MapId::new("cell")).await.unwrap();

    let snap = session.snapshot().await.unwrap();
    assert_eq!(snap.map_id, MapId::new("cell"));
    assert_eq!(snap.dogs[0].id, dog.dog_id);
}

#[tokio::test]
async fn test_snapshot_serializes_to_json() {
    let world = WorldConfig::from_json(PINNED_WORLD).unwrap();
    let game = Game::from_world(world, settings(6)).unwrap();
    let (session, _) = game.join("Rex", &MapId::new("cell")).await.unwrap();
    game.tick_all(Duration::from_secs(1)).await.unwrap();

    let snap = session.snapshot().await.unwrap();
    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["map_id"], "cell");
    assert_eq!(json["dogs"][0]["name"], "Rex");
    assert!(json["items"].as_array().is_some());
}
