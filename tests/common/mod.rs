//! Helpers shared by the integration tests.

#![allow(dead_code)]

use rust_tile_engine::core::Snapshot;
use rust_tile_engine::{Engine, ErrorKind, GameState, PlayerId, RecordedAction, StartConfig};
use serde_json::{json, Value};

/// Route engine traces to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ids(count: u32) -> Vec<PlayerId> {
    (1..=count).map(PlayerId::new).collect()
}

pub fn start(engine: &Engine, map_key: &str, players: u32, seed: u64) -> GameState {
    engine
        .start(&ids(players), &StartConfig::new(map_key).with_seed(seed))
        .unwrap()
}

/// One slot of a snapshot.
pub fn slot(state: &GameState, name: &str) -> Value {
    Snapshot::parse(&state.game_data).unwrap().state[name].clone()
}

pub fn act(engine: &Engine, map_key: &str, state: &GameState, name: &str, data: Value) -> GameState {
    engine.process_action(map_key, &state.game_data, name, &data).unwrap()
}

pub fn pass(engine: &Engine, map_key: &str, state: &GameState) -> GameState {
    act(engine, map_key, state, "pass", json!({}))
}

/// The action a simple player would take given `choice`, with the phase's
/// always-legal fallback when that action is rejected.
///
/// Returns the action as applied, attributed to the active user.
pub fn play(engine: &Engine, map_key: &str, state: &GameState, choice: u8) -> (RecordedAction, GameState) {
    let user = state.active_player_id.expect("game is active");
    let available = engine.available_actions(map_key, &state.game_data).unwrap();
    let has = |name: &str| available.iter().any(|a| a == name);

    let (name, data) = if has("bid") {
        let high = slot(state, "auction")["highBid"].as_i64().unwrap();
        if choice % 3 == 0 {
            ("pass", json!({}))
        } else {
            ("bid", json!({"amount": high + 1 + i64::from(choice % 2)}))
        }
    } else if has("build") {
        if choice % 4 == 0 {
            ("done", json!({}))
        } else {
            let q = i32::from(choice % 7) - 3;
            let r = i32::from((choice / 7) % 7) - 3;
            ("build", json!({"q": q, "r": r}))
        }
    } else if choice % 5 == 0 {
        ("pass", json!({}))
    } else {
        ("deliver", json!({}))
    };

    match engine.process_action_as(user, map_key, &state.game_data, name, &data) {
        Ok(next) => (RecordedAction::by(user, name, data), next),
        Err(err) => {
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{name} {data}: {err}");
            let fallback = if has("done") { "done" } else { "pass" };
            let next = engine
                .process_action_as(user, map_key, &state.game_data, fallback, &json!({}))
                .unwrap();
            (RecordedAction::by(user, fallback, json!({})), next)
        }
    }
}
