//! Rails rules: auction seating, elimination, forced and automatic actions.

mod common;

use common::{act, ids, pass, slot, start};
use rust_tile_engine::games::rails::{RailsRuleset, RailsVariant};
use rust_tile_engine::{AutoAction, Engine, ErrorKind, PlayerId, RulesetConfig, RulesetRegistry};
use serde_json::json;

/// An engine whose standard rails map starts every player with `money`.
fn poor_engine(money: i64) -> Engine {
    let config = RulesetConfig::new("Rails").with_starting_money(money);
    let registry = RulesetRegistry::new()
        .with(RailsRuleset::new(RailsVariant::Standard).with_config(config))
        .unwrap();
    Engine::new(registry)
}

fn color_of(state: &rust_tile_engine::GameState, user: PlayerId) -> serde_json::Value {
    slot(state, "players")
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["playerId"] == json!(user.raw()))
        .unwrap()["color"]
        .clone()
}

/// With an unaffordable auction, build and upkeep, players drop out round
/// by round until the game ends early.
#[test]
fn test_elimination_ends_the_game() {
    let engine = poor_engine(1);
    let mut state = start(&engine, "rails", 3, 17);
    let winner = state.active_player_id.unwrap();

    // The other two cannot outbid and every build is unaffordable.
    state = act(&engine, "rails", &state, "bid", json!({"amount": 1}));
    assert_eq!(state.active_player_id, Some(winner));
    assert_eq!(slot(&state, "phase"), json!(2));

    for _ in 0..6 {
        state = pass(&engine, "rails", &state);
    }
    let winner_color = color_of(&state, winner);
    assert_eq!(slot(&state, "roundNumber"), json!(2));
    assert!(state
        .logs
        .iter()
        .any(|l| *l == format!("{} is out of the game", winner_color.as_str().unwrap())));

    // Round two: the broke winner never gets a turn.
    let mut turns = 0;
    while !state.is_ended() {
        assert_ne!(state.active_player_id, Some(winner));
        state = pass(&engine, "rails", &state);
        turns += 1;
    }
    assert_eq!(turns, 4);
    assert_eq!(slot(&state, "roundNumber"), json!(2));
    assert!(slot(&state, "players")
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["outOfGame"] == json!(true)));
}

/// Passing players take the back seats, first passer last.
#[test]
fn test_auction_reorders_seats() {
    let engine = Engine::builtin().unwrap();
    let mut state = start(&engine, "rails", 4, 9);
    let seats = slot(&state, "turnOrder");

    state = pass(&engine, "rails", &state);
    state = pass(&engine, "rails", &state);
    state = act(&engine, "rails", &state, "bid", json!({"amount": 2}));
    state = pass(&engine, "rails", &state);

    assert_eq!(
        slot(&state, "turnOrder"),
        json!([seats[2], seats[3], seats[1], seats[0]])
    );
}

/// Only the active user may act through `process_action_as`.
#[test]
fn test_process_action_as_checks_the_user() {
    let engine = Engine::builtin().unwrap();
    let state = start(&engine, "rails", 3, 4);
    let active = state.active_player_id.unwrap();
    let other = ids(3).into_iter().find(|id| *id != active).unwrap();

    let err = engine
        .process_action_as(other, "rails", &state.game_data, "pass", &json!({}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    let next = engine
        .process_action_as(active, "rails", &state.game_data, "pass", &json!({}))
        .unwrap();
    assert_ne!(next.active_player_id, Some(active));
}

/// A standing bid limit answers each raise until the limit is passed.
#[test]
fn test_auto_bid_until_limit() {
    let engine = Engine::builtin().unwrap();
    let state = start(&engine, "rails", 2, 12);
    let first = state.active_player_id.unwrap();
    let second = ids(2).into_iter().find(|id| *id != first).unwrap();

    let auto = AutoAction {
        bid_until: Some(3),
        pass_next: false,
    };
    let state = engine.set_auto_action("rails", &state.game_data, second, auto).unwrap();
    assert_eq!(state.active_player_id, Some(first));

    let state = act(&engine, "rails", &state, "bid", json!({"amount": 1}));
    assert_eq!(state.active_player_id, Some(first));
    assert!(state.logs.iter().any(|l| l.ends_with("bids 2")));

    let state = act(&engine, "rails", &state, "bid", json!({"amount": 4}));
    assert!(state.logs.iter().any(|l| l.ends_with("passes")));
    assert_eq!(slot(&state, "phase"), json!(1));
    assert_eq!(state.active_player_id, Some(first));
    // The limit only covered that auction.
    assert_eq!(slot(&state, "autoActions"), json!({}));
}

/// A one-shot pass finishes the owner's next build turn and is consumed.
#[test]
fn test_auto_pass_next_is_consumed() {
    let engine = Engine::builtin().unwrap();
    let state = start(&engine, "rails", 2, 12);
    let first = state.active_player_id.unwrap();
    let state = pass(&engine, "rails", &state);
    let builder = state.active_player_id.unwrap();
    assert_ne!(builder, first);

    let auto = AutoAction {
        bid_until: None,
        pass_next: true,
    };
    let state = engine.set_auto_action("rails", &state.game_data, builder, auto).unwrap();
    assert_eq!(state.active_player_id, Some(first));
    assert_eq!(slot(&state, "autoActions"), json!({}));
    assert!(state.logs.iter().any(|l| l.ends_with("finishes building")));
}

/// Clearing an instruction removes it; strangers cannot set one.
#[test]
fn test_set_auto_action_permissions() {
    let engine = Engine::builtin().unwrap();
    let state = start(&engine, "rails", 2, 12);

    let err = engine
        .set_auto_action("rails", &state.game_data, PlayerId::new(99), AutoAction::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    let active = state.active_player_id.unwrap();
    let other = ids(2).into_iter().find(|id| *id != active).unwrap();
    let auto = AutoAction {
        bid_until: Some(5),
        pass_next: false,
    };
    let set = engine.set_auto_action("rails", &state.game_data, other, auto).unwrap();
    assert_ne!(slot(&set, "autoActions"), json!({}));
    let cleared = engine
        .set_auto_action("rails", &set.game_data, other, AutoAction::default())
        .unwrap();
    assert_eq!(slot(&cleared, "autoActions"), json!({}));
}

/// The short map keeps seating order and charges 1 per track.
#[test]
fn test_short_map() {
    let engine = Engine::builtin().unwrap();
    let state = start(&engine, "rails-short", 3, 5);
    let colors: Vec<_> = slot(&state, "players")
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["color"].clone())
        .collect();
    assert_eq!(slot(&state, "turnOrder"), json!(colors));
    assert_eq!(state.active_player_id, Some(PlayerId::new(1)));

    let state = act(&engine, "rails-short", &state, "bid", json!({"amount": 1}));
    let state = pass(&engine, "rails-short", &state);
    let state = pass(&engine, "rails-short", &state);
    let state = act(&engine, "rails-short", &state, "build", json!({"q": 0, "r": 0}));
    assert_eq!(slot(&state, "players")[0]["money"], json!(8));
}
