//! Keys owned by the engine core.
//!
//! Every ruleset shares these slots. Ruleset keys are declared through
//! `Ruleset::keys` and must not reuse these names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::action::AutoAction;
use super::config::PhaseId;
use super::error::GameResult;
use super::key::{Key, KeySet};
use super::player::{validate_players, Player, PlayerColor};
use super::rng::GameRngState;

/// Whether the game still accepts actions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    #[default]
    Active,
    Ended,
}

/// Per-color automatic-action settings.
pub type AutoActionTable = BTreeMap<PlayerColor, AutoAction>;

/// Every seat, in seating order.
pub const PLAYERS: Key<Vec<Player>> = Key::with_validator("players", validate_players);

/// The acting player, or `None` between turns and after the game ends.
pub const CURRENT_PLAYER: Key<Option<PlayerColor>> = Key::new("currentPlayer");

/// This round's turn order.
pub const TURN_ORDER: Key<Vec<PlayerColor>> = Key::with_validator("turnOrder", |order| {
    for (i, color) in order.iter().enumerate() {
        if order[i + 1..].contains(color) {
            return Err(format!("{color} appears twice"));
        }
    }
    Ok(())
});

/// The active phase.
pub const PHASE: Key<PhaseId> = Key::new("phase");

/// 1-based round counter.
pub const ROUND: Key<u32> = Key::with_validator("roundNumber", |round| {
    if *round >= 1 {
        Ok(())
    } else {
        Err("rounds start at 1".into())
    }
});

/// Active or ended.
pub const GAME_STATUS: Key<GameStatus> = Key::new("gameStatus");

/// Automatic-action settings by color.
pub const AUTO_ACTIONS: Key<AutoActionTable> = Key::new("autoActions");

/// Seeded generator position.
pub const RNG: Key<GameRngState> = Key::new("rng");

/// The set of core keys.
pub fn core_keys() -> GameResult<KeySet> {
    KeySet::new()
        .with(PLAYERS)?
        .with(CURRENT_PLAYER)?
        .with(TURN_ORDER)?
        .with(PHASE)?
        .with(ROUND)?
        .with(GAME_STATUS)?
        .with(AUTO_ACTIONS)?
        .with(RNG)
}
