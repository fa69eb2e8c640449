//! The entry point: one call, one fresh context, one new snapshot.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::action::AutoAction;
use crate::core::config::{EngineConfig, StartConfig};
use crate::core::context::Context;
use crate::core::error::{GameError, GameResult};
use crate::core::keys::{GameStatus, AUTO_ACTIONS, GAME_STATUS, PLAYERS, TURN_ORDER};
use crate::core::log::Log;
use crate::core::player::{Player, PlayerHelper, PlayerId};
use crate::core::rng::Random;
use crate::phases::PhaseEngine;
use crate::rules::{RulesetRegistry, StartingOrder};

use super::game_state::GameState;
use super::history::RecordedAction;

/// Stateless game driver.
///
/// `Engine` holds only the ruleset registry and bounds; it is `Send + Sync`
/// and may serve many games from many threads. Calls for the same game
/// must be serialized by the caller.
#[derive(Clone, Debug)]
pub struct Engine {
    registry: RulesetRegistry,
    config: EngineConfig,
}

impl Engine {
    /// Engine over `registry` with default bounds.
    #[must_use]
    pub fn new(registry: RulesetRegistry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    /// Engine over the built-in rulesets.
    pub fn builtin() -> GameResult<Self> {
        Ok(Self::new(RulesetRegistry::builtin()?))
    }

    /// Replace the bounds.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &RulesetRegistry {
        &self.registry
    }

    /// Set up a new game and run it until the first player must act.
    #[instrument(skip(self, player_ids, start), fields(map_key = %start.map_key, players = player_ids.len()))]
    pub fn start(&self, player_ids: &[PlayerId], start: &StartConfig) -> GameResult<GameState> {
        let ruleset = self.registry.get(&start.map_key)?;
        let config = ruleset.config();
        config.check_player_count(player_ids.len())?;
        let unique: BTreeSet<_> = player_ids.iter().collect();
        if unique.len() != player_ids.len() {
            return Err(GameError::invalid_input("player ids must be unique"));
        }

        let ctx = Context::new(ruleset.clone(), self.config.clone())?;

        let seed = start.seed.unwrap_or_else(rand::random);
        debug!(seed, "seeding game");
        ctx.inject::<Random>()?.seed(&ctx, seed)?;

        let players: Vec<Player> = player_ids
            .iter()
            .zip(&config.colors)
            .map(|(id, color)| Player::new(*id, *color, config.starting_money))
            .collect();
        let seats: Vec<_> = players.iter().map(|p| p.color).collect();
        ctx.state(PLAYERS).init(players)?;

        let order = ctx.resolve::<StartingOrder>()?.initial_order(&ctx, seats)?;
        ctx.state(TURN_ORDER).init(order)?;
        ctx.state(AUTO_ACTIONS).init(Default::default())?;

        ctx.inject::<Log>()?
            .log(format!("{} begins with {} players", config.name, player_ids.len()));
        ruleset.setup(&ctx)?;
        ctx.inject::<PhaseEngine>()?.start_game(&ctx)?;

        // Nothing precedes the first snapshot, so there is nothing to undo.
        self.report(&ctx, false)
    }

    /// Apply one action to a snapshot.
    #[instrument(skip(self, game_data, action_data))]
    pub fn process_action(
        &self,
        map_key: &str,
        game_data: &str,
        action_name: &str,
        action_data: &Value,
    ) -> GameResult<GameState> {
        let ctx = self.open(map_key, game_data)?;
        self.apply(&ctx, action_name, action_data)
    }

    /// [`Engine::process_action`], rejecting users other than the active
    /// player.
    #[instrument(skip(self, game_data, action_data))]
    pub fn process_action_as(
        &self,
        user: PlayerId,
        map_key: &str,
        game_data: &str,
        action_name: &str,
        action_data: &Value,
    ) -> GameResult<GameState> {
        let ctx = self.open(map_key, game_data)?;
        let current = ctx.inject::<PlayerHelper>()?.current(&ctx)?;
        match current.as_ref() {
            Some(player) if player.player_id == user => {}
            Some(player) => {
                return Err(GameError::permission(format!(
                    "{user} cannot act during {}'s turn",
                    player.color
                )))
            }
            None => return Err(GameError::permission(format!("{user} cannot act: nobody's turn"))),
        }
        self.apply(&ctx, action_name, action_data)
    }

    /// Store standing instructions for `user`, then run any automatic
    /// actions they unlock. An empty instruction clears the entry.
    #[instrument(skip(self, game_data))]
    pub fn set_auto_action(
        &self,
        map_key: &str,
        game_data: &str,
        user: PlayerId,
        auto: AutoAction,
    ) -> GameResult<GameState> {
        let ctx = self.open(map_key, game_data)?;
        let player = ctx
            .inject::<PlayerHelper>()?
            .by_user(&ctx, user)?
            .filter(|p| !p.out_of_game)
            .ok_or_else(|| GameError::permission(format!("{user} is not playing this game")))?;

        ctx.state(AUTO_ACTIONS).update(|table| {
            if auto.is_empty() {
                table.remove(&player.color);
            } else {
                table.insert(player.color, auto);
            }
        })?;

        let engine = ctx.inject::<PhaseEngine>()?;
        let reversible = if engine.is_active(&ctx)? {
            engine.run_automatic(&ctx)?
        } else {
            true
        };
        let random = ctx.inject::<Random>()?;
        self.report(&ctx, reversible && !random.consumed())
    }

    /// Action names the active phase accepts.
    pub fn available_actions(&self, map_key: &str, game_data: &str) -> GameResult<Vec<String>> {
        let ctx = self.open(map_key, game_data)?;
        let names = ctx.inject::<PhaseEngine>()?.available_actions(&ctx)?;
        Ok(names.into_iter().map(str::to_string).collect())
    }

    /// Describe a snapshot without changing it.
    pub fn load(&self, map_key: &str, game_data: &str) -> GameResult<GameState> {
        let ctx = self.open(map_key, game_data)?;
        self.report(&ctx, false)
    }

    /// Re-run recorded actions against `base`. Attributed actions are
    /// checked against the active player as they were originally.
    #[instrument(skip(self, base, actions), fields(actions = actions.len()))]
    pub fn replay(&self, map_key: &str, base: &str, actions: &[RecordedAction]) -> GameResult<GameState> {
        let mut state = self.load(map_key, base)?;
        for (index, action) in actions.iter().enumerate() {
            debug!(index, action = %action.action_name, "replaying");
            state = match action.user_id {
                Some(user) => self.process_action_as(
                    user,
                    map_key,
                    &state.game_data,
                    &action.action_name,
                    &action.action_data,
                )?,
                None => self.process_action(map_key, &state.game_data, &action.action_name, &action.action_data)?,
            };
        }
        Ok(state)
    }

    fn open(&self, map_key: &str, game_data: &str) -> GameResult<Context> {
        let ruleset = self.registry.get(map_key)?;
        Context::from_snapshot(ruleset, self.config.clone(), game_data)
    }

    fn apply(&self, ctx: &Context, action_name: &str, action_data: &Value) -> GameResult<GameState> {
        let outcome = ctx
            .inject::<PhaseEngine>()?
            .process_action(ctx, action_name, action_data)?;
        let random = ctx.inject::<Random>()?;
        self.report(ctx, outcome.reversible && !random.consumed())
    }

    fn report(&self, ctx: &Context, reversible: bool) -> GameResult<GameState> {
        let game_status = *ctx.state(GAME_STATUS).get()?;
        let active_player_id = match game_status {
            GameStatus::Active => {
                let current = ctx.inject::<PlayerHelper>()?.current(ctx)?;
                (*current).as_ref().map(|p| p.player_id)
            }
            GameStatus::Ended => None,
        };
        Ok(GameState {
            active_player_id,
            game_status,
            game_data: ctx.serialize()?,
            reversible,
            logs: ctx.inject::<Log>()?.dump(),
        })
    }
}
