//! The trait every phase implements.

use crate::core::action::{ActionBundle, ActionRegistry, AutoAction};
use crate::core::config::PhaseId;
use crate::core::context::Context;
use crate::core::error::GameResult;
use crate::core::player::{PlayerColor, PlayerHelper, PlayerOrder};

use super::turn_order::next_in_order;

/// Behavior of one phase of a round.
///
/// The engine drives a phase through `on_start`, then a sequence of turns
/// (`on_start_turn` / actions / `on_end_turn`), then `on_end`. Every hook
/// has a default, so a module implements only what its phase changes.
pub trait PhaseModule: 'static {
    /// The phase this module handles.
    fn phase(&self) -> PhaseId;

    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Install the actions this phase accepts.
    fn configure_actions(&self, actions: &mut ActionRegistry) -> GameResult<()>;

    /// Players taking turns in this phase. Defaults to the turn order
    /// without eliminated players.
    fn get_player_order(&self, ctx: &Context) -> GameResult<PlayerOrder> {
        ctx.inject::<PlayerHelper>()?.in_game_order(ctx)
    }

    /// First player of the phase, or `None` to skip straight to `on_end`.
    fn first_player(&self, ctx: &Context) -> GameResult<Option<PlayerColor>> {
        Ok(self.get_player_order(ctx)?.first().copied())
    }

    /// Player after `current`, or `None` when the phase is over.
    fn find_next_player(&self, ctx: &Context, current: PlayerColor) -> GameResult<Option<PlayerColor>> {
        let order = self.get_player_order(ctx)?;
        let seating = ctx.inject::<PlayerHelper>()?.turn_order(ctx)?;
        Ok(next_in_order(&order, &seating, current))
    }

    fn on_start(&self, _ctx: &Context) -> GameResult<()> {
        Ok(())
    }

    fn on_start_turn(&self, _ctx: &Context) -> GameResult<()> {
        Ok(())
    }

    fn on_end_turn(&self, _ctx: &Context) -> GameResult<()> {
        Ok(())
    }

    fn on_end(&self, _ctx: &Context) -> GameResult<()> {
        Ok(())
    }

    /// An action the current player must take with no choice, if any.
    fn forced_action(&self, _ctx: &Context) -> GameResult<Option<ActionBundle>> {
        Ok(None)
    }

    /// The action to take on behalf of `player` given their standing
    /// instructions, if any. May update the instructions (e.g. consume a
    /// one-shot pass).
    fn auto_action(
        &self,
        _ctx: &Context,
        _player: PlayerColor,
        _auto: &AutoAction,
    ) -> GameResult<Option<ActionBundle>> {
        Ok(None)
    }
}
