//! Track building.

use serde::{Deserialize, Serialize};

use crate::core::action::{ActionBundle, ActionProcessor, ActionRegistry, AutoAction, NoData};
use crate::core::config::PhaseId;
use crate::core::context::{Context, Injectable};
use crate::core::error::{ensure_input, ensure_invariant, GameResult};
use crate::core::log::Log;
use crate::core::player::{PlayerColor, PlayerHelper};
use crate::phases::PhaseModule;

use super::game::BUILD_PHASE;
use super::keys::{BOARD, BUILDS_THIS_TURN};
use super::take_pass_next;

/// Builds allowed per turn.
const BUILDS_PER_TURN: u32 = 2;

/// An axial board coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCoord {
    pub q: i32,
    pub r: i32,
}

/// `build {q, r}`: lay track for `COST`.
pub struct BuildTrack<const COST: i64>;

impl<const COST: i64> Injectable for BuildTrack<COST> {
    fn build(_ctx: &Context) -> GameResult<Self> {
        Ok(BuildTrack)
    }
}

impl<const COST: i64> ActionProcessor for BuildTrack<COST> {
    const NAME: &'static str = "build";
    type Data = TileCoord;

    fn validate(&self, ctx: &Context, at: &TileCoord) -> GameResult<()> {
        let board = ctx.state(BOARD).get()?;
        ensure_input(board.contains(at.q, at.r), || format!("({}, {}) is off the board", at.q, at.r))?;
        ensure_input(board.tile(at.q, at.r).is_none(), || {
            format!("({}, {}) already has track", at.q, at.r)
        })?;

        let player = ctx.inject::<PlayerHelper>()?.require_current(ctx)?;
        ensure_input(player.money >= COST, || {
            format!("{} cannot afford track ({} needed)", player.color, COST)
        })?;
        let builds = *ctx.state(BUILDS_THIS_TURN).get()?;
        ensure_invariant(builds < BUILDS_PER_TURN, || format!("{builds} builds already this turn"))
    }

    fn process(&self, ctx: &Context, at: TileCoord) -> GameResult<bool> {
        let players = ctx.inject::<PlayerHelper>()?;
        let color = players.require_current(ctx)?.color;

        let mut placed = false;
        ctx.state(BOARD).update(|board| placed = board.place(at.q, at.r, color))?;
        ensure_invariant(placed, || format!("could not place track at ({}, {})", at.q, at.r))?;
        players.adjust_money(ctx, color, -COST)?;
        ctx.state(BUILDS_THIS_TURN).update(|builds| *builds += 1)?;

        ctx.inject::<Log>()?
            .player(color, format!("builds track at ({}, {}) for {}", at.q, at.r, COST));
        Ok(*ctx.state(BUILDS_THIS_TURN).get()? >= BUILDS_PER_TURN)
    }
}

/// `done`: stop building for this turn.
pub struct Done;

impl Injectable for Done {
    fn build(_ctx: &Context) -> GameResult<Self> {
        Ok(Done)
    }
}

impl ActionProcessor for Done {
    const NAME: &'static str = "done";
    type Data = NoData;

    fn validate(&self, _ctx: &Context, _data: &NoData) -> GameResult<()> {
        Ok(())
    }

    fn process(&self, ctx: &Context, _data: NoData) -> GameResult<bool> {
        ctx.inject::<Log>()?.current_player(ctx, "finishes building")?;
        Ok(true)
    }
}

/// The build phase, with track costing `COST`.
pub struct BuildPhase<const COST: i64>;

impl<const COST: i64> PhaseModule for BuildPhase<COST> {
    fn phase(&self) -> PhaseId {
        BUILD_PHASE
    }

    fn name(&self) -> &'static str {
        "build"
    }

    fn configure_actions(&self, actions: &mut ActionRegistry) -> GameResult<()> {
        actions.install::<BuildTrack<COST>>()?.install::<Done>()?;
        Ok(())
    }

    fn on_start_turn(&self, ctx: &Context) -> GameResult<()> {
        ctx.state(BUILDS_THIS_TURN).set(0)
    }

    /// `done` once the player is broke or the board is full.
    fn forced_action(&self, ctx: &Context) -> GameResult<Option<ActionBundle>> {
        let money = ctx.inject::<PlayerHelper>()?.require_current(ctx)?.money;
        let board = ctx.state(BOARD).get()?;
        let stuck = money < COST || board.tiles.len() >= board.capacity();
        Ok(stuck.then(|| ActionBundle::empty(Done::NAME)))
    }

    fn auto_action(&self, ctx: &Context, player: PlayerColor, _auto: &AutoAction) -> GameResult<Option<ActionBundle>> {
        Ok(take_pass_next(ctx, player)?.then(|| ActionBundle::empty(Done::NAME)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::keys::{CURRENT_PLAYER, PHASE, TURN_ORDER};
    use crate::games::rails::testing::{started, started_on};
    use crate::games::rails::RailsVariant;
    use crate::phases::PhaseEngine;

    /// The first seat bids 1 and everyone else passes.
    fn in_build(ctx: &Context) {
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let seats = ctx.state(TURN_ORDER).get().unwrap().len();
        engine.process_action(ctx, "bid", &json!({"amount": 1})).unwrap();
        for _ in 1..seats {
            engine.process_action(ctx, "pass", &json!({})).unwrap();
        }
        assert_eq!(*ctx.state(PHASE).get().unwrap(), BUILD_PHASE);
    }

    #[test]
    fn test_two_builds_end_the_turn() {
        let ctx = started(2, 3);
        in_build(&ctx);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let first = ctx.state(CURRENT_PLAYER).get().unwrap().unwrap();

        engine.process_action(&ctx, "build", &json!({"q": 0, "r": 0})).unwrap();
        assert_eq!(*ctx.state(CURRENT_PLAYER).get().unwrap(), Some(first));
        engine.process_action(&ctx, "build", &json!({"q": 1, "r": 0})).unwrap();
        assert_ne!(*ctx.state(CURRENT_PLAYER).get().unwrap(), Some(first));

        let players = ctx.inject::<PlayerHelper>().unwrap();
        // 10 - 1 (auction) - 2 * 2 (track)
        assert_eq!(players.get(&ctx, first).unwrap().money, 5);
        assert_eq!(ctx.state(BOARD).get().unwrap().owned_by(first), 2);
    }

    #[test]
    fn test_build_rejects_taken_and_off_board() {
        let ctx = started(2, 3);
        in_build(&ctx);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        engine.process_action(&ctx, "build", &json!({"q": 0, "r": 0})).unwrap();

        let err = engine.process_action(&ctx, "build", &json!({"q": 0, "r": 0})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = engine.process_action(&ctx, "build", &json!({"q": 4, "r": 0})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = engine.process_action(&ctx, "build", &json!({"q": "x"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_pass_is_not_a_build_action() {
        let ctx = started(2, 3);
        in_build(&ctx);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let before = ctx.serialize().unwrap();
        let err = engine.process_action(&ctx, "pass", &json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(ctx.serialize().unwrap(), before);
    }

    #[test]
    fn test_short_variant_builds_cheaper() {
        let ctx = started_on(RailsVariant::Short, 2, 3);
        in_build(&ctx);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        assert!(engine.can_emit::<BuildTrack<1>>(&ctx).unwrap());
        assert!(!engine.can_emit::<BuildTrack<2>>(&ctx).unwrap());

        let first = ctx.state(CURRENT_PLAYER).get().unwrap().unwrap();
        engine.process_action(&ctx, "build", &json!({"q": 0, "r": 0})).unwrap();
        let players = ctx.inject::<PlayerHelper>().unwrap();
        assert_eq!(players.get(&ctx, first).unwrap().money, 8);
    }
}
