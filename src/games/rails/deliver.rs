//! Goods delivery: two passes through the turn order.

use crate::core::action::{ActionBundle, ActionProcessor, ActionRegistry, AutoAction, NoData};
use crate::core::config::PhaseId;
use crate::core::context::{Context, Injectable};
use crate::core::error::{ensure_input, GameError, GameResult};
use crate::core::log::Log;
use crate::core::player::{PlayerColor, PlayerHelper};
use crate::core::rng::Random;
use crate::phases::{next_in_order, PhaseModule};

use super::game::DELIVER_PHASE;
use super::keys::{BOARD, DELIVER_ROUND, GOODS_BAG};
use super::take_pass_next;

const DELIVER_ROUNDS: u32 = 2;

/// `deliver`: draw a goods cube and earn 1 per owned tile.
///
/// The draw consumes randomness, so the action cannot be undone.
pub struct Deliver;

impl Injectable for Deliver {
    fn build(_ctx: &Context) -> GameResult<Self> {
        Ok(Deliver)
    }
}

impl ActionProcessor for Deliver {
    const NAME: &'static str = "deliver";
    type Data = NoData;

    fn validate(&self, ctx: &Context, _data: &NoData) -> GameResult<()> {
        ensure_input(!ctx.state(GOODS_BAG).get()?.is_empty(), || "the goods bag is empty".into())
    }

    fn process(&self, ctx: &Context, _data: NoData) -> GameResult<bool> {
        let players = ctx.inject::<PlayerHelper>()?;
        let color = players.require_current(ctx)?.color;

        let mut bag = (*ctx.state(GOODS_BAG).get()?).clone();
        let goods = ctx
            .inject::<Random>()?
            .draw(ctx, &mut bag)?
            .ok_or_else(|| GameError::invariant("drew from an empty goods bag"))?;
        ctx.state(GOODS_BAG).set(bag)?;

        let income = ctx.state(BOARD).get()?.owned_by(color) as i64;
        players.adjust_money(ctx, color, income)?;
        ctx.inject::<Log>()?
            .player(color, format!("delivers {goods} and earns {income}"));
        Ok(true)
    }
}

/// `pass`: skip this delivery.
pub struct DeliverPass;

impl Injectable for DeliverPass {
    fn build(_ctx: &Context) -> GameResult<Self> {
        Ok(DeliverPass)
    }
}

impl ActionProcessor for DeliverPass {
    const NAME: &'static str = "pass";
    type Data = NoData;

    fn validate(&self, _ctx: &Context, _data: &NoData) -> GameResult<()> {
        Ok(())
    }

    fn process(&self, ctx: &Context, _data: NoData) -> GameResult<bool> {
        ctx.inject::<Log>()?.current_player(ctx, "passes")?;
        Ok(true)
    }
}

pub struct DeliverPhase;

impl PhaseModule for DeliverPhase {
    fn phase(&self) -> PhaseId {
        DELIVER_PHASE
    }

    fn name(&self) -> &'static str {
        "deliver"
    }

    fn configure_actions(&self, actions: &mut ActionRegistry) -> GameResult<()> {
        actions.install::<Deliver>()?.install::<DeliverPass>()?;
        Ok(())
    }

    fn on_start(&self, ctx: &Context) -> GameResult<()> {
        ctx.state(DELIVER_ROUND).set(1)
    }

    /// Runs the order once per sub-round, then ends the phase.
    fn find_next_player(&self, ctx: &Context, current: PlayerColor) -> GameResult<Option<PlayerColor>> {
        let order = self.get_player_order(ctx)?;
        let seating = ctx.inject::<PlayerHelper>()?.turn_order(ctx)?;
        if let Some(next) = next_in_order(&order, &seating, current) {
            return Ok(Some(next));
        }
        let round = *ctx.state(DELIVER_ROUND).get()?;
        if round < DELIVER_ROUNDS {
            ctx.state(DELIVER_ROUND).set(round + 1)?;
            return Ok(order.first().copied());
        }
        Ok(None)
    }

    fn forced_action(&self, ctx: &Context) -> GameResult<Option<ActionBundle>> {
        let empty = ctx.state(GOODS_BAG).get()?.is_empty();
        Ok(empty.then(|| ActionBundle::empty(DeliverPass::NAME)))
    }

    fn auto_action(&self, ctx: &Context, player: PlayerColor, _auto: &AutoAction) -> GameResult<Option<ActionBundle>> {
        Ok(take_pass_next(ctx, player)?.then(|| ActionBundle::empty(DeliverPass::NAME)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::keys::{CURRENT_PLAYER, PHASE, ROUND};
    use crate::games::rails::testing::started;
    use crate::phases::PhaseEngine;

    /// Bid 1 then pass out the auction, build once each, and stop.
    fn in_deliver(ctx: &Context) {
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        engine.process_action(ctx, "bid", &json!({"amount": 1})).unwrap();
        engine.process_action(ctx, "pass", &json!({})).unwrap();
        for q in 0..2 {
            engine.process_action(ctx, "build", &json!({"q": q, "r": 0})).unwrap();
            engine.process_action(ctx, "done", &json!({})).unwrap();
        }
        assert_eq!(*ctx.state(PHASE).get().unwrap(), DELIVER_PHASE);
    }

    #[test]
    fn test_deliver_draws_and_pays() {
        let ctx = started(2, 5);
        in_deliver(&ctx);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let color = ctx.state(CURRENT_PLAYER).get().unwrap().unwrap();
        let players = ctx.inject::<PlayerHelper>().unwrap();
        let money = players.get(&ctx, color).unwrap().money;

        let outcome = engine.process_action(&ctx, "deliver", &json!({})).unwrap();
        assert!(outcome.ends_turn);
        assert_eq!(players.get(&ctx, color).unwrap().money, money + 1);
        assert_eq!(ctx.state(GOODS_BAG).get().unwrap().len(), 19);
        assert!(ctx.inject::<Random>().unwrap().consumed());
    }

    #[test]
    fn test_two_sub_rounds() {
        let ctx = started(2, 5);
        in_deliver(&ctx);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let first = ctx.state(CURRENT_PLAYER).get().unwrap().unwrap();

        engine.process_action(&ctx, "pass", &json!({})).unwrap();
        engine.process_action(&ctx, "pass", &json!({})).unwrap();
        assert_eq!(*ctx.state(DELIVER_ROUND).get().unwrap(), 2);
        assert_eq!(*ctx.state(CURRENT_PLAYER).get().unwrap(), Some(first));

        engine.process_action(&ctx, "pass", &json!({})).unwrap();
        engine.process_action(&ctx, "pass", &json!({})).unwrap();
        assert_eq!(*ctx.state(ROUND).get().unwrap(), 2);
    }

    #[test]
    fn test_empty_bag_forces_pass() {
        let ctx = started(2, 5);
        in_deliver(&ctx);
        ctx.state(GOODS_BAG).set(Vec::new()).unwrap();

        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let err = engine.process_action(&ctx, "deliver", &json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        // Every delivery after this one is a forced pass, so the round ends.
        engine.process_action(&ctx, "pass", &json!({})).unwrap();
        assert_eq!(*ctx.state(ROUND).get().unwrap(), 2);
        assert_eq!(*ctx.state(PHASE).get().unwrap(), crate::games::rails::AUCTION_PHASE);
    }
}
