//! Turn-order auction.
//!
//! Players bid in a wrapping order until one bidder is left. Passed players
//! are skipped for the rest of the auction. The winner pays the high bid
//! and goes first next round; the remaining seats go in reverse order of
//! passing, so the first to pass sits last.

use serde::{Deserialize, Serialize};

use crate::core::action::{ActionBundle, ActionProcessor, ActionRegistry, AutoAction, NoData};
use crate::core::config::PhaseId;
use crate::core::context::{Context, Injectable};
use crate::core::error::{ensure_input, GameResult};
use crate::core::keys::{AUTO_ACTIONS, TURN_ORDER};
use crate::core::log::Log;
use crate::core::player::{PlayerColor, PlayerHelper, PlayerOrder};
use crate::phases::{next_cyclic, PhaseModule};

use super::game::AUCTION_PHASE;
use super::keys::{AuctionState, AUCTION};
use super::take_pass_next;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidData {
    pub amount: i64,
}

/// `bid {amount}`: raise the high bid.
pub struct AuctionBid;

impl Injectable for AuctionBid {
    fn build(_ctx: &Context) -> GameResult<Self> {
        Ok(AuctionBid)
    }
}

impl ActionProcessor for AuctionBid {
    const NAME: &'static str = "bid";
    type Data = BidData;

    fn validate(&self, ctx: &Context, data: &BidData) -> GameResult<()> {
        let auction = ctx.state(AUCTION).get()?;
        let player = ctx.inject::<PlayerHelper>()?.require_current(ctx)?;
        ensure_input(data.amount > auction.high_bid, || {
            format!("bid of {} does not beat {}", data.amount, auction.high_bid)
        })?;
        ensure_input(data.amount <= player.money, || {
            format!("bid of {} exceeds {}'s money ({})", data.amount, player.color, player.money)
        })
    }

    fn process(&self, ctx: &Context, data: BidData) -> GameResult<bool> {
        let color = ctx.inject::<PlayerHelper>()?.require_current(ctx)?.color;
        ctx.state(AUCTION).update(|auction| {
            auction.high_bid = data.amount;
            auction.high_bidder = Some(color);
        })?;
        ctx.inject::<Log>()?.player(color, format!("bids {}", data.amount));
        Ok(true)
    }
}

/// `pass`: drop out of the auction.
pub struct AuctionPass;

impl Injectable for AuctionPass {
    fn build(_ctx: &Context) -> GameResult<Self> {
        Ok(AuctionPass)
    }
}

impl ActionProcessor for AuctionPass {
    const NAME: &'static str = "pass";
    type Data = NoData;

    fn validate(&self, _ctx: &Context, _data: &NoData) -> GameResult<()> {
        Ok(())
    }

    fn process(&self, ctx: &Context, _data: NoData) -> GameResult<bool> {
        let color = ctx.inject::<PlayerHelper>()?.require_current(ctx)?.color;
        ctx.state(AUCTION).update(|auction| auction.passed.push(color))?;
        ctx.inject::<Log>()?.player(color, "passes");
        Ok(true)
    }
}

/// The auction phase.
pub struct AuctionPhase;

impl PhaseModule for AuctionPhase {
    fn phase(&self) -> PhaseId {
        AUCTION_PHASE
    }

    fn name(&self) -> &'static str {
        "auction"
    }

    fn configure_actions(&self, actions: &mut ActionRegistry) -> GameResult<()> {
        actions.install::<AuctionBid>()?.install::<AuctionPass>()?;
        Ok(())
    }

    /// In-game players who have not passed.
    fn get_player_order(&self, ctx: &Context) -> GameResult<PlayerOrder> {
        let passed = ctx.state(AUCTION).get()?.passed.clone();
        let mut order = ctx.inject::<PlayerHelper>()?.in_game_order(ctx)?;
        order.retain(|color| !passed.contains(color));
        Ok(order)
    }

    fn first_player(&self, ctx: &Context) -> GameResult<Option<PlayerColor>> {
        let order = self.get_player_order(ctx)?;
        Ok(if order.len() < 2 { None } else { order.first().copied() })
    }

    fn find_next_player(&self, ctx: &Context, current: PlayerColor) -> GameResult<Option<PlayerColor>> {
        let order = self.get_player_order(ctx)?;
        if order.len() < 2 {
            return Ok(None);
        }
        let seating = ctx.inject::<PlayerHelper>()?.turn_order(ctx)?;
        Ok(next_cyclic(&order, &seating, current))
    }

    fn on_start(&self, ctx: &Context) -> GameResult<()> {
        ctx.state(AUCTION).set(AuctionState::default())
    }

    fn on_end(&self, ctx: &Context) -> GameResult<()> {
        let auction = ctx.state(AUCTION).get()?;
        let players = ctx.inject::<PlayerHelper>()?;
        let Some(winner) = self.get_player_order(ctx)?.first().copied() else {
            return Ok(());
        };

        players.adjust_money(ctx, winner, -auction.high_bid)?;
        let seating = players.turn_order(ctx)?;
        let mut order = vec![winner];
        order.extend(auction.passed.iter().rev().copied());
        order.extend(seating.iter().copied().filter(|c| *c != winner && !auction.passed.contains(c)));
        ctx.state(TURN_ORDER).set(order)?;

        // Bid limits apply to one auction only.
        ctx.state(AUTO_ACTIONS).update(|table| {
            table.values_mut().for_each(|auto| auto.bid_until = None);
            table.retain(|_, auto| !auto.is_empty());
        })?;

        ctx.inject::<Log>()?
            .player(winner, format!("wins the auction for {}", auction.high_bid));
        Ok(())
    }

    fn forced_action(&self, ctx: &Context) -> GameResult<Option<ActionBundle>> {
        let player = ctx.inject::<PlayerHelper>()?.require_current(ctx)?;
        let high_bid = ctx.state(AUCTION).get()?.high_bid;
        Ok((player.money <= high_bid).then(|| ActionBundle::empty(AuctionPass::NAME)))
    }

    fn auto_action(&self, ctx: &Context, player: PlayerColor, auto: &AutoAction) -> GameResult<Option<ActionBundle>> {
        if take_pass_next(ctx, player)? {
            return Ok(Some(ActionBundle::empty(AuctionPass::NAME)));
        }
        let Some(limit) = auto.bid_until else {
            return Ok(None);
        };
        let money = ctx.inject::<PlayerHelper>()?.get(ctx, player)?.money;
        let amount = ctx.state(AUCTION).get()?.high_bid + 1;
        if amount <= limit && amount <= money {
            ActionBundle::new(AuctionBid::NAME, &BidData { amount }).map(Some)
        } else {
            Ok(Some(ActionBundle::empty(AuctionPass::NAME)))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::keys::CURRENT_PLAYER;
    use crate::games::rails::testing::started;
    use crate::phases::PhaseEngine;

    fn current(ctx: &Context) -> PlayerColor {
        ctx.state(CURRENT_PLAYER).get().unwrap().unwrap()
    }

    #[test]
    fn test_bid_must_beat_high_bid() {
        let ctx = started(3, 1);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        engine.process_action(&ctx, "bid", &json!({"amount": 2})).unwrap();

        let before = ctx.serialize().unwrap();
        let err = engine.process_action(&ctx, "bid", &json!({"amount": 2})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(ctx.serialize().unwrap(), before);
    }

    #[test]
    fn test_bid_must_be_affordable() {
        let ctx = started(2, 1);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let err = engine.process_action(&ctx, "bid", &json!({"amount": 11})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_auction_winner_seats_first() {
        let ctx = started(3, 4);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let order = ctx.state(TURN_ORDER).get().unwrap();
        let (a, b, c) = (order[0], order[1], order[2]);

        assert_eq!(current(&ctx), a);
        engine.process_action(&ctx, "pass", &json!({})).unwrap();
        assert_eq!(current(&ctx), b);
        engine.process_action(&ctx, "bid", &json!({"amount": 3})).unwrap();
        assert_eq!(current(&ctx), c);
        engine.process_action(&ctx, "pass", &json!({})).unwrap();

        // b won for 3; a passed first so sits last.
        assert_eq!(*ctx.state(TURN_ORDER).get().unwrap(), vec![b, c, a]);
        let players = ctx.inject::<PlayerHelper>().unwrap();
        assert_eq!(players.get(&ctx, b).unwrap().money, 7);
        assert_eq!(current(&ctx), b);
    }

    #[test]
    fn test_bidding_wraps_around() {
        let ctx = started(2, 8);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let order = ctx.state(TURN_ORDER).get().unwrap();
        let (a, b) = (order[0], order[1]);

        engine.process_action(&ctx, "bid", &json!({"amount": 1})).unwrap();
        engine.process_action(&ctx, "bid", &json!({"amount": 2})).unwrap();
        assert_eq!(current(&ctx), a);
        assert_eq!(ctx.state(AUCTION).get().unwrap().high_bidder, Some(b));
    }

    #[test]
    fn test_forced_pass_when_outbid_beyond_means() {
        let ctx = started(2, 8);
        let engine = ctx.inject::<PhaseEngine>().unwrap();
        let order = ctx.state(TURN_ORDER).get().unwrap();
        let b = order[1];

        // Nobody can beat an all-in bid, so the other player passes at once.
        engine.process_action(&ctx, "bid", &json!({"amount": 10})).unwrap();
        assert_eq!(ctx.state(TURN_ORDER).get().unwrap().last().copied(), Some(b));
    }
}
