//! "Rails": a tiny tile-laying economic game for exercising the engine.
//!
//! Each round runs three phases:
//! - **Auction**: bid for first seat; passing players take the back seats
//! - **Build**: lay up to two track tiles on a hex board
//! - **Deliver**: two sub-rounds of drawing goods, paid per tile owned
//!
//! After every round each player pays 1 upkeep; anyone below zero is out.
//! The richest player still in the game wins.
//!
//! Two map keys are registered: `"rails"` and `"rails-short"`, which plays
//! two rounds with a cheaper build phase installed over the standard one.

mod auction;
mod board;
mod build;
mod deliver;
mod game;
mod keys;

pub use auction::{AuctionBid, AuctionPass, AuctionPhase, BidData};
pub use board::{starting_bag, Board, Goods, Tile, BOARD_RADIUS};
pub use build::{BuildPhase, BuildTrack, Done, TileCoord};
pub use deliver::{Deliver, DeliverPass, DeliverPhase};
pub use game::{RailsRuleset, RailsVariant, AUCTION_PHASE, BUILD_PHASE, DELIVER_PHASE};
pub use keys::{rails_keys, AuctionState, AUCTION, BOARD, BUILDS_THIS_TURN, DELIVER_ROUND, GOODS_BAG};

use crate::core::context::Context;
use crate::core::error::GameResult;
use crate::core::keys::AUTO_ACTIONS;
use crate::core::player::PlayerColor;

/// Consume a one-shot `pass_next` instruction. Returns whether one was set.
fn take_pass_next(ctx: &Context, player: PlayerColor) -> GameResult<bool> {
    let set = ctx
        .state(AUTO_ACTIONS)
        .get()?
        .get(&player)
        .is_some_and(|auto| auto.pass_next);
    if set {
        ctx.state(AUTO_ACTIONS).update(|table| {
            if let Some(auto) = table.get_mut(&player) {
                auto.pass_next = false;
                if auto.is_empty() {
                    table.remove(&player);
                }
            }
        })?;
    }
    Ok(set)
}
