//! Engine extension points a ruleset may override.
//!
//! - [`GameEnd`]: decides, after each round, whether the game is over
//! - [`StartingOrder`]: decides the first round's turn order

use std::rc::Rc;

use crate::core::context::{Context, ExtensionPoint};
use crate::core::error::GameResult;
use crate::core::keys::ROUND;
use crate::core::player::{PlayerColor, PlayerHelper};
use crate::core::rng::Random;

/// End-of-game policy.
pub trait GameEndCheck {
    /// Whether the game ends now. Asked once per completed round.
    fn is_over(&self, ctx: &Context) -> GameResult<bool>;
}

/// Extension point for [`GameEndCheck`].
pub struct GameEnd;

impl ExtensionPoint for GameEnd {
    type Service = dyn GameEndCheck;

    fn default_service(_ctx: &Context) -> GameResult<Rc<dyn GameEndCheck>> {
        Ok(Rc::new(RoundLimit))
    }
}

/// Ends the game after the configured number of rounds, or as soon as fewer
/// than two players remain.
pub struct RoundLimit;

impl GameEndCheck for RoundLimit {
    fn is_over(&self, ctx: &Context) -> GameResult<bool> {
        let round = *ctx.state(ROUND).get()?;
        if round >= ctx.ruleset().config().rounds {
            return Ok(true);
        }
        let remaining = ctx.inject::<PlayerHelper>()?.in_game_order(ctx)?.len();
        Ok(remaining < 2)
    }
}

/// First-round turn order policy.
pub trait StartingOrderPolicy {
    /// Arrange `seats` (in seating order) into the opening turn order.
    fn initial_order(&self, ctx: &Context, seats: Vec<PlayerColor>) -> GameResult<Vec<PlayerColor>>;
}

/// Extension point for [`StartingOrderPolicy`].
pub struct StartingOrder;

impl ExtensionPoint for StartingOrder {
    type Service = dyn StartingOrderPolicy;

    fn default_service(_ctx: &Context) -> GameResult<Rc<dyn StartingOrderPolicy>> {
        Ok(Rc::new(RandomOrder))
    }
}

/// Shuffle the seats with the game's RNG.
pub struct RandomOrder;

impl StartingOrderPolicy for RandomOrder {
    fn initial_order(&self, ctx: &Context, mut seats: Vec<PlayerColor>) -> GameResult<Vec<PlayerColor>> {
        ctx.inject::<Random>()?.shuffle(ctx, &mut seats)?;
        Ok(seats)
    }
}

/// Keep seating order.
pub struct SeatingOrder;

impl StartingOrderPolicy for SeatingOrder {
    fn initial_order(&self, _ctx: &Context, seats: Vec<PlayerColor>) -> GameResult<Vec<PlayerColor>> {
        Ok(seats)
    }
}
