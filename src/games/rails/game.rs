//! The rails ruleset and its variants.

use std::rc::Rc;

use crate::core::config::{PhaseId, RulesetConfig};
use crate::core::context::{Context, Overrides};
use crate::core::error::GameResult;
use crate::core::key::KeySet;
use crate::core::log::Log;
use crate::core::player::PlayerHelper;
use crate::phases::PhaseDelegator;
use crate::rules::{Ruleset, SeatingOrder, StartingOrder, StartingOrderPolicy};

use super::auction::AuctionPhase;
use super::board::{starting_bag, Board, BOARD_RADIUS};
use super::build::BuildPhase;
use super::deliver::DeliverPhase;
use super::keys::{rails_keys, AuctionState, AUCTION, BOARD, BUILDS_THIS_TURN, DELIVER_ROUND, GOODS_BAG};

pub const AUCTION_PHASE: PhaseId = PhaseId::new(0);
pub const BUILD_PHASE: PhaseId = PhaseId::new(1);
pub const DELIVER_PHASE: PhaseId = PhaseId::new(2);

const PHASES: [PhaseId; 3] = [AUCTION_PHASE, BUILD_PHASE, DELIVER_PHASE];

/// Cubes of each kind in the starting bag.
const GOODS_PER_KIND: usize = 4;

/// Paid by every player at the end of each round.
const UPKEEP: i64 = 1;

/// Which rails map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RailsVariant {
    /// Three rounds, track costs 2.
    Standard,
    /// Two rounds, track costs 1, players keep their seats in round one.
    Short,
}

impl RailsVariant {
    #[must_use]
    pub const fn map_key(self) -> &'static str {
        match self {
            RailsVariant::Standard => "rails",
            RailsVariant::Short => "rails-short",
        }
    }
}

/// The rails ruleset.
///
/// # Example
///
/// ```
/// use rust_tile_engine::games::rails::{RailsRuleset, RailsVariant};
/// use rust_tile_engine::rules::Ruleset;
///
/// let short = RailsRuleset::new(RailsVariant::Short);
/// assert_eq!(short.map_key(), "rails-short");
/// assert_eq!(short.config().rounds, 2);
/// ```
#[derive(Debug)]
pub struct RailsRuleset {
    variant: RailsVariant,
    config: RulesetConfig,
    overrides: Overrides,
}

impl RailsRuleset {
    pub fn new(variant: RailsVariant) -> Self {
        let (config, overrides) = match variant {
            RailsVariant::Standard => (RulesetConfig::new("Rails"), Overrides::new()),
            RailsVariant::Short => (
                RulesetConfig::new("Rails Short").with_rounds(2),
                Overrides::new().with::<StartingOrder>(seating_order),
            ),
        };
        Self {
            variant,
            config,
            overrides,
        }
    }

    /// Replace the static configuration, e.g. to start players poorer.
    #[must_use]
    pub fn with_config(mut self, config: RulesetConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn variant(&self) -> RailsVariant {
        self.variant
    }
}

fn seating_order(_ctx: &Context) -> GameResult<Rc<dyn StartingOrderPolicy>> {
    Ok(Rc::new(SeatingOrder))
}

impl Ruleset for RailsRuleset {
    fn map_key(&self) -> &'static str {
        self.variant.map_key()
    }

    fn config(&self) -> &RulesetConfig {
        &self.config
    }

    fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    fn keys(&self) -> GameResult<KeySet> {
        rails_keys()
    }

    fn phases(&self) -> &[PhaseId] {
        &PHASES
    }

    fn install_phases(&self, delegator: &mut PhaseDelegator) -> GameResult<()> {
        delegator.install(AuctionPhase);
        delegator.install(BuildPhase::<2>);
        delegator.install(DeliverPhase);
        if self.variant == RailsVariant::Short {
            delegator.install(BuildPhase::<1>);
        }
        Ok(())
    }

    fn setup(&self, ctx: &Context) -> GameResult<()> {
        ctx.state(BOARD).init(Board::new(BOARD_RADIUS))?;
        ctx.state(AUCTION).init(AuctionState::default())?;
        ctx.state(BUILDS_THIS_TURN).init(0)?;
        ctx.state(GOODS_BAG).init(starting_bag(GOODS_PER_KIND))?;
        ctx.state(DELIVER_ROUND).init(1)
    }

    /// Upkeep: everyone still playing pays 1; anyone left below zero is out.
    fn on_round_end(&self, ctx: &Context) -> GameResult<()> {
        let players = ctx.inject::<PlayerHelper>()?;
        let log = ctx.inject::<Log>()?;
        for color in players.in_game_order(ctx)? {
            if players.adjust_money(ctx, color, -UPKEEP)? < 0 {
                players.eliminate(ctx, color)?;
                log.player(color, "is out of the game");
            }
        }
        Ok(())
    }
}
