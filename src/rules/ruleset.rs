//! Ruleset trait for game implementations.
//!
//! Rulesets implement `Ruleset` to define their game:
//! - Which phases make up a round
//! - How each phase behaves (via installed phase modules)
//! - Board setup and round-end bookkeeping
//! - Who won

use crate::core::config::{PhaseId, RulesetConfig};
use crate::core::context::{Context, Overrides};
use crate::core::error::GameResult;
use crate::core::key::KeySet;
use crate::core::player::{PlayerColor, PlayerHelper};
use crate::phases::PhaseDelegator;

/// Result of a completed game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameOutcome {
    /// Single winner.
    Winner(PlayerColor),
    /// Draw (no winner).
    Draw,
    /// Multiple winners (shared victory).
    Winners(Vec<PlayerColor>),
}

impl GameOutcome {
    /// Check if a player won.
    #[must_use]
    pub fn is_winner(&self, player: PlayerColor) -> bool {
        match self {
            GameOutcome::Winner(p) => *p == player,
            GameOutcome::Winners(ps) => ps.contains(&player),
            GameOutcome::Draw => false,
        }
    }

    /// One-line summary for the game log.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            GameOutcome::Winner(p) => format!("{p} wins the game"),
            GameOutcome::Draw => "The game ends in a draw".to_string(),
            GameOutcome::Winners(ps) => {
                let names: Vec<_> = ps.iter().map(|p| p.name()).collect();
                format!("{} share the win", names.join(" and "))
            }
        }
    }

    /// Richest players still in the game win. If everyone is out, the
    /// richest players overall win.
    pub fn richest(ctx: &Context) -> GameResult<Self> {
        let players = ctx.inject::<PlayerHelper>()?.players(ctx)?;
        let in_game: Vec<_> = players.iter().filter(|p| !p.out_of_game).collect();
        let pool: Vec<_> = if in_game.is_empty() {
            players.iter().collect()
        } else {
            in_game
        };

        let Some(top) = pool.iter().map(|p| p.money).max() else {
            return Ok(GameOutcome::Draw);
        };
        let mut winners: Vec<_> = pool.iter().filter(|p| p.money == top).map(|p| p.color).collect();
        Ok(if winners.len() == 1 {
            GameOutcome::Winner(winners.remove(0))
        } else {
            GameOutcome::Winners(winners)
        })
    }
}

/// A complete game definition, selected by map key.
///
/// Rulesets are shared across threads by the registry; everything that
/// changes during play lives in the context's state store.
pub trait Ruleset: Send + Sync + 'static {
    /// Registry key, e.g. `"rails"`.
    fn map_key(&self) -> &'static str;

    /// Static configuration.
    fn config(&self) -> &RulesetConfig;

    /// Extension-point replacements.
    fn overrides(&self) -> &Overrides;

    /// Keys this ruleset adds to the core set. Names must be unique.
    fn keys(&self) -> GameResult<KeySet> {
        Ok(KeySet::new())
    }

    /// Phases of one round, in order.
    fn phases(&self) -> &[PhaseId];

    /// Install a module for every phase in [`Ruleset::phases`].
    fn install_phases(&self, delegator: &mut PhaseDelegator) -> GameResult<()>;

    /// Initialize ruleset keys. Core keys are already set.
    fn setup(&self, _ctx: &Context) -> GameResult<()> {
        Ok(())
    }

    /// Bookkeeping after the last phase of every round, before the
    /// end-of-game check.
    fn on_round_end(&self, _ctx: &Context) -> GameResult<()> {
        Ok(())
    }

    /// Final result, computed once the game ends.
    fn outcome(&self, ctx: &Context) -> GameResult<GameOutcome> {
        GameOutcome::richest(ctx)
    }
}
