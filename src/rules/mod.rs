//! Rulesets: the per-map definition of a game.
//!
//! A ruleset supplies:
//! - Static configuration (player range, rounds, money)
//! - Its own state keys
//! - The phase plan for one round and the modules implementing it
//! - Overrides for engine extension points
//!
//! The core engine calls into `Ruleset` but never interprets
//! game-specific concepts directly.

pub mod extensions;
pub mod registry;
pub mod ruleset;

#[cfg(test)]
pub(crate) mod testing;

pub use extensions::{GameEnd, GameEndCheck, RandomOrder, RoundLimit, SeatingOrder, StartingOrder, StartingOrderPolicy};
pub use registry::RulesetRegistry;
pub use ruleset::{GameOutcome, Ruleset};
