//! Phase system: how a round is divided and who acts when.
//!
//! - `PhaseModule`: per-phase hooks, player order and accepted actions
//! - `PhaseDelegator`: the installed module for each phase
//! - `PhaseEngine`: runs transitions, forced actions and automatic actions
//! - `turn_order`: next-player arithmetic shared by modules

pub mod delegator;
pub mod engine;
pub mod module;
pub mod turn_order;

pub use delegator::{InstalledPhase, PhaseDelegator};
pub use engine::PhaseEngine;
pub use module::PhaseModule;
pub use turn_order::{next_cyclic, next_in_order};
