//! Engine entry point and the caller-facing result types.

#[allow(clippy::module_inception)]
mod engine;
pub mod game_state;
pub mod history;

pub use engine::Engine;
pub use game_state::GameState;
pub use history::{check_undo, History, HistoryEntry, RecordedAction};
