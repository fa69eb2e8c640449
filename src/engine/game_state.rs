//! What every engine call returns.

use serde::{Deserialize, Serialize};

use crate::core::keys::GameStatus;
use crate::core::player::PlayerId;

/// Result of one engine call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// User who must act next. `None` once the game has ended.
    pub active_player_id: Option<PlayerId>,

    /// Active or ended.
    pub game_status: GameStatus,

    /// Opaque snapshot to pass to the next call.
    pub game_data: String,

    /// Whether the action that produced this state may be undone by
    /// restoring the previous snapshot.
    pub reversible: bool,

    /// Log lines produced by this call only.
    pub logs: Vec<String>,
}

impl GameState {
    /// Whether the game is over.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.game_status == GameStatus::Ended
    }
}
