//! Undo and retry support for the persistence layer.
//!
//! The engine itself keeps no history. A caller that stores every snapshot
//! and every applied action can:
//!
//! - **undo** the most recent action by restoring the snapshot before it,
//!   provided that action was reversible and the caller's version matches
//! - **retry** by replaying recorded actions against an earlier snapshot
//!   with [`Engine::replay`](super::Engine::replay)
//!
//! [`History`] is an in-memory model of that bookkeeping; [`check_undo`]
//! holds the consistency rules on their own.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{GameResult, UndoError};
use crate::core::player::PlayerId;

use super::game_state::GameState;

/// One applied action, exactly as it was submitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAction {
    pub action_name: String,
    pub action_data: Value,
    /// Submitting user, when the call was attributed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<PlayerId>,
}

impl RecordedAction {
    /// An unattributed action.
    pub fn new(action_name: impl Into<String>, action_data: Value) -> Self {
        Self {
            action_name: action_name.into(),
            action_data,
            user_id: None,
        }
    }

    /// An action submitted by `user`.
    pub fn by(user: PlayerId, action_name: impl Into<String>, action_data: Value) -> Self {
        Self {
            user_id: Some(user),
            ..Self::new(action_name, action_data)
        }
    }
}

/// A stored transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Version this action produced (1-based).
    pub version: u64,
    pub action: RecordedAction,
    /// Snapshot before the action.
    pub before: String,
    /// Snapshot after the action.
    pub after: String,
    pub reversible: bool,
}

/// Check that the latest entry of `history` may be undone by a caller who
/// believes the current version is `expected_version`.
pub fn check_undo(history: &[HistoryEntry], expected_version: u64) -> GameResult<&HistoryEntry> {
    let last = history.last().ok_or(UndoError::NoHistory)?;
    if last.version != expected_version {
        return Err(UndoError::VersionMismatch {
            expected: expected_version,
            found: last.version,
        }
        .into());
    }
    if !last.reversible {
        return Err(UndoError::NotReversible(last.version).into());
    }
    Ok(last)
}

/// Snapshots and actions of one game, version by version.
#[derive(Clone, Debug, PartialEq)]
pub struct History {
    initial: String,
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Start a history from the state `Engine::start` returned.
    #[must_use]
    pub fn new(initial: &GameState) -> Self {
        Self {
            initial: initial.game_data.clone(),
            entries: Vec::new(),
        }
    }

    /// Current version: the number of applied actions.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.entries.len() as u64
    }

    /// Snapshot at version 0.
    #[must_use]
    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// Latest snapshot.
    #[must_use]
    pub fn current(&self) -> &str {
        self.entries.last().map_or(&self.initial, |entry| &entry.after)
    }

    /// Record an applied action and the state it produced. Returns the new
    /// version.
    pub fn record(&mut self, action: RecordedAction, result: &GameState) -> u64 {
        let version = self.version() + 1;
        let before = self.current().to_string();
        self.entries.push(HistoryEntry {
            version,
            action,
            before,
            after: result.game_data.clone(),
            reversible: result.reversible,
        });
        version
    }

    /// Drop the latest action and return it. The caller resumes from
    /// `entry.before`.
    pub fn undo(&mut self, expected_version: u64) -> GameResult<HistoryEntry> {
        check_undo(&self.entries, expected_version)?;
        self.entries.pop().ok_or_else(|| UndoError::NoHistory.into())
    }

    /// Every entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Recorded actions, oldest first, for replay from [`History::initial`].
    pub fn actions(&self) -> impl Iterator<Item = &RecordedAction> {
        self.entries.iter().map(|entry| &entry.action)
    }
}
