//! Error taxonomy for the engine.
//!
//! ## Kinds
//!
//! - **InvalidInput**: user-correctable. Raised by `assert_input` or
//!   `validate`; state is untouched.
//! - **Permission**: the action is not legal for this caller right now
//!   (not installed in the active phase, wrong acting user).
//! - **Invariant**: a core or ruleset bug. Never retried, never swallowed.
//! - **Undo**: a caller-level undo/retry failed a consistency check.
//!
//! Reaching the end of the game is not an error.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type GameResult<T> = Result<T, GameError>;

/// Coarse classification of a [`GameError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or illegal input.
    InvalidInput,
    /// Caller not allowed to perform the action.
    Permission,
    /// Internal invariant broken.
    Invariant,
    /// Undo/retry consistency failure.
    Undo,
}

/// Why an undo or retry request was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UndoError {
    /// The caller's view of the game is stale.
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version the caller believed was current.
        expected: u64,
        /// Version actually stored.
        found: u64,
    },

    /// The most recent action consumed randomness or declared itself final.
    #[error("action at version {0} cannot be undone")]
    NotReversible(u64),

    /// Nothing to undo or replay.
    #[error("no matching history")]
    NoHistory,
}

/// Engine error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    /// User-correctable validation failure.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Action not permitted for this caller or phase.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Internal invariant violation.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Undo/retry rejected.
    #[error("undo rejected: {0}")]
    Undo(#[from] UndoError),
}

impl GameError {
    /// Build an [`GameError::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Build a [`GameError::Permission`].
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    /// Build a [`GameError::Invariant`].
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidInput(_) => ErrorKind::InvalidInput,
            GameError::Permission(_) => ErrorKind::Permission,
            GameError::Invariant(_) => ErrorKind::Invariant,
            GameError::Undo(_) => ErrorKind::Undo,
        }
    }

    /// Whether the caller may reasonably report this to a user and carry on.
    ///
    /// Invariant violations are fatal for the call.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Invariant
    }
}

/// Return an invalid-input error unless `cond` holds.
pub fn ensure_input(cond: bool, msg: impl FnOnce() -> String) -> GameResult<()> {
    if cond {
        Ok(())
    } else {
        Err(GameError::InvalidInput(msg()))
    }
}

/// Return an invariant error unless `cond` holds.
pub fn ensure_invariant(cond: bool, msg: impl FnOnce() -> String) -> GameResult<()> {
    if cond {
        Ok(())
    } else {
        Err(GameError::Invariant(msg()))
    }
}
