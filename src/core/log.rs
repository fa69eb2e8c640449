//! Human-readable game log for one invocation.
//!
//! Lines are returned to the caller alongside the new snapshot and are not
//! part of game state. Each line is also emitted as a `debug` trace event.

use std::cell::RefCell;

use tracing::debug;

use super::context::{Context, Injectable};
use super::error::GameResult;
use super::player::{PlayerColor, PlayerHelper};

/// Collected log lines.
#[derive(Debug, Default)]
pub struct Log {
    lines: RefCell<Vec<String>>,
}

impl Injectable for Log {
    fn build(_ctx: &Context) -> GameResult<Self> {
        Ok(Self::default())
    }
}

impl Log {
    /// Append a line.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "game_log", "{message}");
        self.lines.borrow_mut().push(message);
    }

    /// Append a line attributed to `color`.
    pub fn player(&self, color: PlayerColor, message: impl AsRef<str>) {
        self.log(format!("{color} {}", message.as_ref()));
    }

    /// Append a line attributed to the current player, or unattributed if
    /// nobody is acting.
    pub fn current_player(&self, ctx: &Context, message: impl AsRef<str>) -> GameResult<()> {
        match ctx.inject::<PlayerHelper>()?.current_color(ctx)? {
            Some(color) => self.player(color, message),
            None => self.log(message.as_ref()),
        }
        Ok(())
    }

    /// Lines so far, oldest first.
    #[must_use]
    pub fn dump(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Number of lines so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    /// Drop every line after the first `len`.
    pub fn truncate(&self, len: usize) {
        self.lines.borrow_mut().truncate(len);
    }

    /// Whether nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_lines() {
        let log = Log::default();
        assert!(log.is_empty());

        log.log("Round 1 begins");
        log.player(PlayerColor::Red, "bids 3");
        assert_eq!(log.dump(), vec!["Round 1 begins", "Red bids 3"]);
        assert_eq!(log.len(), 2);

        log.truncate(1);
        assert_eq!(log.dump(), vec!["Round 1 begins"]);
    }
}
