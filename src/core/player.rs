//! Players, seats, and colors.
//!
//! ## PlayerId
//!
//! The caller-supplied user identifier. The engine never interprets it
//! beyond equality.
//!
//! ## PlayerColor
//!
//! In-game identity. Turn order, the current player, and every per-player
//! table are keyed by color.
//!
//! ## PlayerHelper
//!
//! Injectable service with the lookups and mutations every phase needs.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::context::{Context, Injectable};
use super::error::{GameError, GameResult};
use super::keys::{CURRENT_PLAYER, PLAYERS, TURN_ORDER};
use super::state::ComposedState;

/// Caller-supplied user identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User {}", self.0)
    }
}

/// Seat color. Declaration order is the default seating order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Black,
}

impl PlayerColor {
    /// Every color, in seating order.
    pub const ALL: [PlayerColor; 6] = [
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Yellow,
        PlayerColor::Purple,
        PlayerColor::Black,
    ];

    /// Display name, as used in log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PlayerColor::Red => "Red",
            PlayerColor::Blue => "Blue",
            PlayerColor::Green => "Green",
            PlayerColor::Yellow => "Yellow",
            PlayerColor::Purple => "Purple",
            PlayerColor::Black => "Black",
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Player order for one phase. Inline for typical table sizes.
pub type PlayerOrder = SmallVec<[PlayerColor; 6]>;

/// One seat at the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Owning user.
    pub player_id: PlayerId,
    /// Seat color.
    pub color: PlayerColor,
    /// Cash on hand. May dip below zero until round-end checks run.
    pub money: i64,
    /// Eliminated players keep their seat but take no more turns.
    pub out_of_game: bool,
}

impl Player {
    /// A fresh seat.
    #[must_use]
    pub fn new(player_id: PlayerId, color: PlayerColor, money: i64) -> Self {
        Self {
            player_id,
            color,
            money,
            out_of_game: false,
        }
    }
}

/// Rejects duplicate colors or users in the `players` slot.
#[allow(clippy::ptr_arg)]
pub(crate) fn validate_players(players: &Vec<Player>) -> Result<(), String> {
    for (i, player) in players.iter().enumerate() {
        for other in &players[i + 1..] {
            if player.color == other.color {
                return Err(format!("color {} seated twice", player.color));
            }
            if player.player_id == other.player_id {
                return Err(format!("{} seated twice", player.player_id));
            }
        }
    }
    Ok(())
}

/// Player lookups and mutations.
pub struct PlayerHelper {
    current: ComposedState<Option<Player>>,
}

impl Injectable for PlayerHelper {
    fn build(_ctx: &Context) -> GameResult<Self> {
        let current = ComposedState::from2(PLAYERS, CURRENT_PLAYER, |_, players, current| {
            current.and_then(|color| players.iter().find(|p| p.color == color).cloned())
        });
        Ok(Self { current })
    }
}

impl PlayerHelper {
    /// All seats, in seating order.
    pub fn players(&self, ctx: &Context) -> GameResult<Rc<Vec<Player>>> {
        ctx.state(PLAYERS).get()
    }

    /// The seat whose turn it is, if any.
    pub fn current(&self, ctx: &Context) -> GameResult<Rc<Option<Player>>> {
        self.current.get(ctx)
    }

    /// Color of the current player, if any.
    pub fn current_color(&self, ctx: &Context) -> GameResult<Option<PlayerColor>> {
        Ok(*ctx.state(CURRENT_PLAYER).get()?)
    }

    /// The current player, failing if nobody is acting.
    pub fn require_current(&self, ctx: &Context) -> GameResult<Player> {
        self.current(ctx)?
            .as_ref()
            .clone()
            .ok_or_else(|| GameError::invariant("no current player"))
    }

    /// Look up a seat by color.
    pub fn get(&self, ctx: &Context, color: PlayerColor) -> GameResult<Player> {
        self.players(ctx)?
            .iter()
            .find(|p| p.color == color)
            .cloned()
            .ok_or_else(|| GameError::invariant(format!("no player seated as {color}")))
    }

    /// Look up a seat by owning user.
    pub fn by_user(&self, ctx: &Context, user: PlayerId) -> GameResult<Option<Player>> {
        Ok(self.players(ctx)?.iter().find(|p| p.player_id == user).cloned())
    }

    /// Mutate one seat.
    pub fn update(&self, ctx: &Context, color: PlayerColor, f: impl FnOnce(&mut Player)) -> GameResult<()> {
        // Fail before touching the slot so a missing seat never becomes a no-op write.
        self.get(ctx, color)?;
        ctx.state(PLAYERS).update(|players| {
            if let Some(player) = players.iter_mut().find(|p| p.color == color) {
                f(player);
            }
        })
    }

    /// Add `delta` to a player's money and return the new balance.
    pub fn adjust_money(&self, ctx: &Context, color: PlayerColor, delta: i64) -> GameResult<i64> {
        self.update(ctx, color, |p| p.money += delta)?;
        Ok(self.get(ctx, color)?.money)
    }

    /// Remove a player from future turns.
    pub fn eliminate(&self, ctx: &Context, color: PlayerColor) -> GameResult<()> {
        self.update(ctx, color, |p| p.out_of_game = true)
    }

    /// The round's turn order, eliminated players included.
    pub fn turn_order(&self, ctx: &Context) -> GameResult<Rc<Vec<PlayerColor>>> {
        ctx.state(TURN_ORDER).get()
    }

    /// Turn order without eliminated players.
    pub fn in_game_order(&self, ctx: &Context) -> GameResult<PlayerOrder> {
        let players = self.players(ctx)?;
        let order = self.turn_order(ctx)?;
        Ok(order
            .iter()
            .copied()
            .filter(|color| players.iter().any(|p| p.color == *color && !p.out_of_game))
            .collect())
    }
}
