//! State owned by the rails ruleset.

use serde::{Deserialize, Serialize};

use crate::core::error::GameResult;
use crate::core::key::{Key, KeySet};
use crate::core::player::PlayerColor;

use super::board::{Board, Goods, BOARD_RADIUS};

/// Progress of the current auction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionState {
    pub high_bid: i64,
    pub high_bidder: Option<PlayerColor>,
    /// Players who passed, in the order they passed.
    pub passed: Vec<PlayerColor>,
}

pub const BOARD: Key<Board> = Key::with_validator("board", |board| {
    if !(0..=BOARD_RADIUS).contains(&board.radius) {
        return Err(format!("board radius {} outside 0..={BOARD_RADIUS}", board.radius));
    }
    for pair in board.tiles.windows(2) {
        if (pair[0].q, pair[0].r) >= (pair[1].q, pair[1].r) {
            return Err(format!("tile ({}, {}) out of order", pair[1].q, pair[1].r));
        }
    }
    match board.tiles.iter().find(|t| !board.contains(t.q, t.r)) {
        Some(t) => Err(format!("tile ({}, {}) is off the board", t.q, t.r)),
        None => Ok(()),
    }
});

pub const AUCTION: Key<AuctionState> = Key::new("auction");

/// Tiles the current player has built this turn.
pub const BUILDS_THIS_TURN: Key<u32> = Key::with_validator("buildsThisTurn", |builds| {
    if *builds <= 2 {
        Ok(())
    } else {
        Err("at most two builds per turn".into())
    }
});

pub const GOODS_BAG: Key<Vec<Goods>> = Key::new("goodsBag");

/// Sub-round of the deliver phase.
pub const DELIVER_ROUND: Key<u32> = Key::with_validator("deliverRound", |round| {
    if (1..=2).contains(round) {
        Ok(())
    } else {
        Err(format!("deliver round {round} out of range"))
    }
});

/// Every key the ruleset declares.
pub fn rails_keys() -> GameResult<KeySet> {
    KeySet::new()
        .with(BOARD)?
        .with(AUCTION)?
        .with(BUILDS_THIS_TURN)?
        .with(GOODS_BAG)?
        .with(DELIVER_ROUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keys::core_keys;

    #[test]
    fn test_keys_do_not_collide_with_core() {
        let mut keys = core_keys().unwrap();
        keys.extend(&rails_keys().unwrap()).unwrap();
        assert_eq!(keys.len(), 13);
    }

    #[test]
    fn test_board_validator() {
        let mut board = Board::new(3);
        board.place(0, 0, PlayerColor::Red);
        board.place(1, 0, PlayerColor::Red);
        assert!(BOARD.check(&board).is_ok());

        board.tiles.reverse();
        assert!(BOARD.check(&board).is_err());
    }

    #[test]
    fn test_board_radius_is_bounded() {
        for radius in [-1, i32::MIN, BOARD_RADIUS + 1] {
            let err = BOARD.check(&Board::new(radius)).unwrap_err();
            assert_eq!(err.kind(), crate::core::error::ErrorKind::Invariant);
        }
        assert!(BOARD.check(&Board::new(0)).is_ok());
    }

    #[test]
    fn test_auction_encoding() {
        let auction = AuctionState {
            high_bid: 3,
            high_bidder: Some(PlayerColor::Blue),
            passed: vec![PlayerColor::Red],
        };
        assert_eq!(
            serde_json::to_value(&auction).unwrap(),
            serde_json::json!({"highBid": 3, "highBidder": "Blue", "passed": ["Red"]})
        );
    }
}
