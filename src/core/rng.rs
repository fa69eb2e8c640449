//! Deterministic random number generation.
//!
//! ## Key Features
//!
//! - **Deterministic**: Same seed produces identical sequence
//! - **Serializable**: O(1) state capture and restore via the ChaCha word position
//! - **Snapshot-resident**: [`Random`] keeps the generator state in the `rng`
//!   slot, so a replayed snapshot reproduces every draw
//!
//! ```
//! use rust_tile_engine::core::GameRng;
//!
//! let mut rng = GameRng::new(42);
//! let state = rng.state();
//! let first = rng.gen_range(0..100);
//!
//! let mut restored = GameRng::from_state(&state).unwrap();
//! assert_eq!(restored.gen_range(0..100), first);
//! ```

use std::cell::Cell;
use std::ops::Range;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::context::{Context, Injectable};
use super::error::{GameError, GameResult};
use super::keys::RNG;

/// Deterministic RNG.
///
/// Uses ChaCha8 for speed while maintaining high-quality randomness.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Generate a random integer in the given range.
    pub fn gen_range(&mut self, range: Range<u32>) -> u32 {
        self.inner.gen_range(range)
    }

    /// Generate a random usize in the given range.
    pub fn gen_range_usize(&mut self, range: Range<usize>) -> usize {
        self.inner.gen_range(range)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.inner);
    }

    /// Choose a random element from a slice.
    #[must_use]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        slice.choose(&mut self.inner)
    }

    /// Get the current state for serialization.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        GameRngState {
            seed: self.seed,
            // One draw consumes a handful of words; a game never gets near u64::MAX.
            word_pos: u64::try_from(self.inner.get_word_pos()).unwrap_or(u64::MAX),
        }
    }

    /// Restore from a saved state.
    pub fn from_state(state: &GameRngState) -> GameResult<Self> {
        if state.word_pos == u64::MAX {
            return Err(GameError::invariant("rng word position overflowed"));
        }
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(u128::from(state.word_pos));
        Ok(Self {
            inner,
            seed: state.seed,
        })
    }
}

/// Serializable RNG state stored in the `rng` slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRngState {
    /// Original seed
    pub seed: u64,
    /// ChaCha8 word position
    pub word_pos: u64,
}

/// The only source of randomness available to game logic.
///
/// Every draw writes the advanced generator state back into the `rng` slot
/// and marks the invocation as having consumed randomness, which makes the
/// resulting action irreversible.
///
/// The generator is reloaded from the slot for every draw, so a restored
/// checkpoint also rewinds the generator.
pub struct Random {
    consumed: Cell<bool>,
}

impl Injectable for Random {
    fn build(_ctx: &Context) -> GameResult<Self> {
        Ok(Self {
            consumed: Cell::new(false),
        })
    }
}

impl Random {
    /// Initialize the `rng` slot. Called once when a game starts.
    pub fn seed(&self, ctx: &Context, seed: u64) -> GameResult<()> {
        ctx.state(RNG).init(GameRng::new(seed).state())
    }

    /// Whether any draw happened during this invocation.
    #[must_use]
    pub fn consumed(&self) -> bool {
        self.consumed.get()
    }

    /// Return the consumed flag to an earlier reading, after the draws
    /// since then were rolled back with the store.
    pub(crate) fn rewind(&self, consumed: bool) {
        self.consumed.set(consumed);
    }

    fn draw_with<R>(&self, ctx: &Context, f: impl FnOnce(&mut GameRng) -> R) -> GameResult<R> {
        let mut rng = GameRng::from_state(&*ctx.state(RNG).get()?)?;
        let result = f(&mut rng);
        let state = rng.state();
        trace!(word_pos = state.word_pos, "random draw");
        ctx.state(RNG).set(state)?;
        self.consumed.set(true);
        Ok(result)
    }

    /// Uniform integer in `range`. An empty range is an invariant violation.
    pub fn gen_range(&self, ctx: &Context, range: Range<u32>) -> GameResult<u32> {
        if range.is_empty() {
            return Err(GameError::invariant(format!("empty random range {range:?}")));
        }
        self.draw_with(ctx, |rng| rng.gen_range(range))
    }

    /// Roll a die with `sides` faces: a value in `1..=sides`.
    pub fn roll_die(&self, ctx: &Context, sides: u32) -> GameResult<u32> {
        if sides == 0 {
            return Err(GameError::invariant("die with no sides"));
        }
        self.draw_with(ctx, |rng| rng.gen_range(0..sides) + 1)
    }

    /// Shuffle in place.
    pub fn shuffle<T>(&self, ctx: &Context, items: &mut [T]) -> GameResult<()> {
        self.draw_with(ctx, |rng| rng.shuffle(items))
    }

    /// Pick one element, or `None` for an empty slice (no draw happens).
    pub fn choose<T: Clone>(&self, ctx: &Context, items: &[T]) -> GameResult<Option<T>> {
        if items.is_empty() {
            return Ok(None);
        }
        self.draw_with(ctx, |rng| rng.choose(items).cloned())
    }

    /// Remove and return a random element, or `None` for an empty bag.
    pub fn draw<T>(&self, ctx: &Context, bag: &mut Vec<T>) -> GameResult<Option<T>> {
        if bag.is_empty() {
            return Ok(None);
        }
        let len = bag.len();
        let index = self.draw_with(ctx, |rng| rng.gen_range_usize(0..len))?;
        Ok(Some(bag.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = GameRng::new(42);
        let mut rng2 = GameRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.gen_range(0..1000), rng2.gen_range(0..1000));
        }
    }

    #[test]
    fn test_different_seeds() {
        let mut rng1 = GameRng::new(1);
        let mut rng2 = GameRng::new(2);

        let seq1: Vec<_> = (0..10).map(|_| rng1.gen_range(0..1000)).collect();
        let seq2: Vec<_> = (0..10).map(|_| rng2.gen_range(0..1000)).collect();

        assert_ne!(seq1, seq2);
    }

    #[test]
    fn test_shuffle() {
        let mut rng = GameRng::new(42);
        let mut data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        rng.shuffle(&mut data);

        data.sort();
        assert_eq!(data, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_choose() {
        let mut rng = GameRng::new(42);
        let items = vec![1, 2, 3, 4, 5];

        let chosen = rng.choose(&items);
        assert!(chosen.is_some());
        assert!(items.contains(chosen.unwrap()));

        let empty: Vec<i32> = vec![];
        assert!(rng.choose(&empty).is_none());
    }

    #[test]
    fn test_state_serialization() {
        let mut rng = GameRng::new(42);

        for _ in 0..100 {
            rng.gen_range(0..1000);
        }

        let state = rng.state();
        let expected: Vec<_> = (0..10).map(|_| rng.gen_range(0..1000)).collect();

        let mut restored = GameRng::from_state(&state).unwrap();
        let actual: Vec<_> = (0..10).map(|_| restored.gen_range(0..1000)).collect();

        assert_eq!(expected, actual);
    }

    #[test]
    fn test_state_serde() {
        let state = GameRngState {
            seed: 42,
            word_pos: 12345,
        };

        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"seed":42,"wordPos":12345}"#);
        let deserialized: GameRngState = serde_json::from_str(&json).unwrap();

        assert_eq!(state, deserialized);
    }
}
