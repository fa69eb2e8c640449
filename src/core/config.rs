//! Configuration types.
//!
//! - `PhaseId`: opaque phase identity, defined by rulesets
//! - `RulesetConfig`: static per-map parameters (player range, rounds, money)
//! - `EngineConfig`: engine-wide loop bounds
//! - `StartConfig`: what the caller passes to `Engine::start`
//!
//! The engine never hardcodes phases or colors - rulesets define them.

use serde::{Deserialize, Serialize};

use super::error::{GameError, GameResult};
use super::player::PlayerColor;

/// Opaque phase identifier. Rulesets define their own phases.
///
/// The engine doesn't interpret phase IDs - they're compared for equality
/// and ordered by the ruleset's round plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhaseId(pub u32);

impl PhaseId {
    /// Create a new phase ID.
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

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Phase({})", self.0)
    }
}

/// Static parameters of one ruleset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RulesetConfig {
    /// Human-readable map name.
    pub name: String,

    /// Fewest players allowed.
    pub min_players: usize,

    /// Most players allowed (bounded by the color palette).
    pub max_players: usize,

    /// Number of rounds before the game ends.
    pub rounds: u32,

    /// Money each player starts with.
    pub starting_money: i64,

    /// Colors assigned to players in seating order.
    pub colors: Vec<PlayerColor>,
}

impl RulesetConfig {
    /// Create a configuration with defaults: 2-6 players, 3 rounds,
    /// 10 starting money, the full color palette.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_players: 2,
            max_players: 6,
            rounds: 3,
            starting_money: 10,
            colors: PlayerColor::ALL.to_vec(),
        }
    }

    /// Set the allowed player range.
    #[must_use]
    pub fn with_players(mut self, min: usize, max: usize) -> Self {
        assert!(min > 0, "Must allow at least 1 player");
        assert!(min <= max, "Minimum players exceeds maximum");
        assert!(max <= self.colors.len(), "Not enough colors for {max} players");
        self.min_players = min;
        self.max_players = max;
        self
    }

    /// Set the number of rounds.
    #[must_use]
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        assert!(rounds > 0, "Must play at least 1 round");
        self.rounds = rounds;
        self
    }

    /// Set the starting money.
    #[must_use]
    pub fn with_starting_money(mut self, money: i64) -> Self {
        self.starting_money = money;
        self
    }

    /// Replace the color palette.
    #[must_use]
    pub fn with_colors(mut self, colors: Vec<PlayerColor>) -> Self {
        assert!(colors.len() >= self.max_players, "Not enough colors for {} players", self.max_players);
        self.colors = colors;
        self
    }

    /// Check a requested player count against the allowed range.
    pub fn check_player_count(&self, count: usize) -> GameResult<()> {
        if count < self.min_players || count > self.max_players {
            return Err(GameError::invalid_input(format!(
                "{} supports {}-{} players, got {count}",
                self.name, self.min_players, self.max_players
            )));
        }
        Ok(())
    }
}

/// Engine-wide bounds.
///
/// All engine loops are over small finite structures; these bounds turn an
/// accidental infinite loop into an invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Most phase/turn transitions processed for one input.
    pub max_transition_steps: usize,

    /// Most forced or automatic actions run for one input.
    pub max_auto_actions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_transition_steps: 1_000,
            max_auto_actions: 200,
        }
    }
}

impl EngineConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transition bound.
    #[must_use]
    pub fn with_max_transition_steps(mut self, steps: usize) -> Self {
        assert!(steps > 0, "Transition bound must be positive");
        self.max_transition_steps = steps;
        self
    }

    /// Set the automatic action bound.
    #[must_use]
    pub fn with_max_auto_actions(mut self, actions: usize) -> Self {
        self.max_auto_actions = actions;
        self
    }
}

/// Arguments to `Engine::start`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartConfig {
    /// Ruleset to play.
    pub map_key: String,

    /// RNG seed. When absent, the engine draws one from the OS.
    pub seed: Option<u64>,
}

impl StartConfig {
    /// Start a game of `map_key` with an OS-chosen seed.
    pub fn new(map_key: impl Into<String>) -> Self {
        Self {
            map_key: map_key.into(),
            seed: None,
        }
    }

    /// Fix the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
