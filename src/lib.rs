//! # rust-tile-engine
//!
//! A deterministic rules engine for turn-based, tile-laying economic games.
//!
//! ## Design Principles
//!
//! 1. **Snapshot In, Snapshot Out**: Every call opens a fresh [`Context`]
//!    from an opaque snapshot string, runs one unit of logic, and returns a
//!    new snapshot. Nothing survives between calls.
//!
//! 2. **Determinism**: `process_action(map, snapshot, name, data)` is a pure
//!    function of its inputs. The seeded RNG position is part of the
//!    snapshot, so replaying recorded actions reproduces every draw.
//!
//! 3. **Configuration Over Inheritance**: Rulesets install phase modules and
//!    override extension points through a table; the core never branches on
//!    which map is being played.
//!
//! ## Architecture
//!
//! - **Keys and the store**: typed `const` [`Key`]s name slots in a
//!   persistent `im` map, each with a version. Composed values are memoized
//!   on the versions of the slots they read.
//!
//! - **Context services**: per-call singletons built on first use through
//!   [`Injectable`]; cycles are invariant violations.
//!
//! - **Phases**: a round is an ordered list of phases. Each phase module
//!   decides turn order and which actions it accepts; the phase engine
//!   drives transitions and forced/automatic actions in a bounded loop.
//!
//! ## Modules
//!
//! - `core`: keys, store, context, players, actions, RNG, log, errors
//! - `phases`: phase modules, the delegator and the phase engine
//! - `rules`: the `Ruleset` trait, extension points and the registry
//! - `engine`: the stateless entry point and undo/replay helpers
//! - `games`: the reference `rails` ruleset
//!
//! ## Example
//!
//! ```
//! use rust_tile_engine::{Engine, PlayerId, StartConfig};
//!
//! let engine = Engine::builtin().unwrap();
//! let players = [PlayerId::new(1), PlayerId::new(2)];
//! let state = engine.start(&players, &StartConfig::new("rails").with_seed(7)).unwrap();
//! assert!(!state.is_ended());
//!
//! let next = engine
//!     .process_action("rails", &state.game_data, "bid", &serde_json::json!({"amount": 1}))
//!     .unwrap();
//! assert_ne!(next.active_player_id, state.active_player_id);
//! ```

pub mod core;
pub mod engine;
pub mod games;
pub mod phases;
pub mod rules;

// Re-export commonly used types
pub use crate::core::{
    ActionBundle, ActionProcessor, ActionRegistry, AutoAction, NoData,
    EngineConfig, PhaseId, RulesetConfig, StartConfig,
    Context, ExtensionPoint, Injectable, Overrides,
    ErrorKind, GameError, GameResult, UndoError,
    Key, KeySet, GameStatus, Log,
    Player, PlayerColor, PlayerHelper, PlayerId,
    GameRng, GameRngState, Random,
    ComposedState, State, StateStore,
};

pub use crate::engine::{check_undo, Engine, GameState, History, HistoryEntry, RecordedAction};

pub use crate::phases::{PhaseDelegator, PhaseEngine, PhaseModule};

pub use crate::rules::{GameEnd, GameOutcome, Ruleset, RulesetRegistry, StartingOrder};
