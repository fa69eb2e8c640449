//! Core engine types: keys, the state store, context and services,
//! players, actions, RNG, logging, configuration and errors.
//!
//! This module contains the fundamental building blocks that are game-agnostic.
//! Rulesets configure these rather than modifying the core.

pub mod action;
pub mod config;
pub mod context;
pub mod error;
pub mod key;
pub mod keys;
pub mod log;
pub mod player;
pub mod rng;
pub mod state;
pub mod store;

pub use action::{ActionBundle, ActionOutcome, ActionProcessor, ActionRegistry, AutoAction, NoData};
pub use config::{EngineConfig, PhaseId, RulesetConfig, StartConfig};
pub use context::{Context, ExtensionPoint, Injectable, Overrides, ServiceFactory};
pub use error::{ensure_input, ensure_invariant, ErrorKind, GameError, GameResult, UndoError};
pub use key::{Key, KeyInfo, KeySet, StateValue};
pub use keys::GameStatus;
pub use log::Log;
pub use player::{Player, PlayerColor, PlayerHelper, PlayerId, PlayerOrder};
pub use rng::{GameRng, GameRngState, Random};
pub use state::{ComposedState, State};
pub use store::{ListenerId, MergeReport, Snapshot, StateStore, StoreCheckpoint};
