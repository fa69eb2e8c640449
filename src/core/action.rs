//! Action processors: the verbs a phase accepts.
//!
//! Every action runs the same three-step pipeline:
//!
//! 1. `assert_input` - structural check of the raw JSON payload
//! 2. `validate` - rule check against current state, with the store frozen
//! 3. `process` - apply the action; returns whether the turn ends
//!
//! A failure in step 1 or 2 leaves state untouched.
//!
//! ## Example
//!
//! ```ignore
//! struct Pass;
//!
//! impl Injectable for Pass {
//!     fn build(_ctx: &Context) -> GameResult<Self> { Ok(Pass) }
//! }
//!
//! impl ActionProcessor for Pass {
//!     const NAME: &'static str = "pass";
//!     type Data = NoData;
//!
//!     fn validate(&self, _ctx: &Context, _data: &NoData) -> GameResult<()> { Ok(()) }
//!     fn process(&self, _ctx: &Context, _data: NoData) -> GameResult<bool> { Ok(true) }
//! }
//! ```

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::context::{Context, Injectable};
use super::error::{GameError, GameResult};

/// Payload type for actions that take no arguments. Accepts `{}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoData {}

/// A named, typed action.
///
/// Processors are singletons per invocation, built through [`Injectable`].
pub trait ActionProcessor: Injectable {
    /// Wire name, unique within a phase.
    const NAME: &'static str;

    /// Decoded payload.
    type Data: DeserializeOwned;

    /// Decode and structurally check the raw payload.
    fn assert_input(&self, raw: &Value) -> GameResult<Self::Data> {
        parse_input(Self::NAME, raw)
    }

    /// Check the action is legal right now. The store is read-only here.
    fn validate(&self, ctx: &Context, data: &Self::Data) -> GameResult<()>;

    /// Apply the action. Returns `true` when the acting player's turn ends.
    fn process(&self, ctx: &Context, data: Self::Data) -> GameResult<bool>;

    /// Whether a caller may undo this action (absent randomness).
    fn reversible(&self) -> bool {
        true
    }
}

/// Decode an action payload, mapping failures to invalid input.
pub fn parse_input<T: DeserializeOwned>(action: &str, raw: &Value) -> GameResult<T> {
    T::deserialize(raw).map_err(|e| GameError::invalid_input(format!("{action}: {e}")))
}

/// What running one action produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    /// The acting player's turn is over.
    pub ends_turn: bool,
    /// The processor allows undo.
    pub reversible: bool,
}

/// Type-erased entry point for one processor.
pub type ActionRunner = fn(&Context, &Value) -> GameResult<ActionOutcome>;

fn run_action<A: ActionProcessor>(ctx: &Context, raw: &Value) -> GameResult<ActionOutcome> {
    let processor = ctx.inject::<A>()?;
    let data = processor.assert_input(raw)?;
    ctx.read_only(|| processor.validate(ctx, &data))?;
    debug!(action = A::NAME, "processing action");
    let ends_turn = processor.process(ctx, data)?;
    Ok(ActionOutcome {
        ends_turn,
        reversible: processor.reversible(),
    })
}

#[derive(Clone, Copy)]
struct ActionEntry {
    type_id: TypeId,
    run: ActionRunner,
}

/// The actions one phase accepts, keyed by name.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    entries: BTreeMap<&'static str, ActionEntry>,
}

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a processor. Installing two processors under one name fails.
    pub fn install<A: ActionProcessor>(&mut self) -> GameResult<&mut Self> {
        let type_id = TypeId::of::<A>();
        if let Some(existing) = self.entries.get(A::NAME) {
            if existing.type_id != type_id {
                return Err(GameError::invariant(format!(
                    "action '{}' installed twice with different processors",
                    A::NAME
                )));
            }
        }
        self.entries.insert(
            A::NAME,
            ActionEntry {
                type_id,
                run: run_action::<A>,
            },
        );
        Ok(self)
    }

    /// Whether an action name is installed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether this exact processor is installed.
    #[must_use]
    pub fn contains_processor<A: ActionProcessor>(&self) -> bool {
        self.entries
            .get(A::NAME)
            .is_some_and(|entry| entry.type_id == TypeId::of::<A>())
    }

    /// Entry point for an action name.
    #[must_use]
    pub fn runner(&self, name: &str) -> Option<ActionRunner> {
        self.entries.get(name).map(|entry| entry.run)
    }

    /// Installed names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Number of installed actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// An action name and payload, as produced by forced and automatic actions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionBundle {
    /// Action name.
    pub action: String,
    /// Raw payload.
    pub data: Value,
}

impl ActionBundle {
    /// Bundle a typed payload.
    pub fn new<T: Serialize>(action: impl Into<String>, data: &T) -> GameResult<Self> {
        let action = action.into();
        let data = serde_json::to_value(data)
            .map_err(|e| GameError::invariant(format!("{action}: payload not encodable: {e}")))?;
        Ok(Self { action, data })
    }

    /// Bundle an action with an empty payload.
    pub fn empty(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            data: Value::Object(serde_json::Map::new()),
        }
    }
}

/// Per-player standing instructions the engine acts on without input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAction {
    /// Keep bidding up to this amount, then pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_until: Option<i64>,
    /// Pass (or finish) the next turn without asking.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pass_next: bool,
}

impl AutoAction {
    /// Whether no instruction is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bid_until.is_none() && !self.pass_next
    }
}
