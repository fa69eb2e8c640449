//! Typed, named handles to slots of game state.
//!
//! Keys are plain `const` values:
//!
//! ```
//! use rust_tile_engine::core::Key;
//!
//! const ROUND: Key<u32> = Key::new("roundNumber");
//! const MONEY: Key<i64> = Key::with_validator("bank", |v| {
//!     if *v >= 0 { Ok(()) } else { Err("bank cannot go negative".into()) }
//! });
//!
//! assert_eq!(ROUND.name(), "roundNumber");
//! assert!(MONEY.check(&-1).is_err());
//! ```
//!
//! The name is the slot's identity in a snapshot. Two keys sharing a name
//! are an invariant violation: the store rejects a second type bound to the
//! same name, and [`KeySet`] rejects duplicate declarations outright.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{GameError, GameResult};

/// Values that can live in a state slot.
///
/// Blanket-implemented for every serde round-trippable, clonable type.
pub trait StateValue: Serialize + DeserializeOwned + Clone + 'static {}

impl<T: Serialize + DeserializeOwned + Clone + 'static> StateValue for T {}

/// Extra validation applied when a value is decoded or committed.
pub type Validator<T> = fn(&T) -> Result<(), String>;

/// A named, typed identity for one slot of game state.
pub struct Key<T> {
    name: &'static str,
    validator: Option<Validator<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    /// Create a key with no extra validation.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            validator: None,
            _marker: PhantomData,
        }
    }

    /// Create a key whose values must pass `validator`.
    #[must_use]
    pub const fn with_validator(name: &'static str, validator: Validator<T>) -> Self {
        Self {
            name,
            validator: Some(validator),
            _marker: PhantomData,
        }
    }

    /// The slot name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Run the validator, if any.
    ///
    /// A failing value means a corrupt snapshot or a buggy mutation, so the
    /// error is an invariant violation.
    pub fn check(&self, value: &T) -> GameResult<()> {
        match self.validator {
            Some(validate) => validate(value).map_err(|reason| {
                GameError::invariant(format!("key '{}' rejected value: {reason}", self.name))
            }),
            None => Ok(()),
        }
    }
}

impl<T: 'static> Key<T> {
    /// Type identity used to detect name collisions.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    /// Name and type, for diagnostics and [`KeySet`].
    #[must_use]
    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            name: self.name,
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.name)
    }
}

/// Name and type of a declared key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInfo {
    /// Slot name.
    pub name: &'static str,
    /// Rust type name of the slot value.
    pub type_name: &'static str,
}

/// A set of declared keys with unique names.
#[derive(Clone, Debug, Default)]
pub struct KeySet {
    keys: BTreeMap<&'static str, KeyInfo>,
}

impl KeySet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a key.
    ///
    /// Fails if another key already uses the same name.
    pub fn insert<T: 'static>(&mut self, key: Key<T>) -> GameResult<()> {
        self.insert_info(key.info())
    }

    /// Declare a key and return the set (builder form).
    pub fn with<T: 'static>(mut self, key: Key<T>) -> GameResult<Self> {
        self.insert(key)?;
        Ok(self)
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: &KeySet) -> GameResult<()> {
        for info in other.keys.values() {
            self.insert_info(*info)?;
        }
        Ok(())
    }

    fn insert_info(&mut self, info: KeyInfo) -> GameResult<()> {
        if let Some(existing) = self.keys.get(info.name) {
            return Err(GameError::invariant(format!(
                "key name '{}' declared twice ({} and {})",
                info.name, existing.type_name, info.type_name
            )));
        }
        self.keys.insert(info.name, info);
        Ok(())
    }

    /// Look up a declared key by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&KeyInfo> {
        self.keys.get(name)
    }

    /// Number of declared keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyInfo> {
        self.keys.values()
    }
}
