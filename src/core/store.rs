//! The state store: every key's current value within one invocation.
//!
//! ## Representation
//!
//! Each slot keeps the canonical JSON encoding of its value (the source of
//! truth for snapshots and equality) plus a lazily decoded `Rc<T>` cache.
//! Reads hand out the cached `Rc`, so an unchanged slot keeps its reference
//! identity across reads and across [`StateStore::merge`].
//!
//! ## Versions
//!
//! The store carries a monotonic version; every committed change stamps the
//! touched slot with the new version. Committing a value whose encoding is
//! identical to the current one is not a change.
//!
//! ## Snapshots
//!
//! [`StateStore::serialize`] produces canonical JSON (slots in name order,
//! object keys sorted), so equal stores always serialize to equal strings.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use im::OrdMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::error::{GameError, GameResult};
use super::key::{Key, StateValue};

/// Snapshot layout version written into every serialized store.
pub const SNAPSHOT_FORMAT: u32 = 1;

type AnyRc = Rc<dyn Any>;
type Decoder = Rc<dyn Fn(&Value) -> GameResult<AnyRc>>;
type ListenerFn = Rc<RefCell<dyn FnMut(Option<&dyn Any>)>>;

/// Handle returned by `listen`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[derive(Clone)]
struct Slot {
    encoded: Value,
    cached: Option<AnyRc>,
    version: u64,
}

/// Type bound to a slot name by the first key that touched it.
#[derive(Clone)]
struct Binding {
    type_id: TypeId,
    type_name: &'static str,
    decode: Decoder,
}

/// A queued change notification for one listener.
pub(crate) struct Notification {
    listener: ListenerFn,
    value: Option<AnyRc>,
}

impl Notification {
    pub(crate) fn fire(self) {
        // A listener that mutates its own key would re-enter itself; skip it.
        if let Ok(mut listener) = self.listener.try_borrow_mut() {
            (&mut *listener)(self.value.as_deref());
        }
    }
}

/// Fire queued notifications in order.
pub(crate) fn fire_all(pending: Vec<Notification>) {
    for notification in pending {
        notification.fire();
    }
}

/// Which slots a merge or restore touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Slots added or replaced.
    pub changed: Vec<String>,
    /// Slots removed.
    pub removed: Vec<String>,
}

impl MergeReport {
    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Parsed form of a serialized store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Layout version.
    pub format: u32,
    /// Slot name to encoded value.
    pub state: BTreeMap<String, Value>,
}

/// Binary framing: bincode cannot carry self-describing JSON values, so each
/// slot travels as its JSON text.
#[derive(Serialize, Deserialize)]
struct BinarySnapshot {
    format: u32,
    slots: Vec<(String, String)>,
}

impl Snapshot {
    /// Parse a snapshot string.
    pub fn parse(data: &str) -> GameResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(data)
            .map_err(|e| GameError::invariant(format!("corrupt snapshot: {e}")))?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(GameError::invariant(format!(
                "unsupported snapshot format {} (expected {SNAPSHOT_FORMAT})",
                snapshot.format
            )));
        }
        Ok(snapshot)
    }

    /// Canonical string form.
    pub fn to_canonical_string(&self) -> GameResult<String> {
        serde_json::to_string(self)
            .map_err(|e| GameError::invariant(format!("snapshot encoding failed: {e}")))
    }

    /// Compact binary form for storage.
    pub fn to_bytes(&self) -> GameResult<Vec<u8>> {
        let mut slots = Vec::with_capacity(self.state.len());
        for (name, value) in &self.state {
            let text = serde_json::to_string(value)
                .map_err(|e| GameError::invariant(format!("slot '{name}' encoding failed: {e}")))?;
            slots.push((name.clone(), text));
        }
        bincode::serialize(&BinarySnapshot {
            format: self.format,
            slots,
        })
        .map_err(|e| GameError::invariant(format!("binary snapshot encoding failed: {e}")))
    }

    /// Decode the binary form.
    pub fn from_bytes(bytes: &[u8]) -> GameResult<Self> {
        let binary: BinarySnapshot = bincode::deserialize(bytes)
            .map_err(|e| GameError::invariant(format!("corrupt binary snapshot: {e}")))?;
        let mut state = BTreeMap::new();
        for (name, text) in binary.slots {
            let value = serde_json::from_str(&text)
                .map_err(|e| GameError::invariant(format!("corrupt slot '{name}': {e}")))?;
            state.insert(name, value);
        }
        Ok(Self {
            format: binary.format,
            state,
        })
    }
}

/// Saved slot contents, restorable with [`StateStore::restore`].
///
/// Cheap to take: the slot map is persistent.
#[derive(Clone)]
pub struct StoreCheckpoint {
    slots: OrdMap<String, Slot>,
}

/// Holds the current value for every key touched in one invocation.
pub struct StateStore {
    slots: OrdMap<String, Slot>,
    bindings: FxHashMap<String, Binding>,
    listeners: BTreeMap<String, Vec<(ListenerId, ListenerFn)>>,
    pending: Vec<Notification>,
    next_listener: u64,
    version: u64,
    read_only: bool,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: OrdMap::new(),
            bindings: FxHashMap::default(),
            listeners: BTreeMap::new(),
            pending: Vec::new(),
            next_listener: 0,
            version: 0,
            read_only: false,
        }
    }

    /// Create a store holding the contents of a snapshot string.
    pub fn from_snapshot(data: &str) -> GameResult<Self> {
        let mut store = Self::new();
        store.merge(data)?;
        Ok(store)
    }

    /// Current store version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Version at which a slot last changed.
    #[must_use]
    pub fn slot_version(&self, name: &str) -> Option<u64> {
        self.slots.get(name).map(|slot| slot.version)
    }

    /// Number of initialized slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is initialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether a slot with this name is initialized.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Slot names in order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.slots.keys()
    }

    /// Encoded value of a slot.
    #[must_use]
    pub fn encoded(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).map(|slot| &slot.encoded)
    }

    // === Read-only guard ===

    /// Freeze or unfreeze the store. Writes while frozen are invariant
    /// violations.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Whether the store is frozen.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn ensure_writable(&self, name: &str) -> GameResult<()> {
        if self.read_only {
            Err(GameError::invariant(format!(
                "state '{name}' mutated while the store is read-only"
            )))
        } else {
            Ok(())
        }
    }

    // === Typed access ===

    fn bind<T: StateValue>(&mut self, key: Key<T>) -> GameResult<()> {
        match self.bindings.get(key.name()) {
            Some(binding) if binding.type_id == key.type_id() => Ok(()),
            Some(binding) => Err(GameError::invariant(format!(
                "key name collision: '{}' is bound to {} but was accessed as {}",
                key.name(),
                binding.type_name,
                std::any::type_name::<T>()
            ))),
            None => {
                let decode: Decoder = Rc::new(move |value: &Value| {
                    let decoded: AnyRc = Rc::new(decode_value(key, value)?);
                    Ok(decoded)
                });
                self.bindings.insert(
                    key.name().to_string(),
                    Binding {
                        type_id: key.type_id(),
                        type_name: std::any::type_name::<T>(),
                        decode,
                    },
                );
                Ok(())
            }
        }
    }

    /// Read a slot, or `None` if it is not initialized.
    pub fn try_get<T: StateValue>(&mut self, key: Key<T>) -> GameResult<Option<Rc<T>>> {
        self.bind(key)?;
        let Some(slot) = self.slots.get_mut(key.name()) else {
            return Ok(None);
        };

        if let Some(cached) = &slot.cached {
            return downcast(key, cached).map(Some);
        }

        let value = Rc::new(decode_value(key, &slot.encoded)?);
        let erased: AnyRc = value.clone();
        slot.cached = Some(erased);
        Ok(Some(value))
    }

    /// Read a slot. Reading before initialization is an invariant violation.
    pub fn get<T: StateValue>(&mut self, key: Key<T>) -> GameResult<Rc<T>> {
        self.try_get(key)?.ok_or_else(|| {
            GameError::invariant(format!("state '{}' read before initialization", key.name()))
        })
    }

    /// Initialize a slot. Fails if it already holds a value.
    pub fn init<T: StateValue>(&mut self, key: Key<T>, value: T) -> GameResult<()> {
        self.init_deferred(key, value)?;
        self.dispatch();
        Ok(())
    }

    /// Replace an initialized slot's value.
    pub fn set<T: StateValue>(&mut self, key: Key<T>, value: T) -> GameResult<()> {
        self.set_deferred(key, value)?;
        self.dispatch();
        Ok(())
    }

    /// Mutate a draft of the current value and commit it.
    pub fn update<T: StateValue>(&mut self, key: Key<T>, mutate: impl FnOnce(&mut T)) -> GameResult<()> {
        self.update_deferred(key, mutate)?;
        self.dispatch();
        Ok(())
    }

    /// Remove a slot. Removing an absent slot is a no-op.
    pub fn delete<T: StateValue>(&mut self, key: Key<T>) -> GameResult<()> {
        self.delete_deferred(key)?;
        self.dispatch();
        Ok(())
    }

    pub(crate) fn init_deferred<T: StateValue>(&mut self, key: Key<T>, value: T) -> GameResult<()> {
        self.bind(key)?;
        self.ensure_writable(key.name())?;
        if self.slots.contains_key(key.name()) {
            return Err(GameError::invariant(format!(
                "state '{}' initialized twice",
                key.name()
            )));
        }
        self.commit(key, value)
    }

    pub(crate) fn set_deferred<T: StateValue>(&mut self, key: Key<T>, value: T) -> GameResult<()> {
        self.bind(key)?;
        self.ensure_writable(key.name())?;
        if !self.slots.contains_key(key.name()) {
            return Err(GameError::invariant(format!(
                "state '{}' written before initialization",
                key.name()
            )));
        }
        self.commit(key, value)
    }

    pub(crate) fn update_deferred<T: StateValue>(
        &mut self,
        key: Key<T>,
        mutate: impl FnOnce(&mut T),
    ) -> GameResult<()> {
        self.ensure_writable(key.name())?;
        let current = self.get(key)?;
        let mut draft = (*current).clone();
        mutate(&mut draft);
        self.commit(key, draft)
    }

    pub(crate) fn delete_deferred<T: StateValue>(&mut self, key: Key<T>) -> GameResult<()> {
        self.bind(key)?;
        self.ensure_writable(key.name())?;
        if self.slots.remove(key.name()).is_some() {
            self.version += 1;
            self.queue(key.name(), None);
        }
        Ok(())
    }

    /// Validate, encode and store a value. Identical encodings are ignored.
    fn commit<T: StateValue>(&mut self, key: Key<T>, value: T) -> GameResult<()> {
        key.check(&value)?;
        let encoded = serde_json::to_value(&value).map_err(|e| {
            GameError::invariant(format!("state '{}' could not be encoded: {e}", key.name()))
        })?;

        if let Some(existing) = self.slots.get(key.name()) {
            if existing.encoded == encoded {
                return Ok(());
            }
        }

        self.version += 1;
        let cached: AnyRc = Rc::new(value);
        self.slots.insert(
            key.name().to_string(),
            Slot {
                encoded,
                cached: Some(cached.clone()),
                version: self.version,
            },
        );
        self.queue(key.name(), Some(cached));
        Ok(())
    }

    // === Listeners ===

    /// Subscribe to changes of one key. The callback receives the new value,
    /// or `None` when the slot is deleted.
    pub fn listen<T: StateValue>(
        &mut self,
        key: Key<T>,
        mut callback: impl FnMut(Option<&T>) + 'static,
    ) -> GameResult<ListenerId> {
        self.bind(key)?;
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;

        let listener: ListenerFn = Rc::new(RefCell::new(move |value: Option<&dyn Any>| match value {
            Some(any) => {
                if let Some(typed) = any.downcast_ref::<T>() {
                    callback(Some(typed));
                }
            }
            None => callback(None),
        }));
        self.listeners
            .entry(key.name().to_string())
            .or_default()
            .push((id, listener));
        Ok(id)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unlisten(&mut self, id: ListenerId) -> bool {
        let mut found = false;
        for listeners in self.listeners.values_mut() {
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            found |= listeners.len() != before;
        }
        found
    }

    fn queue(&mut self, name: &str, value: Option<AnyRc>) {
        if let Some(listeners) = self.listeners.get(name) {
            for (_, listener) in listeners {
                self.pending.push(Notification {
                    listener: listener.clone(),
                    value: value.clone(),
                });
            }
        }
    }

    pub(crate) fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    fn dispatch(&mut self) {
        fire_all(self.take_notifications());
    }

    // === Snapshots ===

    /// Parsed snapshot of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            format: SNAPSHOT_FORMAT,
            state: self
                .slots
                .iter()
                .map(|(name, slot)| (name.clone(), slot.encoded.clone()))
                .collect(),
        }
    }

    /// Serialize every slot into an opaque, canonical string.
    pub fn serialize(&self) -> GameResult<String> {
        self.snapshot().to_canonical_string()
    }

    /// Replace the contents with a snapshot string, touching only slots whose
    /// encoding differs. A failed merge leaves the store as it was.
    pub fn merge(&mut self, data: &str) -> GameResult<MergeReport> {
        let snapshot = Snapshot::parse(data)?;
        let report = self.apply(snapshot.state.into_iter().map(|(name, encoded)| (name, encoded, None)))?;
        self.dispatch();
        Ok(report)
    }

    /// Take a checkpoint of the slot contents.
    #[must_use]
    pub fn checkpoint(&self) -> StoreCheckpoint {
        StoreCheckpoint {
            slots: self.slots.clone(),
        }
    }

    /// Return to a checkpoint. Slots that differ are notified like a merge.
    pub fn restore(&mut self, checkpoint: StoreCheckpoint) -> GameResult<MergeReport> {
        let report = self.restore_deferred(checkpoint)?;
        self.dispatch();
        Ok(report)
    }

    pub(crate) fn restore_deferred(&mut self, checkpoint: StoreCheckpoint) -> GameResult<MergeReport> {
        self.apply(
            checkpoint
                .slots
                .into_iter()
                .map(|(name, slot)| (name, slot.encoded, slot.cached)),
        )
    }

    /// Make the store hold exactly `incoming`, keeping unchanged slots as-is.
    ///
    /// Every incoming slot is checked and decoded before anything is
    /// committed.
    fn apply(
        &mut self,
        incoming: impl Iterator<Item = (String, Value, Option<AnyRc>)>,
    ) -> GameResult<MergeReport> {
        let mut staged = Vec::new();
        let mut seen = BTreeSet::new();

        for (name, encoded, cached) in incoming {
            seen.insert(name.clone());
            if let Some(existing) = self.slots.get(&name) {
                if existing.encoded == encoded {
                    continue;
                }
            }
            self.ensure_writable(&name)?;

            let cached = match (cached, self.bindings.get(&name)) {
                (Some(cached), _) => Some(cached),
                (None, Some(binding)) => Some((binding.decode)(&encoded)?),
                (None, None) => None,
            };
            staged.push((name, encoded, cached));
        }

        let stale: Vec<String> = self
            .slots
            .keys()
            .filter(|name| !seen.contains(*name))
            .cloned()
            .collect();
        for name in &stale {
            self.ensure_writable(name)?;
        }

        let mut report = MergeReport::default();
        for (name, encoded, cached) in staged {
            self.version += 1;
            self.slots.insert(
                name.clone(),
                Slot {
                    encoded,
                    cached: cached.clone(),
                    version: self.version,
                },
            );
            self.queue(&name, cached);
            report.changed.push(name);
        }
        for name in stale {
            self.slots.remove(&name);
            self.version += 1;
            self.queue(&name, None);
            report.removed.push(name);
        }

        trace!(
            changed = report.changed.len(),
            removed = report.removed.len(),
            version = self.version,
            "store merged"
        );
        Ok(report)
    }
}

impl PartialEq for StateStore {
    fn eq(&self, other: &Self) -> bool {
        self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(other.slots.iter())
                .all(|((a_name, a), (b_name, b))| a_name == b_name && a.encoded == b.encoded)
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("version", &self.version)
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .field("read_only", &self.read_only)
            .finish()
    }
}

fn decode_value<T: StateValue>(key: Key<T>, encoded: &Value) -> GameResult<T> {
    let value: T = serde_json::from_value(encoded.clone()).map_err(|e| {
        GameError::invariant(format!("corrupt snapshot: slot '{}': {e}", key.name()))
    })?;
    key.check(&value)?;
    Ok(value)
}

fn downcast<T: StateValue>(key: Key<T>, cached: &AnyRc) -> GameResult<Rc<T>> {
    cached.clone().downcast::<T>().map_err(|_| {
        GameError::invariant(format!("state '{}' cached with a foreign type", key.name()))
    })
}
