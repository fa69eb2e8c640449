//! Typed access to the store, and derived state.
//!
//! ## State
//!
//! `ctx.state(KEY)` returns a short-lived accessor bound to the context.
//! Services keep the `const` key and ask for an accessor when they need one.
//!
//! ## ComposedState
//!
//! A value derived from one or more slots through a reducer. The reducer
//! receives its own previous output and reruns only when some dependency's
//! slot version has moved, so repeated reads of an unchanged derivation
//! return the same `Rc`.

use std::cell::RefCell;
use std::rc::Rc;

use super::context::Context;
use super::error::GameResult;
use super::key::{Key, StateValue};
use super::store::ListenerId;

/// Accessor for one key within one context.
pub struct State<'c, T> {
    ctx: &'c Context,
    key: Key<T>,
}

impl<'c, T: StateValue> State<'c, T> {
    pub(crate) fn new(ctx: &'c Context, key: Key<T>) -> Self {
        Self { ctx, key }
    }

    /// The underlying key.
    #[must_use]
    pub fn key(&self) -> Key<T> {
        self.key
    }

    /// Current value. Reading an uninitialized slot is an invariant violation.
    pub fn get(&self) -> GameResult<Rc<T>> {
        self.ctx.with_store(|store| store.get(self.key))
    }

    /// Current value, or `None` if uninitialized.
    pub fn try_get(&self) -> GameResult<Option<Rc<T>>> {
        self.ctx.with_store(|store| store.try_get(self.key))
    }

    /// Whether the slot holds a value.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.ctx.slot_version(self.key.name()).is_some()
    }

    /// Version of the slot, or `None` if uninitialized.
    #[must_use]
    pub fn version(&self) -> Option<u64> {
        self.ctx.slot_version(self.key.name())
    }

    /// Give the slot its first value.
    pub fn init(&self, value: T) -> GameResult<()> {
        self.ctx.with_store(|store| store.init_deferred(self.key, value))
    }

    /// Replace the value.
    pub fn set(&self, value: T) -> GameResult<()> {
        self.ctx.with_store(|store| store.set_deferred(self.key, value))
    }

    /// Mutate a draft of the value and commit it.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> GameResult<()> {
        self.ctx.with_store(|store| store.update_deferred(self.key, mutate))
    }

    /// Remove the slot.
    pub fn delete(&self) -> GameResult<()> {
        self.ctx.with_store(|store| store.delete_deferred(self.key))
    }

    /// Subscribe to changes.
    pub fn listen(&self, callback: impl FnMut(Option<&T>) + 'static) -> GameResult<ListenerId> {
        self.ctx.with_store(|store| store.listen(self.key, callback))
    }

    /// Unsubscribe.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        self.ctx
            .with_store(|store| Ok(store.unlisten(id)))
            .unwrap_or(false)
    }
}

type Reducer<T> = Box<dyn Fn(Option<&T>, &Context) -> GameResult<T>>;

struct Memo<T> {
    versions: Vec<Option<u64>>,
    value: Rc<T>,
}

/// A value derived from other slots.
pub struct ComposedState<T> {
    deps: Vec<&'static str>,
    reducer: Reducer<T>,
    memo: RefCell<Option<Memo<T>>>,
    subscribers: RefCell<Vec<Box<dyn FnMut(&T)>>>,
}

impl<T: 'static> ComposedState<T> {
    /// Derive from the named slots with a reducer that reads them itself.
    pub fn new(
        deps: Vec<&'static str>,
        reducer: impl Fn(Option<&T>, &Context) -> GameResult<T> + 'static,
    ) -> Self {
        Self {
            deps,
            reducer: Box::new(reducer),
            memo: RefCell::new(None),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Derive from one key.
    pub fn from1<A: StateValue>(a: Key<A>, reduce: impl Fn(Option<&T>, &A) -> T + 'static) -> Self {
        Self::new(vec![a.name()], move |previous, ctx| {
            let a = ctx.state(a).get()?;
            Ok(reduce(previous, &a))
        })
    }

    /// Derive from two keys.
    pub fn from2<A: StateValue, B: StateValue>(
        a: Key<A>,
        b: Key<B>,
        reduce: impl Fn(Option<&T>, &A, &B) -> T + 'static,
    ) -> Self {
        Self::new(vec![a.name(), b.name()], move |previous, ctx| {
            let a = ctx.state(a).get()?;
            let b = ctx.state(b).get()?;
            Ok(reduce(previous, &a, &b))
        })
    }

    /// Names of the slots this value depends on.
    #[must_use]
    pub fn dependencies(&self) -> &[&'static str] {
        &self.deps
    }

    /// Current derived value, recomputed only if a dependency changed.
    pub fn get(&self, ctx: &Context) -> GameResult<Rc<T>> {
        let versions: Vec<Option<u64>> = self.deps.iter().map(|name| ctx.slot_version(name)).collect();

        let previous = match self.memo.borrow().as_ref() {
            Some(memo) if memo.versions == versions => return Ok(memo.value.clone()),
            Some(memo) => Some(memo.value.clone()),
            None => None,
        };

        let value = Rc::new((self.reducer)(previous.as_deref(), ctx)?);
        *self.memo.borrow_mut() = Some(Memo {
            versions,
            value: value.clone(),
        });

        for subscriber in self.subscribers.borrow_mut().iter_mut() {
            subscriber(&value);
        }
        Ok(value)
    }

    /// Call `callback` with every recomputed value.
    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) {
        self.subscribers.borrow_mut().push(Box::new(callback));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;

    use crate::core::config::EngineConfig;
    use crate::core::error::ErrorKind;
    use crate::rules::testing::EmptyRuleset;

    const COUNT: Key<u32> = Key::new("count");
    const LABEL: Key<String> = Key::new("label");

    fn context() -> Context {
        Context::new(Arc::new(EmptyRuleset::default()), EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_accessor_lifecycle() {
        let ctx = context();
        let count = ctx.state(COUNT);

        assert!(!count.is_initialized());
        assert_eq!(count.try_get().unwrap(), None);
        assert_eq!(count.get().unwrap_err().kind(), ErrorKind::Invariant);

        count.init(1).unwrap();
        count.update(|c| *c += 1).unwrap();
        assert_eq!(*count.get().unwrap(), 2);

        count.delete().unwrap();
        assert!(!count.is_initialized());
    }

    #[test]
    fn test_listener_sees_new_value() {
        let ctx = context();
        ctx.state(COUNT).init(0).unwrap();

        let seen = Rc::new(Cell::new(0));
        let seen_in = seen.clone();
        ctx.state(COUNT)
            .listen(move |value| seen_in.set(value.copied().unwrap_or(0)))
            .unwrap();

        ctx.state(COUNT).set(4).unwrap();
        assert_eq!(seen.get(), 4);
    }

    #[test]
    fn test_composed_recomputes_on_change_only() {
        let ctx = context();
        ctx.state(COUNT).init(2).unwrap();
        ctx.state(LABEL).init("x".into()).unwrap();

        let runs = Rc::new(Cell::new(0));
        let runs_in = runs.clone();
        let composed = ComposedState::from2(COUNT, LABEL, move |_, count, label| {
            runs_in.set(runs_in.get() + 1);
            label.repeat(*count as usize)
        });

        let first = composed.get(&ctx).unwrap();
        let second = composed.get(&ctx).unwrap();
        assert_eq!(*first, "xx");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(runs.get(), 1);

        ctx.state(COUNT).set(3).unwrap();
        assert_eq!(*composed.get(&ctx).unwrap(), "xxx");
        assert_eq!(runs.get(), 2);

        // Writing an identical value is not a change.
        ctx.state(COUNT).set(3).unwrap();
        composed.get(&ctx).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_composed_sees_previous_value() {
        let ctx = context();
        ctx.state(COUNT).init(1).unwrap();

        let composed = ComposedState::from1(COUNT, |previous: Option<&Vec<u32>>, count| {
            let mut history = previous.cloned().unwrap_or_default();
            history.push(*count);
            history
        });

        composed.get(&ctx).unwrap();
        ctx.state(COUNT).set(5).unwrap();
        assert_eq!(*composed.get(&ctx).unwrap(), vec![1, 5]);
    }

    #[test]
    fn test_composed_subscribers() {
        let ctx = context();
        ctx.state(COUNT).init(1).unwrap();

        let composed = ComposedState::from1(COUNT, |_, count| count * 10);
        let last = Rc::new(Cell::new(0));
        let last_in = last.clone();
        composed.subscribe(move |value| last_in.set(*value));

        composed.get(&ctx).unwrap();
        assert_eq!(last.get(), 10);

        ctx.state(COUNT).set(2).unwrap();
        composed.get(&ctx).unwrap();
        assert_eq!(last.get(), 20);
    }
}
