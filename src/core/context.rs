//! Per-invocation context: the state store plus lazily built services.
//!
//! ## Services
//!
//! Anything implementing [`Injectable`] is built on first request and
//! cached for the rest of the invocation, so every caller sees the same
//! instance. Construction may request other services; a request that
//! loops back to a type still being built is an invariant violation.
//!
//! ## Extension points
//!
//! An [`ExtensionPoint`] names a replaceable service. The active ruleset's
//! [`Overrides`] may supply a factory for it; otherwise the point's default
//! is built. Either way the result is cached like any other service.
//!
//! A context lives for exactly one engine call. Nothing in it is shared
//! across threads.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::trace;

use super::config::EngineConfig;
use super::error::{GameError, GameResult};
use super::key::{Key, StateValue};
use super::keys::core_keys;
use super::state::{ComposedState, State};
use super::store::{fire_all, StateStore, StoreCheckpoint};
use crate::rules::Ruleset;

/// A service the context can build on demand.
pub trait Injectable: Any + Sized {
    /// Construct the service. May inject other services.
    fn build(ctx: &Context) -> GameResult<Self>;
}

/// A replaceable service slot.
///
/// Implemented on a marker type; `Service` is usually a trait object.
pub trait ExtensionPoint: 'static {
    /// The service handed out by [`Context::resolve`].
    type Service: ?Sized + 'static;

    /// Build the default service when the ruleset does not override it.
    fn default_service(ctx: &Context) -> GameResult<Rc<Self::Service>>;
}

/// Factory a ruleset registers for an extension point.
pub type ServiceFactory<S> = fn(&Context) -> GameResult<Rc<S>>;

/// A ruleset's replacements for extension points.
#[derive(Default)]
pub struct Overrides {
    factories: FxHashMap<TypeId, (&'static str, Box<dyn Any + Send + Sync>)>,
}

impl Overrides {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the service for `E`. A later call for the same point wins.
    pub fn provide<E: ExtensionPoint>(&mut self, factory: ServiceFactory<E::Service>) {
        self.factories
            .insert(TypeId::of::<E>(), (type_name::<E>(), Box::new(factory)));
    }

    /// Builder form of [`Overrides::provide`].
    #[must_use]
    pub fn with<E: ExtensionPoint>(mut self, factory: ServiceFactory<E::Service>) -> Self {
        self.provide::<E>(factory);
        self
    }

    /// Whether `E` is overridden.
    #[must_use]
    pub fn contains<E: ExtensionPoint>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<E>())
    }

    fn factory<E: ExtensionPoint>(&self) -> Option<ServiceFactory<E::Service>> {
        self.factories
            .get(&TypeId::of::<E>())
            .and_then(|(_, factory)| factory.downcast_ref::<ServiceFactory<E::Service>>())
            .copied()
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}

/// Everything one engine call works against.
pub struct Context {
    ruleset: Arc<dyn Ruleset>,
    config: EngineConfig,
    store: RefCell<StateStore>,
    services: RefCell<FxHashMap<TypeId, Rc<dyn Any>>>,
    resolving: RefCell<Vec<(TypeId, &'static str)>>,
}

impl Context {
    /// Fresh context with an empty store.
    ///
    /// Fails if the ruleset declares a key that clashes with a core key.
    pub fn new(ruleset: Arc<dyn Ruleset>, config: EngineConfig) -> GameResult<Self> {
        Self::hydrate(ruleset, config, StateStore::new())
    }

    /// Context hydrated from a serialized snapshot.
    pub fn from_snapshot(ruleset: Arc<dyn Ruleset>, config: EngineConfig, data: &str) -> GameResult<Self> {
        Self::hydrate(ruleset, config, StateStore::from_snapshot(data)?)
    }

    fn hydrate(ruleset: Arc<dyn Ruleset>, config: EngineConfig, store: StateStore) -> GameResult<Self> {
        let mut keys = core_keys()?;
        keys.extend(&ruleset.keys()?)?;
        trace!(map_key = ruleset.map_key(), keys = keys.len(), "context created");
        Ok(Self {
            ruleset,
            config,
            store: RefCell::new(store),
            services: RefCell::new(FxHashMap::default()),
            resolving: RefCell::new(Vec::new()),
        })
    }

    /// The active ruleset.
    #[must_use]
    pub fn ruleset(&self) -> &dyn Ruleset {
        self.ruleset.as_ref()
    }

    /// Engine bounds.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // === State ===

    /// Accessor for one key.
    #[must_use]
    pub fn state<T: StateValue>(&self, key: Key<T>) -> State<'_, T> {
        State::new(self, key)
    }

    /// Run `f` against the store, then deliver any change notifications it
    /// produced once the store is released.
    pub(crate) fn with_store<R>(&self, f: impl FnOnce(&mut StateStore) -> GameResult<R>) -> GameResult<R> {
        let (result, pending) = {
            let mut store = self.store.borrow_mut();
            let result = f(&mut store);
            (result, store.take_notifications())
        };
        fire_all(pending);
        result
    }

    /// Run `f` with every write rejected.
    pub fn read_only<R>(&self, f: impl FnOnce() -> GameResult<R>) -> GameResult<R> {
        let was = {
            let mut store = self.store.borrow_mut();
            let was = store.is_read_only();
            store.set_read_only(true);
            was
        };
        let result = f();
        self.store.borrow_mut().set_read_only(was);
        result
    }

    /// Current store version.
    #[must_use]
    pub fn store_version(&self) -> u64 {
        self.store.borrow().version()
    }

    /// Version of one slot, or `None` if absent.
    #[must_use]
    pub fn slot_version(&self, name: &str) -> Option<u64> {
        self.store.borrow().slot_version(name)
    }

    /// Canonical snapshot of the whole store.
    pub fn serialize(&self) -> GameResult<String> {
        self.store.borrow().serialize()
    }

    /// Capture the store for a later [`Context::restore`].
    #[must_use]
    pub fn checkpoint(&self) -> StoreCheckpoint {
        self.store.borrow().checkpoint()
    }

    /// Return the store to a checkpoint.
    pub fn restore(&self, checkpoint: StoreCheckpoint) -> GameResult<()> {
        self.with_store(|store| store.restore_deferred(checkpoint))?;
        Ok(())
    }

    /// Build a derived value over `deps`.
    pub fn compose<T: 'static>(
        &self,
        deps: Vec<&'static str>,
        reducer: impl Fn(Option<&T>, &Context) -> GameResult<T> + 'static,
    ) -> ComposedState<T> {
        ComposedState::new(deps, reducer)
    }

    // === Services ===

    /// The per-invocation instance of `T`, built on first request.
    pub fn inject<T: Injectable>(&self) -> GameResult<Rc<T>> {
        let erased = self.service(TypeId::of::<T>(), type_name::<T>(), || {
            T::build(self).map(|built| Rc::new(built) as Rc<dyn Any>)
        })?;
        erased
            .downcast::<T>()
            .map_err(|_| GameError::invariant(format!("service {} has the wrong type", type_name::<T>())))
    }

    /// The service for extension point `E`: the ruleset's override if any,
    /// otherwise the default.
    pub fn resolve<E: ExtensionPoint>(&self) -> GameResult<Rc<E::Service>> {
        let erased = self.service(TypeId::of::<E>(), type_name::<E>(), || {
            let service = match self.ruleset.overrides().factory::<E>() {
                Some(factory) => factory(self)?,
                None => E::default_service(self)?,
            };
            Ok(Rc::new(service) as Rc<dyn Any>)
        })?;
        erased
            .downcast_ref::<Rc<E::Service>>()
            .cloned()
            .ok_or_else(|| GameError::invariant(format!("extension {} has the wrong type", type_name::<E>())))
    }

    fn service(
        &self,
        id: TypeId,
        name: &'static str,
        build: impl FnOnce() -> GameResult<Rc<dyn Any>>,
    ) -> GameResult<Rc<dyn Any>> {
        if let Some(existing) = self.services.borrow().get(&id) {
            return Ok(existing.clone());
        }

        {
            let mut resolving = self.resolving.borrow_mut();
            if resolving.iter().any(|(pending, _)| *pending == id) {
                let mut chain: Vec<_> = resolving.iter().map(|(_, name)| *name).collect();
                chain.push(name);
                return Err(GameError::invariant(format!(
                    "dependency cycle: {}",
                    chain.join(" -> ")
                )));
            }
            resolving.push((id, name));
        }

        trace!(service = name, "building service");
        let built = build();
        self.resolving.borrow_mut().pop();
        let built = built?;
        self.services.borrow_mut().insert(id, built.clone());
        Ok(built)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("map_key", &self.ruleset.map_key())
            .field("store", &self.store.borrow())
            .field("services", &self.services.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::keys::ROUND;
    use crate::rules::testing::EmptyRuleset;
    use std::cell::Cell;

    fn context() -> Context {
        Context::new(Arc::new(EmptyRuleset::default()), EngineConfig::default()).unwrap()
    }

    struct Counter {
        builds: Cell<u32>,
    }

    impl Injectable for Counter {
        fn build(_ctx: &Context) -> GameResult<Self> {
            Ok(Self { builds: Cell::new(1) })
        }
    }

    struct DependsOnCounter {
        counter: Rc<Counter>,
    }

    impl Injectable for DependsOnCounter {
        fn build(ctx: &Context) -> GameResult<Self> {
            Ok(Self {
                counter: ctx.inject::<Counter>()?,
            })
        }
    }

    struct CycleA;
    struct CycleB;

    impl Injectable for CycleA {
        fn build(ctx: &Context) -> GameResult<Self> {
            ctx.inject::<CycleB>()?;
            Ok(CycleA)
        }
    }

    impl Injectable for CycleB {
        fn build(ctx: &Context) -> GameResult<Self> {
            ctx.inject::<CycleA>()?;
            Ok(CycleB)
        }
    }

    trait Greeter {
        fn greet(&self) -> &'static str;
    }

    struct Hello;
    impl Greeter for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    struct Greeting;
    impl ExtensionPoint for Greeting {
        type Service = dyn Greeter;

        fn default_service(_ctx: &Context) -> GameResult<Rc<dyn Greeter>> {
            Ok(Rc::new(Hello))
        }
    }

    #[test]
    fn test_inject_is_singleton() {
        let ctx = context();
        let first = ctx.inject::<Counter>().unwrap();
        first.builds.set(first.builds.get() + 1);

        let second = ctx.inject::<Counter>().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(second.builds.get(), 2);

        let dependent = ctx.inject::<DependsOnCounter>().unwrap();
        assert!(Rc::ptr_eq(&dependent.counter, &first));
    }

    #[test]
    fn test_fresh_context_rebuilds() {
        let first = context().inject::<Counter>().unwrap();
        let second = context().inject::<Counter>().unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cycle_is_invariant() {
        let ctx = context();
        let err = ctx.inject::<CycleA>().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert!(err.to_string().contains("dependency cycle"));

        // The failed attempt leaves nothing half-built behind.
        assert!(ctx.inject::<Counter>().is_ok());
    }

    #[test]
    fn test_resolve_default() {
        let ctx = context();
        let greeter = ctx.resolve::<Greeting>().unwrap();
        assert_eq!(greeter.greet(), "hello");
        assert!(Rc::ptr_eq(&greeter, &ctx.resolve::<Greeting>().unwrap()));
    }

    #[test]
    fn test_resolve_override() {
        struct Hi;
        impl Greeter for Hi {
            fn greet(&self) -> &'static str {
                "hi"
            }
        }

        let ruleset = EmptyRuleset::with_overrides(
            Overrides::new().with::<Greeting>(|_ctx| Ok(Rc::new(Hi) as Rc<dyn Greeter>)),
        );
        let ctx = Context::new(Arc::new(ruleset), EngineConfig::default()).unwrap();
        assert_eq!(ctx.resolve::<Greeting>().unwrap().greet(), "hi");
    }

    #[test]
    fn test_read_only_scope() {
        let ctx = context();
        ctx.state(ROUND).init(1).unwrap();

        let err = ctx.read_only(|| ctx.state(ROUND).set(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invariant);
        assert_eq!(*ctx.state(ROUND).get().unwrap(), 1);

        // Writable again once the scope ends.
        ctx.state(ROUND).set(2).unwrap();
        assert_eq!(*ctx.state(ROUND).get().unwrap(), 2);
    }

    #[test]
    fn test_checkpoint_restore() {
        let ctx = context();
        ctx.state(ROUND).init(1).unwrap();
        let checkpoint = ctx.checkpoint();

        ctx.state(ROUND).set(5).unwrap();
        ctx.restore(checkpoint).unwrap();
        assert_eq!(*ctx.state(ROUND).get().unwrap(), 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let ctx = context();
        ctx.state(ROUND).init(3).unwrap();
        let data = ctx.serialize().unwrap();

        let restored =
            Context::from_snapshot(Arc::new(EmptyRuleset::default()), EngineConfig::default(), &data).unwrap();
        assert_eq!(*restored.state(ROUND).get().unwrap(), 3);
        assert_eq!(restored.serialize().unwrap(), data);
    }
}
