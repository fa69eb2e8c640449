//! Routes each phase to its installed module and action set.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::core::action::{ActionOutcome, ActionProcessor, ActionRegistry};
use crate::core::config::PhaseId;
use crate::core::context::{Context, Injectable};
use crate::core::error::{GameError, GameResult};

use super::module::PhaseModule;

/// A phase module together with the actions it installed.
pub struct InstalledPhase {
    module: Rc<dyn PhaseModule>,
    actions: ActionRegistry,
}

impl InstalledPhase {
    fn new(module: Rc<dyn PhaseModule>) -> GameResult<Self> {
        let mut actions = ActionRegistry::new();
        module.configure_actions(&mut actions)?;
        Ok(Self { module, actions })
    }

    /// The module.
    #[must_use]
    pub fn module(&self) -> &dyn PhaseModule {
        self.module.as_ref()
    }

    /// Whether processor `A` is installed in this phase.
    #[must_use]
    pub fn can_emit<A: ActionProcessor>(&self) -> bool {
        self.actions.contains_processor::<A>()
    }

    /// Whether an action name is installed in this phase.
    #[must_use]
    pub fn can_emit_action(&self, name: &str) -> bool {
        self.actions.contains(name)
    }

    /// Installed action names, sorted.
    #[must_use]
    pub fn action_names(&self) -> Vec<&'static str> {
        self.actions.names().collect()
    }

    /// Run an installed action. Anything else is a permission error.
    pub fn process_action(&self, ctx: &Context, name: &str, data: &Value) -> GameResult<ActionOutcome> {
        let run = self.actions.runner(name).ok_or_else(|| {
            GameError::permission(format!(
                "action '{name}' is not available in the {} phase",
                self.module.name()
            ))
        })?;
        run(ctx, data)
    }
}

/// Phase modules installed by the active ruleset.
#[derive(Default)]
pub struct PhaseDelegator {
    pending: BTreeMap<PhaseId, Rc<dyn PhaseModule>>,
    installed: BTreeMap<PhaseId, Rc<InstalledPhase>>,
}

impl Injectable for PhaseDelegator {
    fn build(ctx: &Context) -> GameResult<Self> {
        let mut delegator = PhaseDelegator::default();
        ctx.ruleset().install_phases(&mut delegator)?;
        delegator.configure()?;
        Ok(delegator)
    }
}

impl PhaseDelegator {
    /// Install `module` for its phase, replacing any earlier module.
    pub fn install(&mut self, module: impl PhaseModule) {
        self.pending.insert(module.phase(), Rc::new(module));
    }

    fn configure(&mut self) -> GameResult<()> {
        for (phase, module) in std::mem::take(&mut self.pending) {
            self.installed.insert(phase, Rc::new(InstalledPhase::new(module)?));
        }
        Ok(())
    }

    /// The installed phase. A phase with no module is an invariant violation.
    pub fn get(&self, phase: PhaseId) -> GameResult<Rc<InstalledPhase>> {
        self.installed
            .get(&phase)
            .cloned()
            .ok_or_else(|| GameError::invariant(format!("no module installed for {phase}")))
    }

    /// Whether a module is installed for `phase`.
    #[must_use]
    pub fn contains(&self, phase: PhaseId) -> bool {
        self.installed.contains_key(&phase) || self.pending.contains_key(&phase)
    }
}

impl fmt::Debug for PhaseDelegator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.installed.iter().map(|(phase, p)| (phase, p.module.name())))
            .finish()
    }
}
