//! Map-key lookup of rulesets.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::error::{GameError, GameResult};
use crate::games::rails::{RailsRuleset, RailsVariant};

use super::ruleset::Ruleset;

/// Rulesets available to an engine, keyed by map key.
///
/// Read-only after construction; cloning shares the rulesets.
#[derive(Clone, Default)]
pub struct RulesetRegistry {
    rulesets: BTreeMap<&'static str, Arc<dyn Ruleset>>,
}

impl RulesetRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every ruleset shipped with the crate.
    pub fn builtin() -> GameResult<Self> {
        Self::new()
            .with(RailsRuleset::new(RailsVariant::Standard))?
            .with(RailsRuleset::new(RailsVariant::Short))
    }

    /// Add a ruleset. A second ruleset under the same map key is rejected.
    pub fn register(&mut self, ruleset: impl Ruleset) -> GameResult<()> {
        let map_key = ruleset.map_key();
        if self.rulesets.contains_key(map_key) {
            return Err(GameError::invariant(format!("map key '{map_key}' registered twice")));
        }
        self.rulesets.insert(map_key, Arc::new(ruleset));
        Ok(())
    }

    /// Builder form of [`RulesetRegistry::register`].
    pub fn with(mut self, ruleset: impl Ruleset) -> GameResult<Self> {
        self.register(ruleset)?;
        Ok(self)
    }

    /// Look up a ruleset. Unknown map keys are invalid input.
    pub fn get(&self, map_key: &str) -> GameResult<Arc<dyn Ruleset>> {
        self.rulesets
            .get(map_key)
            .cloned()
            .ok_or_else(|| GameError::invalid_input(format!("unknown map key '{map_key}'")))
    }

    /// Registered map keys, sorted.
    pub fn map_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rulesets.keys().copied()
    }
}

impl fmt::Debug for RulesetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rulesets.keys()).finish()
    }
}
