//! Minimal ruleset for unit tests that need a context but no phases.

use crate::core::config::{PhaseId, RulesetConfig};
use crate::core::context::Overrides;
use crate::core::error::GameResult;
use crate::phases::PhaseDelegator;

use super::ruleset::Ruleset;

pub(crate) struct EmptyRuleset {
    config: RulesetConfig,
    overrides: Overrides,
}

impl Default for EmptyRuleset {
    fn default() -> Self {
        Self::with_overrides(Overrides::new())
    }
}

impl EmptyRuleset {
    pub(crate) fn with_overrides(overrides: Overrides) -> Self {
        Self {
            config: RulesetConfig::new("Empty"),
            overrides,
        }
    }
}

impl Ruleset for EmptyRuleset {
    fn map_key(&self) -> &'static str {
        "empty"
    }

    fn config(&self) -> &RulesetConfig {
        &self.config
    }

    fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    fn phases(&self) -> &[PhaseId] {
        &[]
    }

    fn install_phases(&self, _delegator: &mut PhaseDelegator) -> GameResult<()> {
        Ok(())
    }
}
