//! Drives the round: phase entry and exit, turn hand-off, forced and
//! automatic actions, and the end-of-game check.
//!
//! Transitions run as an explicit step loop rather than hook-to-hook
//! recursion. The loop is bounded by `EngineConfig::max_transition_steps`;
//! hitting the bound is an invariant violation.

use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::core::action::{ActionBundle, ActionOutcome, ActionProcessor};
use crate::core::config::PhaseId;
use crate::core::context::{Context, Injectable};
use crate::core::error::{ensure_invariant, GameError, GameResult};
use crate::core::keys::{GameStatus, AUTO_ACTIONS, CURRENT_PLAYER, GAME_STATUS, PHASE, ROUND};
use crate::core::log::Log;
use crate::core::player::{PlayerColor, PlayerHelper};
use crate::core::rng::Random;
use crate::rules::GameEnd;

use super::delegator::{InstalledPhase, PhaseDelegator};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    EnterPhase(usize),
    StartTurn(PlayerColor),
    EndTurn,
    EndPhase,
    EndRound,
}

/// Sequencing for the active ruleset's round plan.
pub struct PhaseEngine {
    delegator: Rc<PhaseDelegator>,
    phases: Vec<PhaseId>,
}

impl Injectable for PhaseEngine {
    fn build(ctx: &Context) -> GameResult<Self> {
        let delegator = ctx.inject::<PhaseDelegator>()?;
        let phases = ctx.ruleset().phases().to_vec();
        ensure_invariant(!phases.is_empty(), || {
            format!("ruleset '{}' declares no phases", ctx.ruleset().map_key())
        })?;
        for phase in &phases {
            ensure_invariant(delegator.contains(*phase), || format!("no module installed for {phase}"))?;
        }
        Ok(Self { delegator, phases })
    }
}

impl PhaseEngine {
    /// The phase currently accepting actions.
    pub fn active_phase(&self, ctx: &Context) -> GameResult<Rc<InstalledPhase>> {
        let phase = *ctx.state(PHASE).get()?;
        self.delegator.get(phase)
    }

    /// Whether the game still accepts actions.
    pub fn is_active(&self, ctx: &Context) -> GameResult<bool> {
        Ok(*ctx.state(GAME_STATUS).get()? == GameStatus::Active)
    }

    /// Whether processor `A` is available right now.
    pub fn can_emit<A: ActionProcessor>(&self, ctx: &Context) -> GameResult<bool> {
        Ok(self.is_active(ctx)? && self.active_phase(ctx)?.can_emit::<A>())
    }

    /// Whether an action name is available right now.
    pub fn can_emit_action(&self, ctx: &Context, name: &str) -> GameResult<bool> {
        Ok(self.is_active(ctx)? && self.active_phase(ctx)?.can_emit_action(name))
    }

    /// Action names available right now. Empty once the game has ended.
    pub fn available_actions(&self, ctx: &Context) -> GameResult<Vec<&'static str>> {
        if !self.is_active(ctx)? {
            return Ok(Vec::new());
        }
        Ok(self.active_phase(ctx)?.action_names())
    }

    /// Enter round 1, phase 1, and run until a player must act.
    ///
    /// Core keys other than the phase bookkeeping must already be set.
    pub fn start_game(&self, ctx: &Context) -> GameResult<bool> {
        ctx.state(ROUND).init(1)?;
        ctx.state(GAME_STATUS).init(GameStatus::Active)?;
        ctx.state(CURRENT_PLAYER).init(None)?;
        ctx.state(PHASE).init(self.phases[0])?;
        ctx.inject::<Log>()?.log("Round 1 begins");

        self.advance(ctx, Step::EnterPhase(0))?;
        self.run_automatic(ctx)
    }

    /// Run one player action, then every transition and automatic action
    /// it triggers.
    pub fn process_action(&self, ctx: &Context, name: &str, data: &Value) -> GameResult<ActionOutcome> {
        if !self.is_active(ctx)? {
            return Err(GameError::invalid_input("the game has ended"));
        }
        let outcome = self.run_one(ctx, name, data)?;
        let reversible = self.run_automatic(ctx)?;
        Ok(ActionOutcome {
            ends_turn: outcome.ends_turn,
            reversible: outcome.reversible && reversible,
        })
    }

    /// Run forced and automatic actions until a player must choose.
    /// Returns whether every action run was reversible.
    pub fn run_automatic(&self, ctx: &Context) -> GameResult<bool> {
        let mut reversible = true;
        let mut count = 0;

        while self.is_active(ctx)? {
            let Some(current) = *ctx.state(CURRENT_PLAYER).get()? else {
                break;
            };
            let phase = self.active_phase(ctx)?;

            if let Some(bundle) = phase.module().forced_action(ctx)? {
                count += 1;
                self.check_auto_bound(ctx, count)?;
                debug!(player = %current, action = %bundle.action, "forced action");
                reversible &= self.run_one(ctx, &bundle.action, &bundle.data)?.reversible;
                continue;
            }

            let auto = ctx.state(AUTO_ACTIONS).get()?.get(&current).cloned();
            let Some(auto) = auto.filter(|a| !a.is_empty()) else {
                break;
            };

            let log = ctx.inject::<Log>()?;
            let random = ctx.inject::<Random>()?;
            let checkpoint = ctx.checkpoint();
            let (lines, consumed) = (log.len(), random.consumed());
            let attempt = phase
                .module()
                .auto_action(ctx, current, &auto)
                .and_then(|bundle| match bundle {
                    Some(bundle) => self.run_bundle(ctx, &bundle).map(Some),
                    None => Ok(None),
                });

            match attempt {
                Ok(Some(outcome)) => {
                    count += 1;
                    self.check_auto_bound(ctx, count)?;
                    reversible &= outcome.reversible;
                }
                Ok(None) => break,
                Err(err) if err.is_recoverable() => {
                    warn!(player = %current, error = %err, "automatic action failed, clearing it");
                    ctx.restore(checkpoint)?;
                    log.truncate(lines);
                    random.rewind(consumed);
                    ctx.state(AUTO_ACTIONS).update(|table| {
                        table.remove(&current);
                    })?;
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(reversible)
    }

    fn run_bundle(&self, ctx: &Context, bundle: &ActionBundle) -> GameResult<ActionOutcome> {
        debug!(action = %bundle.action, "automatic action");
        self.run_one(ctx, &bundle.action, &bundle.data)
    }

    fn run_one(&self, ctx: &Context, name: &str, data: &Value) -> GameResult<ActionOutcome> {
        let outcome = self.active_phase(ctx)?.process_action(ctx, name, data)?;
        if outcome.ends_turn {
            self.advance(ctx, Step::EndTurn)?;
        }
        Ok(outcome)
    }

    fn check_auto_bound(&self, ctx: &Context, count: usize) -> GameResult<()> {
        let bound = ctx.config().max_auto_actions;
        ensure_invariant(count <= bound, || {
            format!("more than {bound} automatic actions for one input")
        })
    }

    fn advance(&self, ctx: &Context, first: Step) -> GameResult<()> {
        let bound = ctx.config().max_transition_steps;
        let mut next = Some(first);
        let mut steps = 0;

        while let Some(step) = next.take() {
            steps += 1;
            if steps > bound {
                return Err(GameError::invariant(format!(
                    "phase transitions did not settle within {bound} steps"
                )));
            }
            trace!(?step, "transition");
            next = self.step(ctx, step)?;
        }
        Ok(())
    }

    fn step(&self, ctx: &Context, step: Step) -> GameResult<Option<Step>> {
        match step {
            Step::EnterPhase(index) => {
                let phase = self.phases[index];
                ctx.state(PHASE).set(phase)?;
                let installed = self.delegator.get(phase)?;
                debug!(phase = installed.module().name(), "phase start");
                installed.module().on_start(ctx)?;
                Ok(Some(match installed.module().first_player(ctx)? {
                    Some(first) => Step::StartTurn(first),
                    None => Step::EndPhase,
                }))
            }
            Step::StartTurn(player) => {
                ctx.state(CURRENT_PLAYER).set(Some(player))?;
                self.active_phase(ctx)?.module().on_start_turn(ctx)?;
                Ok(None)
            }
            Step::EndTurn => {
                let current = ctx
                    .inject::<PlayerHelper>()?
                    .current_color(ctx)?
                    .ok_or_else(|| GameError::invariant("turn ended with no current player"))?;
                let phase = self.active_phase(ctx)?;
                phase.module().on_end_turn(ctx)?;
                Ok(Some(match phase.module().find_next_player(ctx, current)? {
                    Some(next) => Step::StartTurn(next),
                    None => Step::EndPhase,
                }))
            }
            Step::EndPhase => {
                let phase = *ctx.state(PHASE).get()?;
                self.delegator.get(phase)?.module().on_end(ctx)?;
                let index = self
                    .phases
                    .iter()
                    .position(|p| *p == phase)
                    .ok_or_else(|| GameError::invariant(format!("{phase} is not part of the round")))?;
                Ok(Some(if index + 1 < self.phases.len() {
                    Step::EnterPhase(index + 1)
                } else {
                    Step::EndRound
                }))
            }
            Step::EndRound => {
                ctx.ruleset().on_round_end(ctx)?;
                if ctx.resolve::<GameEnd>()?.is_over(ctx)? {
                    self.finish(ctx)?;
                    return Ok(None);
                }
                let round = *ctx.state(ROUND).get()? + 1;
                ctx.state(ROUND).set(round)?;
                ctx.inject::<Log>()?.log(format!("Round {round} begins"));
                Ok(Some(Step::EnterPhase(0)))
            }
        }
    }

    fn finish(&self, ctx: &Context) -> GameResult<()> {
        ctx.state(GAME_STATUS).set(GameStatus::Ended)?;
        ctx.state(CURRENT_PLAYER).set(None)?;
        let outcome = ctx.ruleset().outcome(ctx)?;
        debug!(?outcome, "game over");
        ctx.inject::<Log>()?.log(outcome.describe());
        Ok(())
    }
}
