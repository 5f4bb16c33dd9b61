//! Constructive heuristics.
//!
//! [`FloodScheduler`] forwards every useful message at every step. It
//! realizes the earliest possible execution and arrival times, so it finds a
//! valid schedule whenever one exists, at the cost of many messages.
//!
//! [`RandomDiver`] keeps each useful message with a fixed probability and
//! falls back to flooding for any step that would otherwise make the horizon
//! unreachable. Repeated dives give the branch-and-bound a tighter starting
//! bound.

use std::time::Instant;

use rand::Rng;
use tracing::{debug, info};

use super::step;
use super::{ChainSolver, InfeasibleReason, SearchStats, Solution, SolveOutcome, SolverConfig};
use crate::cp::ScheduleExtractor;
use crate::error::{Result, ScheduleError};
use crate::models::{ChainModel, ConstraintSet, ScheduleState, Violation};
use crate::validation::ScheduleValidator;

/// Sends every useful message at every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloodScheduler;

impl FloodScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Runs the flood to completion.
    ///
    /// Returns the finished state, or `None` if the endpoints are still
    /// incomplete at `T`.
    pub fn run(&self, model: &ChainModel) -> Option<ScheduleState> {
        let mut state = model.empty_state();
        loop {
            step::execute_enabled(model, &mut state);
            if step::is_complete(model, &state) {
                state.finish_idle();
                return Some(state);
            }
            if state.time() >= model.horizon {
                return None;
            }
            flood_step(model, &mut state);
            state.advance();
        }
    }
}

impl ChainSolver for FloodScheduler {
    fn solve(&self, model: &ChainModel, _config: &SolverConfig) -> Result<SolveOutcome> {
        let start = Instant::now();
        if let Some(reason) = InfeasibleReason::diagnose(model) {
            return Ok(SolveOutcome::Infeasible(reason));
        }
        let state = self
            .run(model)
            .ok_or_else(|| incomplete_after_flood(model))?;
        let schedule = ScheduleExtractor::extract(&state);
        ScheduleValidator::new(model)
            .validate(&schedule)
            .map_err(|violations| ScheduleError::InternalInconsistency { violations })?;

        let total_messages = schedule.total_messages();
        info!(messages = total_messages, "flood schedule built");
        Ok(SolveOutcome::Feasible(Solution {
            schedule,
            total_messages,
            proven_optimal: false,
            stats: SearchStats {
                solutions_found: 1,
                elapsed_ms: start.elapsed().as_millis() as u64,
                ..SearchStats::default()
            },
        }))
    }
}

pub(crate) const DEFAULT_SEND_PROBABILITY: f64 = 0.5;

pub(crate) fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        DEFAULT_SEND_PROBABILITY
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Randomized repair dives.
#[derive(Debug, Clone, Copy)]
pub struct RandomDiver {
    send_probability: f64,
}

impl Default for RandomDiver {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_PROBABILITY)
    }
}

impl RandomDiver {
    /// Creates a diver keeping each useful message with `send_probability`,
    /// clamped to `[0, 1]`. NaN falls back to the default of 0.5.
    pub fn new(send_probability: f64) -> Self {
        Self {
            send_probability: clamp_probability(send_probability),
        }
    }

    pub fn send_probability(&self) -> f64 {
        self.send_probability
    }

    /// Runs one dive.
    ///
    /// A step whose random choices leave the horizon unreachable is replayed
    /// as a flood step, so a dive from a feasible model always completes.
    pub fn dive<R: Rng>(&self, model: &ChainModel, rng: &mut R) -> Option<ScheduleState> {
        let mut state = model.empty_state();
        loop {
            step::execute_enabled(model, &mut state);
            if step::is_complete(model, &state) {
                state.finish_idle();
                return Some(state);
            }
            if state.time() >= model.horizon {
                return None;
            }

            let snapshot = state.clone();
            for (from, to) in step::candidate_edges(model, &state) {
                if !step::worth_sending(model, &state, from, to) {
                    continue;
                }
                if step::announce_pending(model, &state, from, to)
                    || rng.random_bool(self.send_probability)
                {
                    state.send(from, to);
                }
            }
            state.advance();

            if !ConstraintSet::horizon_reachable(model, &state) {
                state = snapshot;
                flood_step(model, &mut state);
                state.advance();
            }
        }
    }
}

/// Sends every message still worth sending at the current step.
fn flood_step(model: &ChainModel, state: &mut ScheduleState) {
    for (from, to) in step::candidate_edges(model, state) {
        if step::worth_sending(model, state, from, to) {
            state.send(from, to);
        }
    }
}

pub(crate) fn incomplete_after_flood(model: &ChainModel) -> ScheduleError {
    debug!(horizon = model.horizon, "flood left the endpoints incomplete");
    ScheduleError::InternalInconsistency {
        violations: vec![Violation::boundary(
            0,
            format!(
                "flooding did not complete the endpoints by T={}",
                model.horizon
            ),
        )],
    }
}
