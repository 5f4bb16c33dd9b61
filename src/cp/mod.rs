//! Constraint-model formulation.
//!
//! Bridges raw problem input to the propagation model. [`ModelBuilder`]
//! validates `N`, `T` and the ranks, then assembles a [`ChainModel`]: the
//! chain topology, the rank table, and the active [`ConstraintSet`]. Any
//! [`ChainSolver`] can then search it. [`ScheduleExtractor`] turns the
//! solver's winning state back into a [`Schedule`].
//!
//! # Decision variables
//!
//! | Variable | Meaning | Held in |
//! |----------|---------|---------|
//! | `y(i, t)` | node `i` executes at `t` | `ScheduleState::exec_time` |
//! | `x(i→j, t)` | message on edge `i→j` at `t` | `ScheduleState::messages` |
//! | `R(i, k, t)` | node `i` holds result `k` at `t` | `PossessionTable` |
//!
//! Objective: minimize `Σ x(i→j, t)`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::{
    ChainModel, ConstraintSet, Execution, PossessionTable, Rank, RankTable, Rule, Schedule,
    ScheduleState, Topology,
};
use crate::scheduler::{ChainSolver, SolveOutcome, SolverConfig};
use crate::validation;

/// Raw problem input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProblem {
    /// Number of nodes `N`.
    pub nodes: usize,
    /// Last time step `T`.
    pub horizon: usize,
    /// Rank per node, indexed by node id.
    pub ranks: Vec<Rank>,
}

impl ChainProblem {
    pub fn new(nodes: usize, horizon: usize, ranks: Vec<Rank>) -> Self {
        Self {
            nodes,
            horizon,
            ranks,
        }
    }
}

/// Builds a [`ChainModel`] from problem input.
///
/// # Example
/// ```
/// use u_relay::cp::ModelBuilder;
///
/// let model = ModelBuilder::new(5, 3, vec![2, 0, 1, 0, 2]).build().unwrap();
/// assert_eq!(model.result_count(), 3);
/// assert!(ModelBuilder::new(3, 1, vec![0, 1, 0]).build().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    problem: ChainProblem,
    constraints: ConstraintSet,
}

impl ModelBuilder {
    /// Creates a builder with the standard rule bank.
    pub fn new(nodes: usize, horizon: usize, ranks: Vec<Rank>) -> Self {
        Self::from_problem(ChainProblem::new(nodes, horizon, ranks))
    }

    pub fn from_problem(problem: ChainProblem) -> Self {
        Self {
            problem,
            constraints: ConstraintSet::standard(),
        }
    }

    /// Replaces the rule bank.
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    /// Adds a single rule to the bank.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.constraints = self.constraints.with_rule(rule);
        self
    }

    /// Requires every rank-0 node to message a higher-rank neighbour.
    pub fn with_rank0_announce(self) -> Self {
        self.with_rule(Rule::Rank0Announce)
    }

    /// Validates the input and assembles the model.
    ///
    /// `T` is clamped to [`Topology::saturation_horizon`]; a schedule that is
    /// minimal and valid for the clamped horizon is minimal and valid for `T`.
    ///
    /// # Errors
    /// `ScheduleError::Configuration` listing every input problem found.
    pub fn build(&self) -> Result<ChainModel> {
        let p = &self.problem;
        validation::validate_input(p.nodes, &p.ranks).map_err(validation::into_schedule_error)?;

        let topology = Topology::from_validated(p.nodes);
        let ranks = RankTable::from_validated(p.ranks.clone(), &topology);
        let horizon = p.horizon.min(topology.saturation_horizon());
        if horizon < p.horizon {
            debug!(requested = p.horizon, horizon, "horizon clamped");
        }
        debug!(
            nodes = p.nodes,
            horizon,
            rules = self.constraints.rules().len(),
            "built chain model"
        );

        Ok(ChainModel {
            topology,
            ranks,
            horizon,
            constraints: self.constraints.clone(),
        })
    }

    /// Builds the model and solves it.
    pub fn solve<S: ChainSolver>(&self, solver: &S, config: &SolverConfig) -> Result<SolveOutcome> {
        let model = self.build()?;
        solver.solve(&model, config)
    }
}

/// Converts a finished search state into a [`Schedule`].
pub struct ScheduleExtractor;

impl ScheduleExtractor {
    /// Executions and messages of `state`, in canonical order.
    pub fn extract(state: &ScheduleState) -> Schedule {
        let mut schedule = Schedule::new();
        let nodes = state.possession().node_count();
        for node in 0..nodes {
            if let Some(time) = state.exec_time(node) {
                schedule.add_execution(Execution::new(node, time));
            }
        }
        for message in state.messages() {
            schedule.add_message(*message);
        }
        schedule.normalize();
        schedule
    }

    /// The schedule together with the possession table the search recorded.
    pub fn extract_with_possession(state: &ScheduleState) -> (Schedule, PossessionTable) {
        (Self::extract(state), state.possession().clone())
    }
}
