//! Solver results and the solver interface.

use serde::{Deserialize, Serialize};

use super::SolverConfig;
use crate::error::Result;
use crate::models::{ChainModel, ConstraintSet, Schedule};

/// Why no valid schedule exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InfeasibleReason {
    /// `T < N - 2`: results cannot cross the chain in time.
    HorizonTooSmall,
    /// The rank chain delays the last execution past what `T` allows.
    RankUnreachable,
}

impl InfeasibleReason {
    /// Decides infeasibility before any search.
    ///
    /// Exact: when this returns `None`, forwarding everything every step
    /// completes both endpoints by `T`.
    pub fn diagnose(model: &ChainModel) -> Option<Self> {
        if model.horizon < model.topology.min_spanning_hops() {
            return Some(Self::HorizonTooSmall);
        }
        if !ConstraintSet::horizon_reachable(model, &model.empty_state()) {
            return Some(Self::RankUnreachable);
        }
        None
    }
}

impl std::fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HorizonTooSmall => write!(f, "horizon-too-small"),
            Self::RankUnreachable => write!(f, "rank-unreachable"),
        }
    }
}

/// Search counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchStats {
    /// Search nodes expanded.
    pub nodes_explored: u64,
    /// Nodes cut by the message lower bound.
    pub pruned_by_bound: u64,
    /// Nodes cut because the endpoints could no longer complete by `T`.
    pub pruned_by_reachability: u64,
    /// Complete schedules found (warm start included).
    pub solutions_found: u64,
    /// Times the incumbent was replaced by a strictly better schedule.
    pub incumbent_updates: u64,
    /// Wall-clock time of the solve.
    pub elapsed_ms: u64,
}

/// A valid schedule and how good it is known to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub schedule: Schedule,
    pub total_messages: usize,
    /// `true` when the search finished without hitting a limit.
    pub proven_optimal: bool,
    pub stats: SearchStats,
}

/// Result of a solve that ran to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "kebab-case")]
pub enum SolveOutcome {
    Feasible(Solution),
    Infeasible(InfeasibleReason),
}

impl SolveOutcome {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Feasible(_))
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Feasible(solution) => Some(solution),
            Self::Infeasible(_) => None,
        }
    }

    pub fn infeasible_reason(&self) -> Option<InfeasibleReason> {
        match self {
            Self::Feasible(_) => None,
            Self::Infeasible(reason) => Some(*reason),
        }
    }
}

/// A minimum-message solver for a [`ChainModel`].
pub trait ChainSolver {
    /// Searches `model` under `config`.
    ///
    /// # Errors
    /// `ScheduleError::InternalInconsistency` if a schedule the search
    /// produced fails validation.
    fn solve(&self, model: &ChainModel, config: &SolverConfig) -> Result<SolveOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::ModelBuilder;

    #[test]
    fn test_diagnose() {
        let short = ModelBuilder::new(5, 0, vec![1, 0, 0, 0, 1]).build().unwrap();
        assert_eq!(
            InfeasibleReason::diagnose(&short),
            Some(InfeasibleReason::HorizonTooSmall)
        );

        // A three-deep rank chain completes at t=5 at the earliest.
        let chain = ModelBuilder::new(5, 4, vec![3, 0, 1, 2, 3]).build().unwrap();
        assert_eq!(
            InfeasibleReason::diagnose(&chain),
            Some(InfeasibleReason::RankUnreachable)
        );

        let ok = ModelBuilder::new(5, 5, vec![3, 0, 1, 2, 3]).build().unwrap();
        assert_eq!(InfeasibleReason::diagnose(&ok), None);
    }

    #[test]
    fn test_reason_serialization() {
        let json = serde_json::to_string(&InfeasibleReason::HorizonTooSmall).unwrap();
        assert_eq!(json, r#""horizon-too-small""#);
        let reason: InfeasibleReason = serde_json::from_str(r#""rank-unreachable""#).unwrap();
        assert_eq!(reason, InfeasibleReason::RankUnreachable);
        assert_eq!(reason.to_string(), "rank-unreachable");
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = SolveOutcome::Infeasible(InfeasibleReason::RankUnreachable);
        assert!(!outcome.is_feasible());
        assert!(outcome.solution().is_none());
        assert_eq!(
            outcome.infeasible_reason(),
            Some(InfeasibleReason::RankUnreachable)
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "infeasible");
        assert_eq!(json["result"], "rank-unreachable");
    }
}
