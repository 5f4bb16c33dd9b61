//! Input and schedule validation.
//!
//! Two gates:
//! - [`validate_input`] checks the structural integrity of a problem before
//!   any model is built. It detects:
//!   - chains shorter than two nodes or longer than [`MAX_NODES`]
//!   - rank lists whose length differs from the node count
//!   - negative ranks
//!   - no rank-0 node (nothing could ever execute)
//!   - an endpoint below the maximum rank
//! - [`ScheduleValidator`] replays a schedule from scratch and evaluates the
//!   model's full [`ConstraintSet`](crate::models::ConstraintSet). It shares
//!   nothing with the search's incremental bookkeeping, so it also serves as
//!   the acceptance gate for solver output.

use crate::error::ScheduleError;
use crate::models::{
    ChainModel, PossessionTable, Rank, ResultSet, Schedule, Violation, ViolationType, MAX_NODES,
};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ConfigError>>;

/// An input configuration error.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Error category.
    pub kind: ConfigErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// `N` outside `2..=MAX_NODES`.
    InvalidNodeCount,
    /// Rank list length differs from `N`.
    RankCountMismatch,
    /// A rank below zero.
    NegativeRank,
    /// No node has rank 0.
    NoRankZero,
    /// An endpoint does not hold the maximum rank.
    EndpointNotMaximal,
}

impl ConfigError {
    fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ConfigError> for ScheduleError {
    fn from(err: ConfigError) -> Self {
        ScheduleError::configuration(err.message)
    }
}

/// Folds a batch of configuration errors into one [`ScheduleError`].
pub fn into_schedule_error(errors: Vec<ConfigError>) -> ScheduleError {
    let reason = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    ScheduleError::configuration(reason)
}

/// Checks the chain length.
pub fn check_node_count(nodes: usize) -> Result<(), ConfigError> {
    if (2..=MAX_NODES).contains(&nodes) {
        Ok(())
    } else {
        Err(ConfigError::new(
            ConfigErrorKind::InvalidNodeCount,
            format!("node count {nodes} outside supported range 2..={MAX_NODES}"),
        ))
    }
}

/// Checks a rank assignment for an `nodes`-node chain. Returns every problem found.
pub fn check_ranks(ranks: &[Rank], nodes: usize) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if ranks.len() != nodes {
        errors.push(ConfigError::new(
            ConfigErrorKind::RankCountMismatch,
            format!("{} ranks given for {} nodes", ranks.len(), nodes),
        ));
        return errors;
    }

    for (node, &rank) in ranks.iter().enumerate() {
        if rank < 0 {
            errors.push(ConfigError::new(
                ConfigErrorKind::NegativeRank,
                format!("node {node} has negative rank {rank}"),
            ));
        }
    }

    if !ranks.contains(&0) {
        errors.push(ConfigError::new(
            ConfigErrorKind::NoRankZero,
            "no node has rank 0",
        ));
    }

    // Both endpoints must carry the maximum rank; ties with intermediates are fine.
    if let Some(&max) = ranks.iter().max() {
        for endpoint in [0, nodes - 1] {
            if ranks[endpoint] != max {
                errors.push(ConfigError::new(
                    ConfigErrorKind::EndpointNotMaximal,
                    format!(
                        "endpoint {endpoint} has rank {} below the maximum rank {max}",
                        ranks[endpoint]
                    ),
                ));
            }
        }
    }

    errors
}

/// Validates problem input.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(nodes: usize, ranks: &[Rank]) -> ValidationResult {
    let mut errors = Vec::new();

    if let Err(e) = check_node_count(nodes) {
        errors.push(e);
    }
    if nodes > 0 {
        errors.extend(check_ranks(ranks, nodes));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Independent correctness gate for schedules.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleValidator<'a> {
    model: &'a ChainModel,
}

impl<'a> ScheduleValidator<'a> {
    pub fn new(model: &'a ChainModel) -> Self {
        Self { model }
    }

    /// Rebuilds `holds(i, k, t)` from the schedule's executions and messages.
    ///
    /// Payloads are trusted here; whether the sender really held them is
    /// judged afterwards by the send-feasibility rule.
    pub fn replay(&self, schedule: &Schedule) -> PossessionTable {
        let n = self.model.node_count();
        let horizon = self.model.horizon;
        let mut table = PossessionTable::new(n, horizon);

        let mut executes_at: Vec<Vec<usize>> = vec![Vec::new(); horizon + 1];
        for e in &schedule.executions {
            if e.node < n && e.time <= horizon {
                executes_at[e.time].push(e.node);
            }
        }
        let mut delivered_at: Vec<Vec<(usize, ResultSet)>> = vec![Vec::new(); horizon + 1];
        for m in &schedule.messages {
            if m.to < n && m.time < horizon {
                delivered_at[m.delivered_at()].push((m.to, m.payload));
            }
        }

        let mut row = vec![ResultSet::EMPTY; n];
        for t in 0..=horizon {
            for &(to, payload) in &delivered_at[t] {
                row[to] = row[to].union(payload);
            }
            for &node in &executes_at[t] {
                row[node].insert(node);
            }
            table.set_row(t, &row);
        }
        table
    }

    /// Replays `schedule` and checks every active rule.
    pub fn validate(&self, schedule: &Schedule) -> Result<(), Vec<Violation>> {
        let table = self.replay(schedule);
        self.validate_with_possession(schedule, &table)
    }

    /// Checks `schedule` against a claimed possession table.
    pub fn validate_with_possession(
        &self,
        schedule: &Schedule,
        table: &PossessionTable,
    ) -> Result<(), Vec<Violation>> {
        if table.node_count() != self.model.node_count() || table.horizon() != self.model.horizon
        {
            return Err(vec![Violation::new(
                ViolationType::Propagation,
                0,
                format!(
                    "possession table is {}x{}, model is {}x{}",
                    table.node_count(),
                    table.horizon() + 1,
                    self.model.node_count(),
                    self.model.horizon + 1
                ),
            )]);
        }

        let violations = self.model.constraints.check(self.model, schedule, table);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn is_valid(&self, schedule: &Schedule) -> bool {
        self.validate(schedule).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::ModelBuilder;
    use crate::models::{Execution, MessageEvent};

    #[test]
    fn test_valid_input() {
        assert!(validate_input(5, &[3, 0, 1, 2, 3]).is_ok());
        assert!(validate_input(2, &[0, 0]).is_ok());
        assert!(validate_input(5, &[2, 0, 2, 0, 2]).is_ok());
    }

    #[test]
    fn test_node_count_out_of_range() {
        let errors = validate_input(1, &[0]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ConfigErrorKind::InvalidNodeCount));

        let ranks = vec![0; 65];
        let errors = validate_input(65, &ranks).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ConfigErrorKind::InvalidNodeCount));
    }

    #[test]
    fn test_zero_nodes() {
        let errors = validate_input(0, &[]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ConfigErrorKind::InvalidNodeCount);
    }

    #[test]
    fn test_rank_count_mismatch() {
        let errors = validate_input(4, &[1, 0, 1]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ConfigErrorKind::RankCountMismatch));
    }

    #[test]
    fn test_negative_rank() {
        let errors = validate_input(3, &[1, -1, 1]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ConfigErrorKind::NegativeRank));
    }

    #[test]
    fn test_no_rank_zero() {
        let errors = validate_input(3, &[2, 1, 2]).unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ConfigErrorKind::NoRankZero));
    }

    #[test]
    fn test_single_maximal_endpoint_rejected() {
        let errors = validate_input(4, &[2, 0, 1, 1]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ConfigErrorKind::EndpointNotMaximal);
        assert!(errors[0].message.contains("endpoint 3"));
    }

    #[test]
    fn test_endpoints_at_rank_zero_below_middle() {
        // Middle node outranks both endpoints.
        let errors = validate_input(3, &[0, 1, 0]).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_multiple_errors_folded() {
        let errors = validate_input(3, &[-1, 2, 1]).unwrap_err();
        assert!(errors.len() >= 3);
        let err = into_schedule_error(errors);
        match err {
            ScheduleError::Configuration { reason } => {
                assert!(reason.contains("negative rank"));
                assert!(reason.contains("; "));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    fn doubling_schedule() -> (ChainModel, Schedule) {
        // ranks [2,0,1,0,2], T=3: the optimal 6-message schedule.
        let model = ModelBuilder::new(5, 3, vec![2, 0, 1, 0, 2]).build().unwrap();
        let all: ResultSet = [1, 2, 3].into_iter().collect();
        let mut s = Schedule::new();
        s.add_execution(Execution::new(1, 0));
        s.add_execution(Execution::new(3, 0));
        s.add_execution(Execution::new(2, 1));
        s.add_message(MessageEvent::new(1, 2, 0, ResultSet::singleton(1)));
        s.add_message(MessageEvent::new(3, 2, 0, ResultSet::singleton(3)));
        s.add_message(MessageEvent::new(2, 1, 1, all));
        s.add_message(MessageEvent::new(2, 3, 1, all));
        s.add_message(MessageEvent::new(1, 0, 2, all));
        s.add_message(MessageEvent::new(3, 4, 2, all));
        (model, s)
    }

    #[test]
    fn test_replay_and_validate() {
        let (model, schedule) = doubling_schedule();
        let validator = ScheduleValidator::new(&model);
        let table = validator.replay(&schedule);
        assert!(table.holds(2, 1, 1));
        assert!(table.holds(2, 2, 1));
        assert!(!table.holds(2, 2, 0));
        assert_eq!(table.get(3, 0).len(), 3);
        assert!(validator.validate(&schedule).is_ok());
        assert!(validator.is_valid(&schedule));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let (model, schedule) = doubling_schedule();
        let validator = ScheduleValidator::new(&model);
        for _ in 0..3 {
            assert!(validator.validate(&schedule).is_ok());
        }
    }

    #[test]
    fn test_premature_execution_rejected() {
        let (model, mut schedule) = doubling_schedule();
        schedule.executions[2].time = 0;
        let violations = ScheduleValidator::new(&model)
            .validate(&schedule)
            .unwrap_err();
        assert!(violations
            .iter()
            .any(|v| v.violation_type == ViolationType::RankEnablement && v.node == 2));
    }

    #[test]
    fn test_forwarding_unheld_result_rejected() {
        let (model, mut schedule) = doubling_schedule();
        // Node 1 forwards node 2's result at t=0, before node 2 has executed.
        schedule.messages[0].payload = [1, 2].into_iter().collect();
        let violations = ScheduleValidator::new(&model)
            .validate(&schedule)
            .unwrap_err();
        assert!(violations
            .iter()
            .any(|v| v.violation_type == ViolationType::SendFeasibility));
    }

    #[test]
    fn test_missing_final_hop_rejected() {
        let (model, mut schedule) = doubling_schedule();
        schedule.messages.pop();
        let violations = ScheduleValidator::new(&model)
            .validate(&schedule)
            .unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].violation_type, ViolationType::BoundaryCompleteness);
        assert_eq!(violations[0].node, 4);
    }

    #[test]
    fn test_claimed_table_shape_mismatch() {
        let (model, schedule) = doubling_schedule();
        let table = PossessionTable::new(5, 2);
        let violations = ScheduleValidator::new(&model)
            .validate_with_possession(&schedule, &table)
            .unwrap_err();
        assert_eq!(violations.len(), 1);
    }
}
