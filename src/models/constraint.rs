//! Propagation constraints.
//!
//! Defines the rules a valid schedule must satisfy and evaluates them as
//! pure predicates. The same bank serves two callers: the validator checks a
//! finished schedule against its possession table, and the search asks the
//! incremental questions (may this node execute, may this edge carry a
//! message, can the horizon still be met).
//!
//! # Timing
//! A message sent at `t` carries the sender's holdings at `t` and is
//! delivered at `t + 1`, so a result moves at most one hop per step.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{
    ChainModel, PossessionTable, ResultSet, Schedule, ScheduleState, Violation, ViolationType,
};

/// A single rule of the propagation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    /// Every intermediate node executes exactly once within `[0, T]`.
    TaskExecution,
    /// Execution waits for every lower-rank result; rank 0 executes at `t = 0`.
    RankEnablement,
    /// Possession grows only through delivered messages and own execution.
    Propagation,
    /// `holds(i, i, t)` iff `i` has executed by `t`.
    SelfResult,
    /// At `t = 0` a node holds at most its own fresh result.
    Initialization,
    /// Both endpoints hold every intermediate result at `T`.
    BoundaryCompleteness,
    /// Payloads are non-empty subsets of the sender's holdings.
    SendFeasibility,
    /// Messages travel between neighbours only.
    Adjacency,
    /// Each rank-0 node sends at least once to a strictly higher-rank neighbour.
    Rank0Announce,
}

impl Rule {
    /// Rules of the base model.
    pub const STANDARD: [Rule; 8] = [
        Rule::TaskExecution,
        Rule::RankEnablement,
        Rule::Propagation,
        Rule::SelfResult,
        Rule::Initialization,
        Rule::BoundaryCompleteness,
        Rule::SendFeasibility,
        Rule::Adjacency,
    ];
}

/// The active rules of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSet {
    rules: Vec<Rule>,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl ConstraintSet {
    /// The base rule bank.
    pub fn standard() -> Self {
        Self {
            rules: Rule::STANDARD.to_vec(),
        }
    }

    /// Adds a rule (no-op if already active).
    pub fn with_rule(mut self, rule: Rule) -> Self {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
        self
    }

    pub fn contains(&self, rule: Rule) -> bool {
        self.rules.contains(&rule)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluates every active rule against `schedule` and its possession table.
    pub fn check(
        &self,
        model: &ChainModel,
        schedule: &Schedule,
        table: &PossessionTable,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for &rule in &self.rules {
            violations.extend(check_rule(rule, model, schedule, table));
        }
        violations
    }

    // ---- search-time predicates ----

    /// Whether `node` may execute at the state's current step.
    pub fn may_execute(model: &ChainModel, state: &ScheduleState, node: usize) -> bool {
        if !model.topology.is_intermediate(node) || state.is_executed(node) {
            return false;
        }
        if model.ranks.rank(node) == 0 {
            return state.time() == 0;
        }
        model.ranks.dependencies(node).is_subset(state.held(node))
    }

    /// Whether `from → to` may carry a message at the current step.
    pub fn may_send(model: &ChainModel, state: &ScheduleState, from: usize, to: usize) -> bool {
        model.topology.are_adjacent(from, to)
            && state.time() <= model.horizon
            && !state.held(from).is_empty()
    }

    /// Earliest step each intermediate can execute if every node forwards
    /// everything it holds from now on.
    ///
    /// Executed nodes report their actual step. `None` marks a node that can
    /// no longer execute (a rank-0 node past `t = 0`).
    pub fn earliest_executions(model: &ChainModel, state: &ScheduleState) -> Vec<Option<usize>> {
        let mut est = vec![None; model.node_count()];
        for &k in model.ranks.by_rank() {
            est[k] = match state.exec_time(k) {
                Some(t) => Some(t),
                None if model.ranks.rank(k) == 0 => (state.time() == 0).then_some(0),
                None => {
                    let mut earliest = Some(state.time());
                    for j in model.ranks.dependencies(k) {
                        earliest = match (earliest, arrival(model, state, &est, j, k)) {
                            (Some(a), Some(b)) => Some(a.max(b)),
                            _ => None,
                        };
                    }
                    earliest
                }
            };
        }
        est
    }

    /// Earliest step both endpoints can be complete, or `None` if some result
    /// can never be produced.
    pub fn earliest_completion(model: &ChainModel, state: &ScheduleState) -> Option<usize> {
        let est = Self::earliest_executions(model, state);
        let endpoints = [0, model.topology.last()];
        let mut completion = state.time();
        for k in model.topology.intermediates() {
            for &e in &endpoints {
                completion = completion.max(arrival(model, state, &est, k, e)?);
            }
        }
        Some(completion)
    }

    /// Whether boundary completeness is still reachable by `T`.
    pub fn horizon_reachable(model: &ChainModel, state: &ScheduleState) -> bool {
        Self::earliest_completion(model, state).is_some_and(|t| t <= model.horizon)
    }
}

/// Earliest step `target` can hold result `origin`.
fn arrival(
    model: &ChainModel,
    state: &ScheduleState,
    est: &[Option<usize>],
    origin: usize,
    target: usize,
) -> Option<usize> {
    let now = state.time();
    let topo = &model.topology;
    let mut best: Option<usize> = None;
    for holder in 0..topo.node_count() {
        let from_here = if state.held(holder).contains(origin) {
            now
        } else if state.inbox(holder).contains(origin) {
            now + 1
        } else {
            continue;
        };
        let t = from_here + topo.distance(holder, target);
        best = Some(best.map_or(t, |b| b.min(t)));
    }
    best.or_else(|| est[origin].map(|e| e + topo.distance(origin, target)))
}

fn check_rule(
    rule: Rule,
    model: &ChainModel,
    schedule: &Schedule,
    table: &PossessionTable,
) -> Vec<Violation> {
    match rule {
        Rule::TaskExecution => check_task_execution(model, schedule),
        Rule::RankEnablement => check_rank_enablement(model, schedule, table),
        Rule::Propagation => check_propagation(model, schedule, table),
        Rule::SelfResult => check_self_result(model, schedule, table),
        Rule::Initialization => check_initialization(model, schedule, table),
        Rule::BoundaryCompleteness => check_boundary(model, table),
        Rule::SendFeasibility => check_send_feasibility(model, schedule, table),
        Rule::Adjacency => check_adjacency(model, schedule),
        Rule::Rank0Announce => check_rank0_announce(model, schedule),
    }
}

fn check_task_execution(model: &ChainModel, schedule: &Schedule) -> Vec<Violation> {
    let topo = &model.topology;
    let mut violations = Vec::new();
    let mut counts = vec![0usize; topo.node_count()];

    for e in &schedule.executions {
        if e.node >= topo.node_count() {
            violations.push(Violation::new(
                ViolationType::TaskExecution,
                e.node,
                format!("execution of unknown node {}", e.node),
            ));
            continue;
        }
        if topo.is_endpoint(e.node) {
            violations.push(Violation::new(
                ViolationType::TaskExecution,
                e.node,
                format!("endpoint {} must not execute", e.node),
            ));
        }
        if e.time > model.horizon {
            violations.push(Violation::new(
                ViolationType::TaskExecution,
                e.node,
                format!("node {} executes at {} past horizon {}", e.node, e.time, model.horizon),
            ));
        }
        counts[e.node] += 1;
    }

    for i in topo.intermediates() {
        if counts[i] != 1 {
            violations.push(Violation::new(
                ViolationType::TaskExecution,
                i,
                format!("node {} executes {} times, expected exactly once", i, counts[i]),
            ));
        }
    }
    violations
}

fn check_rank_enablement(
    model: &ChainModel,
    schedule: &Schedule,
    table: &PossessionTable,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for e in &schedule.executions {
        if !model.topology.is_intermediate(e.node) || e.time > model.horizon {
            continue;
        }
        if model.ranks.rank(e.node) == 0 {
            if e.time != 0 {
                violations.push(Violation::new(
                    ViolationType::RankEnablement,
                    e.node,
                    format!("rank-0 node {} executes at {} instead of 0", e.node, e.time),
                ));
            }
            continue;
        }
        let missing = model
            .ranks
            .dependencies(e.node)
            .difference(table.get(e.time, e.node));
        if !missing.is_empty() {
            violations.push(Violation::new(
                ViolationType::RankEnablement,
                e.node,
                format!(
                    "node {} executes at {} without lower-rank results {}",
                    e.node, e.time, missing
                ),
            ));
        }
    }
    violations
}

/// First valid execution step per node (for possession checks).
fn execution_steps(model: &ChainModel, schedule: &Schedule) -> Vec<Option<usize>> {
    let mut steps = vec![None; model.node_count()];
    for e in &schedule.executions {
        if e.node < steps.len() && steps[e.node].is_none() {
            steps[e.node] = Some(e.time);
        }
    }
    steps
}

fn check_propagation(
    model: &ChainModel,
    schedule: &Schedule,
    table: &PossessionTable,
) -> Vec<Violation> {
    let n = model.node_count();
    let exec = execution_steps(model, schedule);
    let mut violations = Vec::new();

    for t in 0..model.horizon {
        let mut delivered = vec![ResultSet::EMPTY; n];
        for m in schedule.messages.iter().filter(|m| m.time == t && m.to < n) {
            delivered[m.to] = delivered[m.to].union(m.payload);
        }
        for j in 0..n {
            let mut expected = table.get(t, j).union(delivered[j]);
            if exec[j] == Some(t + 1) {
                expected.insert(j);
            }
            let actual = table.get(t + 1, j);
            if actual != expected {
                violations.push(Violation::new(
                    ViolationType::Propagation,
                    j,
                    format!(
                        "node {} holds {} at {} but deliveries give {}",
                        j,
                        actual,
                        t + 1,
                        expected
                    ),
                ));
            }
        }
    }
    violations
}

fn check_self_result(
    model: &ChainModel,
    schedule: &Schedule,
    table: &PossessionTable,
) -> Vec<Violation> {
    let topo = &model.topology;
    let exec = execution_steps(model, schedule);
    let results = topo.all_results();
    let mut violations = Vec::new();

    for t in 0..=model.horizon {
        for i in 0..topo.node_count() {
            let held = table.get(t, i);
            let foreign = held.difference(results);
            if !foreign.is_empty() {
                violations.push(Violation::new(
                    ViolationType::SelfResult,
                    i,
                    format!("node {} holds non-result ids {} at {}", i, foreign, t),
                ));
            }
            if topo.is_intermediate(i) {
                let executed = exec[i].is_some_and(|e| e <= t);
                if held.contains(i) != executed {
                    violations.push(Violation::new(
                        ViolationType::SelfResult,
                        i,
                        format!(
                            "node {} own-result possession {} disagrees with execution at {:?} (t={})",
                            i,
                            held.contains(i),
                            exec[i],
                            t
                        ),
                    ));
                }
            }
        }
    }
    violations
}

fn check_initialization(
    model: &ChainModel,
    schedule: &Schedule,
    table: &PossessionTable,
) -> Vec<Violation> {
    let exec = execution_steps(model, schedule);
    let mut violations = Vec::new();
    for i in 0..model.node_count() {
        let expected = if model.topology.is_intermediate(i) && exec[i] == Some(0) {
            ResultSet::singleton(i)
        } else {
            ResultSet::EMPTY
        };
        let actual = table.get(0, i);
        if actual != expected {
            violations.push(Violation::new(
                ViolationType::Initialization,
                i,
                format!("node {} holds {} at t=0, expected {}", i, actual, expected),
            ));
        }
    }
    violations
}

fn check_boundary(model: &ChainModel, table: &PossessionTable) -> Vec<Violation> {
    let topo = &model.topology;
    let all = topo.all_results();
    let mut violations = Vec::new();
    for endpoint in [0, topo.last()] {
        let missing = all.difference(table.get(model.horizon, endpoint));
        if !missing.is_empty() {
            violations.push(Violation::boundary(
                endpoint,
                format!(
                    "endpoint {} lacks results {} at T={}",
                    endpoint, missing, model.horizon
                ),
            ));
        }
    }
    violations
}

fn check_send_feasibility(
    model: &ChainModel,
    schedule: &Schedule,
    table: &PossessionTable,
) -> Vec<Violation> {
    let n = model.node_count();
    let results = model.topology.all_results();
    let mut seen = HashSet::new();
    let mut violations = Vec::new();

    for m in &schedule.messages {
        if !seen.insert((m.from, m.to, m.time)) {
            violations.push(Violation::send_feasibility(
                m.from,
                format!("duplicate message {} -> {} at {}", m.from, m.to, m.time),
            ));
        }
        if m.payload.is_empty() {
            violations.push(Violation::send_feasibility(
                m.from,
                format!("empty message {} -> {} at {}", m.from, m.to, m.time),
            ));
        }
        if !m.payload.is_subset(results) {
            violations.push(Violation::send_feasibility(
                m.from,
                format!("payload {} carries non-result ids", m.payload),
            ));
        }
        if m.time > model.horizon {
            violations.push(Violation::send_feasibility(
                m.from,
                format!("message at {} past horizon {}", m.time, model.horizon),
            ));
            continue;
        }
        if m.from >= n {
            continue;
        }
        let held = table.get(m.time, m.from);
        if !m.payload.is_subset(held) {
            violations.push(Violation::send_feasibility(
                m.from,
                format!(
                    "node {} sends {} at {} but holds only {}",
                    m.from, m.payload, m.time, held
                ),
            ));
        }
    }
    violations
}

fn check_adjacency(model: &ChainModel, schedule: &Schedule) -> Vec<Violation> {
    schedule
        .messages
        .iter()
        .filter(|m| !model.topology.are_adjacent(m.from, m.to))
        .map(|m| {
            Violation::new(
                ViolationType::Adjacency,
                m.from,
                format!("message {} -> {} crosses non-adjacent nodes", m.from, m.to),
            )
        })
        .collect()
}

fn check_rank0_announce(model: &ChainModel, schedule: &Schedule) -> Vec<Violation> {
    let topo = &model.topology;
    let ranks = &model.ranks;
    let mut violations = Vec::new();
    for i in 0..topo.node_count() {
        if ranks.rank(i) != 0 {
            continue;
        }
        let higher: Vec<usize> = topo.neighbors(i).filter(|&j| ranks.rank(j) > 0).collect();
        if higher.is_empty() {
            continue;
        }
        let announced = schedule
            .messages
            .iter()
            .any(|m| m.from == i && higher.contains(&m.to));
        if !announced {
            violations.push(Violation::new(
                ViolationType::Rank0Announce,
                i,
                format!("rank-0 node {} never sends to a higher-rank neighbour", i),
            ));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::ModelBuilder;
    use crate::models::{Execution, MessageEvent};

    fn model(ranks: Vec<i32>, horizon: usize) -> ChainModel {
        let n = ranks.len();
        ModelBuilder::new(n, horizon, ranks).build().unwrap()
    }

    /// N=3, ranks [1,0,1], T=1: node 1 executes at 0 and tells both ends.
    fn three_node_schedule() -> (ChainModel, Schedule, PossessionTable) {
        let m = model(vec![1, 0, 1], 1);
        let mut s = Schedule::new();
        s.add_execution(Execution::new(1, 0));
        s.add_message(MessageEvent::new(1, 0, 0, ResultSet::singleton(1)));
        s.add_message(MessageEvent::new(1, 2, 0, ResultSet::singleton(1)));
        let mut table = PossessionTable::new(3, 1);
        table.set(0, 1, ResultSet::singleton(1));
        table.set_row(1, &[ResultSet::singleton(1); 3]);
        (m, s, table)
    }

    #[test]
    fn test_valid_schedule_has_no_violations() {
        let (m, s, table) = three_node_schedule();
        assert!(m.constraints.check(&m, &s, &table).is_empty());
    }

    #[test]
    fn test_missing_execution() {
        let (m, mut s, table) = three_node_schedule();
        s.executions.clear();
        let v = m.constraints.check(&m, &s, &table);
        assert!(v.iter().any(|v| v.violation_type == ViolationType::TaskExecution));
        assert!(v.iter().any(|v| v.violation_type == ViolationType::SelfResult));
    }

    #[test]
    fn test_endpoint_execution_rejected() {
        let (m, mut s, _) = three_node_schedule();
        s.add_execution(Execution::new(0, 0));
        let v = check_task_execution(&m, &s);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].node, 0);
    }

    #[test]
    fn test_send_without_holding() {
        let (m, mut s, table) = three_node_schedule();
        s.add_message(MessageEvent::new(0, 1, 0, ResultSet::singleton(1)));
        let v = check_send_feasibility(&m, &s, &table);
        assert_eq!(v.len(), 1);
        assert!(v[0].message.contains("holds only"));
    }

    #[test]
    fn test_duplicate_and_empty_messages() {
        let (m, mut s, table) = three_node_schedule();
        s.add_message(MessageEvent::new(1, 0, 0, ResultSet::singleton(1)));
        s.add_message(MessageEvent::new(1, 2, 1, ResultSet::EMPTY));
        let v = check_send_feasibility(&m, &s, &table);
        assert!(v.iter().any(|v| v.message.contains("duplicate")));
        assert!(v.iter().any(|v| v.message.contains("empty")));
    }

    #[test]
    fn test_non_adjacent_message() {
        let (m, mut s, _) = three_node_schedule();
        s.add_message(MessageEvent::new(0, 2, 0, ResultSet::singleton(1)));
        assert_eq!(check_adjacency(&m, &s).len(), 1);
    }

    #[test]
    fn test_boundary_incomplete() {
        let (m, _, mut table) = three_node_schedule();
        table.set(1, 2, ResultSet::EMPTY);
        let v = check_boundary(&m, &table);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].node, 2);
    }

    #[test]
    fn test_propagation_detects_phantom_result() {
        let (m, mut s, table) = three_node_schedule();
        // Node 0 still claims the result at t=1 with no message carrying it.
        s.messages.retain(|msg| msg.to != 0);
        let v = check_propagation(&m, &s, &table);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].node, 0);
    }

    #[test]
    fn test_initialization() {
        let (m, s, mut table) = three_node_schedule();
        table.set(0, 2, ResultSet::singleton(1));
        let v = check_initialization(&m, &s, &table);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].node, 2);
    }

    #[test]
    fn test_rank_enablement_requires_lower_results() {
        let m = model(vec![2, 0, 1, 0, 2], 3);
        let mut s = Schedule::new();
        s.add_execution(Execution::new(1, 0));
        s.add_execution(Execution::new(3, 0));
        s.add_execution(Execution::new(2, 1));
        let mut table = PossessionTable::new(5, 3);
        table.set(0, 1, ResultSet::singleton(1));
        table.set(0, 3, ResultSet::singleton(3));
        // Node 2 only received node 1's result by t=1.
        table.set(1, 2, [1, 2].into_iter().collect());
        let v = check_rank_enablement(&m, &s, &table);
        assert_eq!(v.len(), 1);
        assert!(v[0].message.contains("{3}"));
    }

    #[test]
    fn test_rank0_late_execution() {
        let m = model(vec![1, 0, 1], 2);
        let mut s = Schedule::new();
        s.add_execution(Execution::new(1, 1));
        let table = PossessionTable::new(3, 2);
        let v = check_rank_enablement(&m, &s, &table);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_rank0_announce() {
        let (m, s, _) = three_node_schedule();
        assert!(check_rank0_announce(&m, &s).is_empty());
        let mut silent = s.clone();
        silent.messages.clear();
        assert_eq!(check_rank0_announce(&m, &silent).len(), 1);
    }

    #[test]
    fn test_may_execute() {
        let m = model(vec![2, 0, 1, 0, 2], 3);
        let mut state = m.empty_state();
        assert!(ConstraintSet::may_execute(&m, &state, 1));
        assert!(!ConstraintSet::may_execute(&m, &state, 2));
        assert!(!ConstraintSet::may_execute(&m, &state, 0));
        state.execute(1);
        state.execute(3);
        state.send(1, 2);
        state.send(3, 2);
        state.advance();
        assert!(ConstraintSet::may_execute(&m, &state, 2));
        assert!(!ConstraintSet::may_execute(&m, &state, 1));
    }

    #[test]
    fn test_may_send() {
        let m = model(vec![1, 0, 1], 1);
        let mut state = m.empty_state();
        assert!(!ConstraintSet::may_send(&m, &state, 1, 0));
        state.execute(1);
        assert!(ConstraintSet::may_send(&m, &state, 1, 0));
        assert!(!ConstraintSet::may_send(&m, &state, 0, 1));
        assert!(!ConstraintSet::may_send(&m, &state, 1, 1));
    }

    #[test]
    fn test_earliest_executions_sequential_chain() {
        let m = model(vec![3, 0, 1, 2, 3], 5);
        let state = m.empty_state();
        let est = ConstraintSet::earliest_executions(&m, &state);
        assert_eq!(est[1], Some(0));
        assert_eq!(est[2], Some(1));
        assert_eq!(est[3], Some(2));
        assert_eq!(ConstraintSet::earliest_completion(&m, &state), Some(5));
        assert!(ConstraintSet::horizon_reachable(&m, &state));
    }

    #[test]
    fn test_horizon_unreachable() {
        let m = model(vec![3, 0, 1, 2, 3], 4);
        assert!(!ConstraintSet::horizon_reachable(&m, &m.empty_state()));
    }

    #[test]
    fn test_rank0_missed_start_is_unreachable() {
        let m = model(vec![1, 0, 1], 3);
        let mut state = m.empty_state();
        state.advance();
        assert_eq!(ConstraintSet::earliest_completion(&m, &state), None);
    }

    #[test]
    fn test_with_rule_is_idempotent() {
        let set = ConstraintSet::standard()
            .with_rule(Rule::Rank0Announce)
            .with_rule(Rule::Rank0Announce);
        assert_eq!(set.rules().len(), Rule::STANDARD.len() + 1);
        assert!(set.contains(Rule::Rank0Announce));
        assert!(!ConstraintSet::standard().contains(Rule::Rank0Announce));
    }
}
