//! Search state: executions, messages, and result possession over time.
//!
//! The possession relation `holds(i, k, t)` is stored as a flat
//! [`PossessionTable`] indexed by `(t, i)`, each cell a [`ResultSet`] over
//! result origins `k`. A [`ScheduleState`] is owned by exactly one search
//! branch; branching clones it.

use serde::{Deserialize, Serialize};

use super::{MessageEvent, ResultSet, Topology};

/// `holds(i, k, t)` for `t ∈ [0, horizon]`, one row of `N` cells per step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossessionTable {
    nodes: usize,
    horizon: usize,
    cells: Vec<ResultSet>,
}

impl PossessionTable {
    /// All-empty table.
    pub fn new(nodes: usize, horizon: usize) -> Self {
        Self {
            nodes,
            horizon,
            cells: vec![ResultSet::EMPTY; nodes * (horizon + 1)],
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Results node `node` holds at step `t`.
    #[inline]
    pub fn get(&self, t: usize, node: usize) -> ResultSet {
        self.cells[t * self.nodes + node]
    }

    #[inline]
    pub fn set(&mut self, t: usize, node: usize, held: ResultSet) {
        self.cells[t * self.nodes + node] = held;
    }

    /// `holds(node, origin, t)`.
    #[inline]
    pub fn holds(&self, node: usize, origin: usize, t: usize) -> bool {
        self.get(t, node).contains(origin)
    }

    /// Row `t` (one cell per node).
    pub fn row(&self, t: usize) -> &[ResultSet] {
        &self.cells[t * self.nodes..(t + 1) * self.nodes]
    }

    /// Overwrites row `t`.
    pub fn set_row(&mut self, t: usize, row: &[ResultSet]) {
        self.cells[t * self.nodes..(t + 1) * self.nodes].copy_from_slice(row);
    }
}

/// A partially or fully decided schedule.
///
/// Steps run in three phases: executions at `time`, then message decisions
/// for `time` (payloads read from `held`, deliveries buffered in `inbox`),
/// then [`advance`](Self::advance) merges the inbox and moves to `time + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleState {
    time: usize,
    horizon: usize,
    held: Vec<ResultSet>,
    inbox: Vec<ResultSet>,
    exec_time: Vec<Option<usize>>,
    messages: Vec<MessageEvent>,
    possession: PossessionTable,
}

impl ScheduleState {
    /// Empty state at `t = 0`: nothing executed, nothing held.
    pub fn new(topology: &Topology, horizon: usize) -> Self {
        let n = topology.node_count();
        Self {
            time: 0,
            horizon,
            held: vec![ResultSet::EMPTY; n],
            inbox: vec![ResultSet::EMPTY; n],
            exec_time: vec![None; n],
            messages: Vec::new(),
            possession: PossessionTable::new(n, horizon),
        }
    }

    /// Current step.
    #[inline]
    pub fn time(&self) -> usize {
        self.time
    }

    #[inline]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Steps left after the current one.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.horizon - self.time
    }

    /// Results `node` holds at the current step.
    #[inline]
    pub fn held(&self, node: usize) -> ResultSet {
        self.held[node]
    }

    /// Results already in flight to `node`, landing next step.
    #[inline]
    pub fn inbox(&self, node: usize) -> ResultSet {
        self.inbox[node]
    }

    /// What `node` will hold next step given the decisions made so far.
    #[inline]
    pub fn held_next(&self, node: usize) -> ResultSet {
        self.held[node].union(self.inbox[node])
    }

    #[inline]
    pub fn exec_time(&self, node: usize) -> Option<usize> {
        self.exec_time[node]
    }

    #[inline]
    pub fn is_executed(&self, node: usize) -> bool {
        self.exec_time[node].is_some()
    }

    pub fn messages(&self) -> &[MessageEvent] {
        &self.messages
    }

    #[inline]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn possession(&self) -> &PossessionTable {
        &self.possession
    }

    /// Node `node` executes at the current step and gains its own result.
    pub fn execute(&mut self, node: usize) {
        debug_assert!(self.exec_time[node].is_none(), "node {node} executed twice");
        self.exec_time[node] = Some(self.time);
        self.held[node].insert(node);
    }

    /// `from` sends everything it holds to `to` at the current step.
    pub fn send(&mut self, from: usize, to: usize) {
        let payload = self.held[from];
        self.inbox[to] = self.inbox[to].union(payload);
        self.messages.push(MessageEvent::new(from, to, self.time, payload));
    }

    /// Seals the current step into the possession table.
    ///
    /// Call after the step's executions and before its messages are read back.
    pub fn record(&mut self) {
        self.possession.set_row(self.time, &self.held);
    }

    /// Delivers the inbox and moves to the next step.
    pub fn advance(&mut self) {
        debug_assert!(self.time < self.horizon);
        for (held, arriving) in self.held.iter_mut().zip(self.inbox.iter_mut()) {
            *held = held.union(*arriving);
            *arriving = ResultSet::EMPTY;
        }
        self.time += 1;
    }

    /// Whether both endpoints hold every intermediate result now.
    pub fn boundary_complete(&self, topology: &Topology) -> bool {
        let all = topology.all_results();
        all.is_subset(self.held[0]) && all.is_subset(self.held[topology.last()])
    }

    /// Carries the current holdings through the rest of the horizon.
    ///
    /// Used once the search has nothing left to decide.
    pub fn finish_idle(&mut self) {
        debug_assert!(self.inbox.iter().all(|s| s.is_empty()));
        for t in self.time..=self.horizon {
            self.possession.set_row(t, &self.held);
        }
        self.time = self.horizon;
    }
}
