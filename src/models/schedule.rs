//! Schedule (solution) model.
//!
//! A schedule is the externally consumable record of a solve: when each
//! intermediate node executes and every message exchanged between adjacent
//! nodes, in time order. Constraint violations found by the validator are
//! reported with the same vocabulary.

use serde::{Deserialize, Serialize};

use super::ResultSet;

/// A complete schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Execution facts, sorted by `(time, node)`.
    pub executions: Vec<Execution>,
    /// Message events, sorted by `(time, from, to)`.
    pub messages: Vec<MessageEvent>,
}

/// Node `node` executes its task at step `time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Execution {
    /// Executing node.
    pub node: usize,
    /// Execution step.
    pub time: usize,
}

/// A single adjacent-node transfer.
///
/// Sent at `time` from the sender's holdings at `time`, delivered at `time + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Sending node.
    pub from: usize,
    /// Receiving node (adjacent to `from`).
    pub to: usize,
    /// Send step.
    pub time: usize,
    /// Result origins carried.
    pub payload: ResultSet,
}

/// A constraint violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Node the violation is attributed to.
    pub node: usize,
    /// Human-readable description.
    pub message: String,
}

/// Classification of constraint violations, one per rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// An intermediate node executes zero or several times, or an endpoint executes.
    TaskExecution,
    /// A node executed before holding all lower-rank results.
    RankEnablement,
    /// Possession changed without a delivering message.
    Propagation,
    /// Own-result possession disagrees with the execution time.
    SelfResult,
    /// Something other than a fresh own result is held at `t = 0`.
    Initialization,
    /// An endpoint lacks an intermediate result at the horizon.
    BoundaryCompleteness,
    /// A message carries results its sender does not hold.
    SendFeasibility,
    /// A message between non-adjacent nodes.
    Adjacency,
    /// A rank-0 node never announced its result to a higher-rank neighbour.
    Rank0Announce,
}

impl Execution {
    pub fn new(node: usize, time: usize) -> Self {
        Self { node, time }
    }
}

impl MessageEvent {
    /// Creates a message event.
    pub fn new(from: usize, to: usize, time: usize, payload: ResultSet) -> Self {
        Self {
            from,
            to,
            time,
            payload,
        }
    }

    /// Step at which the payload lands.
    #[inline]
    pub fn delivered_at(&self) -> usize {
        self.time + 1
    }

    /// Whether the message carries only the sender's own result.
    ///
    /// Such a message starts a new propagation wave; anything else forwards
    /// results the sender received.
    pub fn is_generated(&self) -> bool {
        self.payload == ResultSet::singleton(self.from)
    }
}

impl Violation {
    /// Creates a violation.
    pub fn new(violation_type: ViolationType, node: usize, message: impl Into<String>) -> Self {
        Self {
            violation_type,
            node,
            message: message.into(),
        }
    }

    /// Creates a boundary-completeness violation.
    pub fn boundary(endpoint: usize, message: impl Into<String>) -> Self {
        Self::new(ViolationType::BoundaryCompleteness, endpoint, message)
    }

    /// Creates a send-feasibility violation.
    pub fn send_feasibility(sender: usize, message: impl Into<String>) -> Self {
        Self::new(ViolationType::SendFeasibility, sender, message)
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an execution.
    pub fn add_execution(&mut self, execution: Execution) {
        self.executions.push(execution);
    }

    /// Adds a message.
    pub fn add_message(&mut self, message: MessageEvent) {
        self.messages.push(message);
    }

    /// Restores canonical ordering.
    pub fn normalize(&mut self) {
        self.executions.sort_by_key(|e| (e.time, e.node));
        self.messages.sort_by_key(|m| (m.time, m.from, m.to));
    }

    /// Objective value: number of messages.
    pub fn total_messages(&self) -> usize {
        self.messages.len()
    }

    /// Execution step of `node`, if it executes (first one when duplicated).
    pub fn execution_time(&self, node: usize) -> Option<usize> {
        self.executions
            .iter()
            .find(|e| e.node == node)
            .map(|e| e.time)
    }

    /// Messages sent at step `time`.
    pub fn messages_at(&self, time: usize) -> Vec<&MessageEvent> {
        self.messages.iter().filter(|m| m.time == time).collect()
    }

    /// Messages sent by `node`.
    pub fn messages_from(&self, node: usize) -> Vec<&MessageEvent> {
        self.messages.iter().filter(|m| m.from == node).collect()
    }

    /// Latest execution step, or `None` if nothing executes.
    pub fn last_execution(&self) -> Option<usize> {
        self.executions.iter().map(|e| e.time).max()
    }
}
