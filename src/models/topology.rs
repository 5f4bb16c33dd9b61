//! Line-graph topology.
//!
//! Nodes `0..N` form a chain: node `i` is adjacent to `i - 1` and `i + 1`
//! where those exist. Nodes `0` and `N - 1` are the endpoints; everything in
//! between is an intermediate node that executes exactly once and owns a
//! result.

use serde::{Deserialize, Serialize};

use super::ResultSet;
use crate::error::Result;
use crate::validation;

/// Immutable description of an `N`-node chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    nodes: usize,
}

impl Topology {
    /// Creates a chain of `nodes` nodes.
    ///
    /// # Errors
    /// `ScheduleError::Configuration` if `nodes` is outside `2..=MAX_NODES`.
    pub fn new(nodes: usize) -> Result<Self> {
        validation::check_node_count(nodes)?;
        Ok(Self::from_validated(nodes))
    }

    /// Creates a chain whose node count was already checked.
    pub(crate) fn from_validated(nodes: usize) -> Self {
        Self { nodes }
    }

    /// Number of nodes `N`.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// Index of the last node, `N - 1`.
    #[inline]
    pub fn last(&self) -> usize {
        self.nodes - 1
    }

    #[inline]
    pub fn is_endpoint(&self, node: usize) -> bool {
        node == 0 || node == self.last()
    }

    #[inline]
    pub fn is_intermediate(&self, node: usize) -> bool {
        node > 0 && node < self.last()
    }

    /// Intermediate node ids `1..=N-2` in ascending order.
    pub fn intermediates(&self) -> std::ops::Range<usize> {
        1..self.last()
    }

    /// Every result-origin id as a set.
    pub fn all_results(&self) -> ResultSet {
        self.intermediates().collect()
    }

    /// Neighbours of `node` (left first).
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> {
        let left = node.checked_sub(1);
        let right = (node + 1 < self.nodes).then_some(node + 1);
        left.into_iter().chain(right)
    }

    #[inline]
    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        a < self.nodes && b < self.nodes && a.abs_diff(b) == 1
    }

    /// Hop count between two nodes.
    #[inline]
    pub fn distance(&self, a: usize, b: usize) -> usize {
        a.abs_diff(b)
    }

    /// All directed edges `(from, to)`, ordered by `from`, left target first.
    pub fn directed_edges(&self) -> Vec<(usize, usize)> {
        (0..self.nodes)
            .flat_map(|from| self.neighbors(from).map(move |to| (from, to)))
            .collect()
    }

    /// Minimum hops any single result needs to reach both endpoints.
    ///
    /// Node 1's result must travel to `N - 1`, so this is `N - 2` for chains
    /// with intermediates and `0` otherwise.
    pub fn min_spanning_hops(&self) -> usize {
        self.nodes.saturating_sub(2)
    }

    /// Horizon past which extra steps cannot lower the message count: `N²`.
    ///
    /// In a minimum schedule every message other than a rank-0 announcement
    /// adds at least one result to its receiver. Each of the `N` nodes gains
    /// at most `N - 2` results, so such a schedule sends fewer than `N²`
    /// messages. Steps without a
    /// message change nothing and can be dropped, so such a schedule fits in
    /// `N²` steps.
    pub fn saturation_horizon(&self) -> usize {
        self.nodes * self.nodes
    }
}
