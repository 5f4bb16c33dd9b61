//! The assembled problem: chain, ranks, horizon, and active constraints.

use serde::{Deserialize, Serialize};

use super::{ConstraintSet, RankTable, ScheduleState, Topology};

/// A fully validated propagation problem, ready for search.
///
/// Produced by [`ModelBuilder`](crate::cp::ModelBuilder); immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainModel {
    /// Line graph.
    pub topology: Topology,
    /// Dependency ranks.
    pub ranks: RankTable,
    /// Last time step `T` (inclusive).
    pub horizon: usize,
    /// Rules every accepted schedule must satisfy.
    pub constraints: ConstraintSet,
}

impl ChainModel {
    /// Number of nodes `N`.
    pub fn node_count(&self) -> usize {
        self.topology.node_count()
    }

    /// Number of intermediate nodes (results to propagate).
    pub fn result_count(&self) -> usize {
        self.topology.intermediates().len()
    }

    /// A fresh, undecided state at `t = 0`.
    pub fn empty_state(&self) -> ScheduleState {
        ScheduleState::new(&self.topology, self.horizon)
    }
}
