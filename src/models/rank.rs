//! Per-node dependency ranks.
//!
//! A node may execute only after it holds the result of every node with a
//! strictly lower rank. Rank-0 nodes wait for nothing. Endpoints carry the
//! maximum rank, so they never gate an intermediate node.

use serde::{Deserialize, Serialize};

use super::{ResultSet, Topology};
use crate::error::Result;
use crate::validation;

/// Node rank value.
pub type Rank = i32;

/// Immutable rank assignment for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTable {
    ranks: Vec<Rank>,
    /// Lower-rank intermediates per node (the results a node must hold to execute).
    dependencies: Vec<ResultSet>,
    /// Intermediates sorted by `(rank, index)`.
    order: Vec<usize>,
}

impl RankTable {
    /// Builds the table for `topology`.
    ///
    /// # Errors
    /// `ScheduleError::Configuration` when the ranks are malformed: wrong
    /// length, negative values, no rank-0 node, or an endpoint below the
    /// maximum rank.
    pub fn new(ranks: Vec<Rank>, topology: &Topology) -> Result<Self> {
        if let Some(err) = validation::check_ranks(&ranks, topology.node_count())
            .into_iter()
            .next()
        {
            return Err(err.into());
        }
        Ok(Self::from_validated(ranks, topology))
    }

    /// Builds the table from ranks that already passed `check_ranks`.
    pub(crate) fn from_validated(ranks: Vec<Rank>, topology: &Topology) -> Self {
        let dependencies = (0..ranks.len())
            .map(|i| {
                topology
                    .intermediates()
                    .filter(|&j| ranks[j] < ranks[i])
                    .collect()
            })
            .collect();

        let mut order: Vec<usize> = topology.intermediates().collect();
        order.sort_by_key(|&i| (ranks[i], i));

        Self {
            ranks,
            dependencies,
            order,
        }
    }

    #[inline]
    pub fn rank(&self, node: usize) -> Rank {
        self.ranks[node]
    }

    /// Raw rank list, indexed by node.
    pub fn as_slice(&self) -> &[Rank] {
        &self.ranks
    }

    /// Largest rank present.
    pub fn max_rank(&self) -> Rank {
        self.ranks.iter().copied().max().unwrap_or(0)
    }

    /// `{ j : rank(j) < rank(i) }`, endpoints included.
    pub fn lower_rank_nodes(&self, node: usize) -> ResultSet {
        let r = self.ranks[node];
        (0..self.ranks.len()).filter(|&j| self.ranks[j] < r).collect()
    }

    /// `{ j : rank(j) = rank(i), j ≠ i }`.
    pub fn same_rank(&self, node: usize) -> ResultSet {
        let r = self.ranks[node];
        (0..self.ranks.len())
            .filter(|&j| j != node && self.ranks[j] == r)
            .collect()
    }

    /// Results `node` must hold before it may execute.
    #[inline]
    pub fn dependencies(&self, node: usize) -> ResultSet {
        self.dependencies[node]
    }

    /// Intermediates in dependency order: rank ascending, ties by index.
    pub fn by_rank(&self) -> &[usize] {
        &self.order
    }
}
