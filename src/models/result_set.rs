//! Compact set of result-origin node ids.
//!
//! Possession (`holds(i, k, t)`) and message payloads are both sets of node
//! ids. Chains are capped at [`MAX_NODES`] so a set fits in one `u64`, which
//! keeps states cheap to copy when the search branches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest supported chain length.
pub const MAX_NODES: usize = 64;

/// A bitset over node ids `0..MAX_NODES`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "Vec<usize>", try_from = "Vec<usize>")]
pub struct ResultSet(u64);

impl ResultSet {
    /// The empty set.
    pub const EMPTY: ResultSet = ResultSet(0);

    /// Creates an empty set.
    #[inline]
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// A set holding a single id.
    #[inline]
    pub fn singleton(id: usize) -> Self {
        debug_assert!(id < MAX_NODES);
        Self(1u64 << id)
    }

    /// All ids in `[lo, hi]`. Empty when `lo > hi`.
    pub fn range_inclusive(lo: usize, hi: usize) -> Self {
        (lo..=hi).fold(Self::EMPTY, |acc, id| acc.with(id))
    }

    /// Raw bits.
    #[inline]
    pub fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn contains(self, id: usize) -> bool {
        id < MAX_NODES && self.0 & (1u64 << id) != 0
    }

    #[inline]
    pub fn insert(&mut self, id: usize) {
        debug_assert!(id < MAX_NODES);
        self.0 |= 1u64 << id;
    }

    /// Returns a copy with `id` added.
    #[inline]
    pub fn with(mut self, id: usize) -> Self {
        self.insert(id);
        self
    }

    #[inline]
    pub fn union(self, other: ResultSet) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub fn intersection(self, other: ResultSet) -> Self {
        Self(self.0 & other.0)
    }

    /// Ids in `self` but not in `other`.
    #[inline]
    pub fn difference(self, other: ResultSet) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub fn is_subset(self, other: ResultSet) -> bool {
        self.0 & !other.0 == 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Smallest id, if any.
    #[inline]
    pub fn min(self) -> Option<usize> {
        (self.0 != 0).then(|| self.0.trailing_zeros() as usize)
    }

    /// Largest id, if any.
    #[inline]
    pub fn max(self) -> Option<usize> {
        (self.0 != 0).then(|| 63 - self.0.leading_zeros() as usize)
    }

    /// Iterates ids in ascending order.
    pub fn iter(self) -> ResultSetIter {
        ResultSetIter(self.0)
    }
}

/// Ascending iterator over a [`ResultSet`].
#[derive(Debug, Clone)]
pub struct ResultSetIter(u64);

impl Iterator for ResultSetIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let id = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(id)
    }
}

impl IntoIterator for ResultSet {
    type Item = usize;
    type IntoIter = ResultSetIter;

    fn into_iter(self) -> ResultSetIter {
        self.iter()
    }
}

impl FromIterator<usize> for ResultSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |acc, id| acc.with(id))
    }
}

impl From<ResultSet> for Vec<usize> {
    fn from(set: ResultSet) -> Self {
        set.iter().collect()
    }
}

impl TryFrom<Vec<usize>> for ResultSet {
    type Error = String;

    fn try_from(ids: Vec<usize>) -> Result<Self, Self::Error> {
        match ids.iter().find(|&&id| id >= MAX_NODES) {
            Some(id) => Err(format!("node id {id} exceeds the {MAX_NODES}-node limit")),
            None => Ok(ids.into_iter().collect()),
        }
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (n, id) in self.iter().enumerate() {
            if n > 0 {
                write!(f, ",")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "}}")
    }
}
