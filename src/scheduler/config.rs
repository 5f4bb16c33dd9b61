//! Solver configuration.

use serde::{Deserialize, Serialize};

use super::heuristic::{clamp_probability, DEFAULT_SEND_PROBABILITY};

/// Search limits and tuning knobs.
///
/// Missing fields fall back to [`SolverConfig::default`] when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum search nodes expanded across all workers. `None` = unlimited.
    pub node_limit: Option<u64>,
    /// Wall-clock budget in milliseconds. `None` = unlimited.
    pub time_limit_ms: Option<u64>,
    /// Worker threads (0 = rayon default).
    pub workers: usize,
    /// Subtrees expanded breadth-first before parallel search starts.
    pub frontier_size: usize,
    /// Randomized warm-start dives after the flooding schedule.
    pub warm_start_dives: usize,
    /// Seed for the warm-start dives.
    pub seed: u64,
    /// Probability that a dive keeps a useful message (0.0..=1.0).
    pub dive_send_probability: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node_limit: None,
            time_limit_ms: None,
            workers: 0,
            frontier_size: 64,
            warm_start_dives: 32,
            seed: 42,
            dive_send_probability: DEFAULT_SEND_PROBABILITY,
        }
    }
}

impl SolverConfig {
    pub fn with_node_limit(mut self, limit: u64) -> Self {
        self.node_limit = Some(limit);
        self
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the frontier size (at least 1).
    pub fn with_frontier_size(mut self, size: usize) -> Self {
        self.frontier_size = size.max(1);
        self
    }

    pub fn with_warm_start_dives(mut self, dives: usize) -> Self {
        self.warm_start_dives = dives;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the dive send probability, clamped to `[0, 1]` (NaN resets it).
    pub fn with_dive_send_probability(mut self, p: f64) -> Self {
        self.dive_send_probability = clamp_probability(p);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = SolverConfig::default()
            .with_node_limit(1_000)
            .with_time_limit_ms(250)
            .with_workers(2)
            .with_frontier_size(0)
            .with_dive_send_probability(1.7);
        assert_eq!(config.node_limit, Some(1_000));
        assert_eq!(config.time_limit_ms, Some(250));
        assert_eq!(config.workers, 2);
        assert_eq!(config.frontier_size, 1);
        assert_eq!(config.dive_send_probability, 1.0);
    }

    #[test]
    fn test_nan_probability_resets() {
        let config = SolverConfig::default()
            .with_dive_send_probability(0.2)
            .with_dive_send_probability(f64::NAN);
        assert_eq!(config.dive_send_probability, 0.5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SolverConfig = serde_json::from_str(r#"{"seed": 7}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.frontier_size, SolverConfig::default().frontier_size);
        assert_eq!(config.node_limit, None);
    }
}
