//! Parallel branch-and-bound for minimum-message schedules.
//!
//! # Algorithm
//!
//! 1. **Pre-check**: decide infeasibility exactly from `N`, `T` and the ranks.
//! 2. **Warm start**: a flooding schedule, then seeded random dives, seed
//!    the incumbent.
//! 3. **Branching**: time advances step by step. Within a step, enabled
//!    nodes execute immediately and every candidate edge is decided in
//!    `(rank(from), from, to)` order, skip before send. A message always
//!    carries the sender's full holding.
//! 4. **Bounding**: `messages + lower_bound ≥ best` prunes; so does a step
//!    boundary from which the endpoints can no longer complete by `T`, and a
//!    step that sent nothing (the same state, one step later).
//! 5. **Parallelism**: the tree is expanded breadth-first into a frontier of
//!    independent subtrees, explored depth-first on a rayon pool against a
//!    shared incumbent.
//!
//! Without a node or time limit the result is proven optimal.
//!
//! # Reference
//! Land & Doig (1960), "An Automatic Method of Solving Discrete Programming
//! Problems"

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use super::heuristic::incomplete_after_flood;
use super::incumbent::Incumbent;
use super::step;
use super::{
    ChainSolver, FloodScheduler, InfeasibleReason, RandomDiver, SearchStats, Solution,
    SolveOutcome, SolverConfig,
};
use crate::cp::ScheduleExtractor;
use crate::error::{Result, ScheduleError};
use crate::models::{ChainModel, ConstraintSet, Schedule, ScheduleState};
use crate::validation::ScheduleValidator;

/// Nodes between wall-clock checks. The first expansion is always checked.
const CLOCK_CHECK_INTERVAL: u64 = 256;

/// Exact minimum-message solver.
///
/// # Example
/// ```
/// use u_relay::cp::ModelBuilder;
/// use u_relay::scheduler::{BranchAndBound, SolverConfig};
///
/// let outcome = ModelBuilder::new(5, 3, vec![2, 0, 1, 0, 2])
///     .solve(&BranchAndBound::new(), &SolverConfig::default())
///     .unwrap();
/// let solution = outcome.solution().unwrap();
/// assert_eq!(solution.total_messages, 6);
/// assert!(solution.proven_optimal);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBound;

impl BranchAndBound {
    pub fn new() -> Self {
        Self
    }
}

impl ChainSolver for BranchAndBound {
    fn solve(&self, model: &ChainModel, config: &SolverConfig) -> Result<SolveOutcome> {
        let start = Instant::now();
        info!(
            nodes = model.node_count(),
            horizon = model.horizon,
            workers = config.workers,
            "branch-and-bound started"
        );

        if let Some(reason) = InfeasibleReason::diagnose(model) {
            info!(%reason, "instance infeasible");
            return Ok(SolveOutcome::Infeasible(reason));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| {
                ScheduleError::configuration(format!(
                    "cannot start {} workers: {e}",
                    config.workers
                ))
            })?;

        let search = Search::new(model, config, start);
        pool.install(|| -> Result<()> {
            search.warm_start(config)?;
            debug!(bound = search.incumbent.bound(), "warm start done");

            let mut root = Vec::new();
            search.open(model.empty_state(), &mut root)?;
            let frontier = search.frontier(root, config.frontier_size.max(1))?;
            debug!(subtrees = frontier.len(), "frontier expanded");

            frontier
                .into_par_iter()
                .try_for_each(|node| search.explore(node))
        })?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let (schedule, stats, stopped) = search.finish(elapsed_ms);
        let schedule = schedule.ok_or_else(|| incomplete_after_flood(model))?;
        if stopped {
            warn!(
                nodes_explored = stats.nodes_explored,
                elapsed_ms, "search limit reached; best schedule not proven optimal"
            );
        }

        let total_messages = schedule.total_messages();
        info!(
            messages = total_messages,
            proven_optimal = !stopped,
            nodes_explored = stats.nodes_explored,
            elapsed_ms,
            "branch-and-bound finished"
        );
        Ok(SolveOutcome::Feasible(Solution {
            schedule,
            total_messages,
            proven_optimal: !stopped,
            stats,
        }))
    }
}

/// A state partway through a step, with the step's edges decided up to `cursor`.
struct SearchNode {
    state: ScheduleState,
    edges: Vec<(usize, usize)>,
    cursor: usize,
}

#[derive(Debug, Default)]
struct Counters {
    nodes: AtomicU64,
    pruned_by_bound: AtomicU64,
    pruned_by_reachability: AtomicU64,
    solutions: AtomicU64,
}

struct Search<'a> {
    model: &'a ChainModel,
    validator: ScheduleValidator<'a>,
    incumbent: Incumbent,
    counters: Counters,
    node_limit: Option<u64>,
    deadline: Option<Instant>,
    stopped: AtomicBool,
}

impl<'a> Search<'a> {
    fn new(model: &'a ChainModel, config: &SolverConfig, start: Instant) -> Self {
        Self {
            model,
            validator: ScheduleValidator::new(model),
            incumbent: Incumbent::new(),
            counters: Counters::default(),
            node_limit: config.node_limit,
            deadline: config
                .time_limit_ms
                .map(|ms| start + Duration::from_millis(ms)),
            stopped: AtomicBool::new(false),
        }
    }

    /// Flooding schedule plus `warm_start_dives` seeded random dives.
    fn warm_start(&self, config: &SolverConfig) -> Result<()> {
        let flood = FloodScheduler::new()
            .run(self.model)
            .ok_or_else(|| incomplete_after_flood(self.model))?;
        self.accept(&flood)?;

        let diver = RandomDiver::new(config.dive_send_probability);
        (0..config.warm_start_dives as u64)
            .into_par_iter()
            .try_for_each(|i| {
                let mut rng = SmallRng::seed_from_u64(config.seed.wrapping_add(i));
                match diver.dive(self.model, &mut rng) {
                    Some(state) => self.accept(&state).map(|_| ()),
                    None => Ok(()),
                }
            })
    }

    /// Validates a finished state and offers it to the incumbent.
    fn accept(&self, state: &ScheduleState) -> Result<bool> {
        let schedule = ScheduleExtractor::extract(state);
        if let Err(violations) = self.validator.validate(&schedule) {
            error!(
                violations = violations.len(),
                messages = schedule.total_messages(),
                "accepted schedule failed validation"
            );
            return Err(ScheduleError::InternalInconsistency { violations });
        }
        self.counters.solutions.fetch_add(1, Ordering::Relaxed);
        Ok(self.incumbent.offer(schedule))
    }

    /// Enters a step boundary: executes enabled nodes and either accepts the
    /// state, drops it, or pushes it for edge decisions.
    fn open(&self, mut state: ScheduleState, out: &mut Vec<SearchNode>) -> Result<()> {
        if !ConstraintSet::horizon_reachable(self.model, &state) {
            self.counters
                .pruned_by_reachability
                .fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        step::execute_enabled(self.model, &mut state);
        if step::is_complete(self.model, &state) {
            state.finish_idle();
            self.accept(&state)?;
            return Ok(());
        }
        if state.time() >= self.model.horizon {
            return Ok(());
        }
        let edges = step::candidate_edges(self.model, &state);
        out.push(SearchNode {
            state,
            edges,
            cursor: 0,
        });
        Ok(())
    }

    /// Pushes the children of `node`, skip branch first.
    fn expand(&self, node: SearchNode, out: &mut Vec<SearchNode>) -> Result<()> {
        let explored = self.counters.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        if self.limit_reached(explored) {
            return Ok(());
        }
        let lower = node.state.message_count() + step::lower_bound(self.model, &node.state);
        if lower >= self.incumbent.bound() {
            self.counters.pruned_by_bound.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let SearchNode {
            mut state,
            edges,
            cursor,
        } = node;
        let Some(&(from, to)) = edges.get(cursor) else {
            if step::is_idle(&state) {
                return Ok(());
            }
            state.advance();
            return self.open(state, out);
        };

        if !step::worth_sending(self.model, &state, from, to) {
            out.push(SearchNode {
                state,
                edges,
                cursor: cursor + 1,
            });
            return Ok(());
        }

        let mut sent = state.clone();
        sent.send(from, to);
        out.push(SearchNode {
            state,
            edges: edges.clone(),
            cursor: cursor + 1,
        });
        out.push(SearchNode {
            state: sent,
            edges,
            cursor: cursor + 1,
        });
        Ok(())
    }

    /// Breadth-first expansion until `size` open subtrees exist.
    fn frontier(&self, root: Vec<SearchNode>, size: usize) -> Result<Vec<SearchNode>> {
        let mut queue: VecDeque<SearchNode> = root.into();
        let mut children = Vec::with_capacity(2);
        while queue.len() < size && !self.stopped.load(Ordering::Relaxed) {
            let Some(node) = queue.pop_front() else {
                break;
            };
            self.expand(node, &mut children)?;
            queue.extend(children.drain(..));
        }
        Ok(queue.into())
    }

    /// Depth-first search of one subtree.
    fn explore(&self, root: SearchNode) -> Result<()> {
        let mut stack = vec![root];
        let mut children = Vec::with_capacity(2);
        while let Some(node) = stack.pop() {
            if self.stopped.load(Ordering::Relaxed) {
                break;
            }
            self.expand(node, &mut children)?;
            stack.extend(children.drain(..).rev());
        }
        Ok(())
    }

    fn limit_reached(&self, explored: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }
        let over_nodes = self.node_limit.is_some_and(|limit| explored > limit);
        let over_time = explored % CLOCK_CHECK_INTERVAL == 1
            && self.deadline.is_some_and(|d| Instant::now() >= d);
        if over_nodes || over_time {
            self.stopped.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn finish(self, elapsed_ms: u64) -> (Option<Schedule>, SearchStats, bool) {
        let stats = SearchStats {
            nodes_explored: self.counters.nodes.load(Ordering::Relaxed),
            pruned_by_bound: self.counters.pruned_by_bound.load(Ordering::Relaxed),
            pruned_by_reachability: self.counters.pruned_by_reachability.load(Ordering::Relaxed),
            solutions_found: self.counters.solutions.load(Ordering::Relaxed),
            incumbent_updates: self.incumbent.version(),
            elapsed_ms,
        };
        let stopped = self.stopped.load(Ordering::Relaxed);
        (self.incumbent.into_schedule(), stats, stopped)
    }
}
