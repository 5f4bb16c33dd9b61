//! Message-minimal propagation scheduling on linear chains.
//!
//! `N` nodes form a line `0 - 1 - ... - N-1`. Every intermediate node
//! executes once, gated by its rank: it may run only after holding the
//! results of every lower-rank node. Results travel one hop per step in
//! messages that carry the sender's holdings. The goal is the schedule with
//! the fewest messages that leaves both endpoints holding every result by
//! step `T`.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Topology`, `RankTable`, `ResultSet`,
//!   `ScheduleState`, `ConstraintSet`, `Schedule`
//! - **`cp`**: Problem input, `ModelBuilder`, `ScheduleExtractor`
//! - **`scheduler`**: `BranchAndBound`, flooding and random-dive heuristics,
//!   `SolverConfig`, `ScheduleKpi`
//! - **`validation`**: Input checks and the independent `ScheduleValidator`
//! - **`error`**: `ScheduleError`
//!
//! # Example
//!
//! ```
//! use u_relay::cp::ModelBuilder;
//! use u_relay::scheduler::{BranchAndBound, SolveOutcome, SolverConfig};
//!
//! let outcome = ModelBuilder::new(3, 1, vec![1, 0, 1])
//!     .solve(&BranchAndBound::new(), &SolverConfig::default())
//!     .unwrap();
//! match outcome {
//!     SolveOutcome::Feasible(solution) => assert_eq!(solution.total_messages, 2),
//!     SolveOutcome::Infeasible(reason) => panic!("unexpected: {reason}"),
//! }
//! ```
//!
//! # References
//!
//! - Land & Doig (1960), "An Automatic Method of Solving Discrete Programming Problems"
//! - Hedetniemi, Hedetniemi & Liestman (1988), "A Survey of Gossiping and
//!   Broadcasting in Communication Networks"

pub mod cp;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use error::{Result, ScheduleError};
