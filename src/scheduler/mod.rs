//! Minimum-message solvers and KPI evaluation.
//!
//! # Solvers
//!
//! | Solver | Optimal | Use |
//! |--------|---------|-----|
//! | [`BranchAndBound`] | yes (without limits) | the main solver |
//! | [`FloodScheduler`] | no | baseline; earliest possible completion |
//! | [`RandomDiver`] | no | randomized warm-start schedules |
//!
//! Every solver implements [`ChainSolver`] or feeds one, and every schedule
//! it returns has passed [`ScheduleValidator`](crate::validation::ScheduleValidator).
//!
//! # KPI
//!
//! [`ScheduleKpi`] reports message traffic: generated vs forwarded messages,
//! payload sizes, per-node sends, and the step both endpoints complete.

mod branch_bound;
mod config;
mod heuristic;
mod incumbent;
mod kpi;
mod outcome;
mod step;

pub use branch_bound::BranchAndBound;
pub use config::SolverConfig;
pub use heuristic::{FloodScheduler, RandomDiver};
pub use kpi::ScheduleKpi;
pub use outcome::{ChainSolver, InfeasibleReason, SearchStats, SolveOutcome, Solution};
