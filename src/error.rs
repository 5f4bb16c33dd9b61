//! Crate-wide error type.
//!
//! Only fatal conditions live here. An instance that has no schedule within
//! its horizon is not an error: it is reported as
//! [`SolveOutcome::Infeasible`](crate::scheduler::SolveOutcome::Infeasible).

use thiserror::Error;

use crate::models::Violation;

/// Fatal scheduling errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// Malformed input (node count, horizon, or ranks). Raised before search.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// The validator rejected a schedule the search had accepted.
    ///
    /// Signals a broken bounding/branching invariant, never bad input.
    #[error("internal inconsistency: {} constraint violation(s), first: {}",
        .violations.len(),
        .violations.first().map(|v| v.message.as_str()).unwrap_or("<none>"))]
    InternalInconsistency { violations: Vec<Violation> },
}

impl ScheduleError {
    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
