//! Propagation-scheduling domain models.
//!
//! Provides the data types for describing a chain propagation problem and
//! its solutions.
//!
//! # Vocabulary
//!
//! | u-relay | Meaning |
//! |---------|---------|
//! | Topology | `N`-node line graph, endpoints `0` and `N-1` |
//! | RankTable | Per-node dependency depth |
//! | ResultSet | Set of result-origin ids (one bit per node) |
//! | ScheduleState | Partially decided executions, messages, possession |
//! | PossessionTable | `holds(i, k, t)` over the whole horizon |
//! | ConstraintSet | Rules every schedule must satisfy |
//! | Schedule | Time-ordered executions and message events |

mod chain;
mod constraint;
mod rank;
mod result_set;
mod schedule;
mod state;
mod topology;

pub use chain::ChainModel;
pub use constraint::{ConstraintSet, Rule};
pub use rank::{Rank, RankTable};
pub use result_set::{ResultSet, ResultSetIter, MAX_NODES};
pub use schedule::{Execution, MessageEvent, Schedule, Violation, ViolationType};
pub use state::{PossessionTable, ScheduleState};
pub use topology::Topology;
