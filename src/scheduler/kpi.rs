//! Schedule quality metrics (KPIs).
//!
//! Computes message-traffic indicators from a schedule and its model.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Total messages | Objective value |
//! | Generated | Payload is exactly the sender's own result |
//! | Forwarded | Every other message |
//! | Sends per node | Messages originated by each node |
//! | Max / avg payload | Results carried per message |
//! | Completion step | First step both endpoints hold every result |
//! | Last execution | Latest execution step |

use serde::{Deserialize, Serialize};

use crate::models::{ChainModel, Schedule};
use crate::validation::ScheduleValidator;

/// Message-traffic indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    pub total_messages: usize,
    /// Messages carrying only the sender's own fresh result.
    pub generated_messages: usize,
    /// Messages relaying anything received from others.
    pub forwarded_messages: usize,
    /// Messages sent, indexed by node.
    pub sends_by_node: Vec<usize>,
    /// Largest payload (number of results).
    pub max_payload: usize,
    pub avg_payload: f64,
    /// First step at which both endpoints are complete (`None` if never).
    pub completion_step: Option<usize>,
    pub last_execution: Option<usize>,
}

impl ScheduleKpi {
    /// Computes KPIs for `schedule` under `model`.
    ///
    /// Completion is read from a replay of the schedule, so it is meaningful
    /// only for schedules that pass validation.
    pub fn calculate(model: &ChainModel, schedule: &Schedule) -> Self {
        let n = model.node_count();
        let mut sends_by_node = vec![0usize; n];
        let mut generated = 0;
        let mut max_payload = 0;
        let mut payload_total = 0;

        for m in &schedule.messages {
            if m.from < n {
                sends_by_node[m.from] += 1;
            }
            if m.is_generated() {
                generated += 1;
            }
            let size = m.payload.len();
            max_payload = max_payload.max(size);
            payload_total += size;
        }

        let total = schedule.total_messages();
        let avg_payload = if total == 0 {
            0.0
        } else {
            payload_total as f64 / total as f64
        };

        let table = ScheduleValidator::new(model).replay(schedule);
        let all = model.topology.all_results();
        let last = model.topology.last();
        let completion_step = (0..=model.horizon)
            .find(|&t| all.is_subset(table.get(t, 0)) && all.is_subset(table.get(t, last)));

        Self {
            total_messages: total,
            generated_messages: generated,
            forwarded_messages: total - generated,
            sends_by_node,
            max_payload,
            avg_payload,
            completion_step,
            last_execution: schedule.last_execution(),
        }
    }

    /// Whether the schedule meets the given message and latency targets.
    pub fn meets_thresholds(&self, max_messages: usize, max_completion_step: usize) -> bool {
        self.total_messages <= max_messages
            && self
                .completion_step
                .is_some_and(|t| t <= max_completion_step)
    }
}
