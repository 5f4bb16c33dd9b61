//! Step mechanics shared by every search strategy.
//!
//! A step at `t` runs in a fixed order: every enabled node executes, the row
//! is recorded, messages are decided edge by edge, then the state advances.
//! Only messages that bring the receiver something new are considered; with
//! full-holding payloads any other message can be dropped from a valid
//! schedule without breaking it.

use crate::models::{ChainModel, ConstraintSet, ResultSet, Rule, ScheduleState};

/// Executes every node enabled at the current step and records the row.
pub(crate) fn execute_enabled(model: &ChainModel, state: &mut ScheduleState) {
    let enabled: Vec<usize> = model
        .topology
        .intermediates()
        .filter(|&i| ConstraintSet::may_execute(model, state, i))
        .collect();
    for node in enabled {
        state.execute(node);
    }
    state.record();
}

/// Directed edges worth deciding this step, ordered by `(rank(from), from, to)`.
///
/// Empty at `t = T`: a message sent then is never delivered.
pub(crate) fn candidate_edges(model: &ChainModel, state: &ScheduleState) -> Vec<(usize, usize)> {
    if state.time() >= model.horizon {
        return Vec::new();
    }
    let mut edges: Vec<(usize, usize)> = model
        .topology
        .directed_edges()
        .into_iter()
        .filter(|&(from, to)| worth_sending(model, state, from, to))
        .collect();
    edges.sort_by_key(|&(from, to)| (model.ranks.rank(from), from, to));
    edges
}

/// Whether `from → to` can still change anything given this step's decisions.
pub(crate) fn worth_sending(model: &ChainModel, state: &ScheduleState, from: usize, to: usize) -> bool {
    ConstraintSet::may_send(model, state, from, to)
        && (!state.held(from).is_subset(state.held_next(to))
            || announce_pending(model, state, from, to))
}

/// `from → to` would be the first announcement of rank-0 node `from`.
pub(crate) fn announce_pending(
    model: &ChainModel,
    state: &ScheduleState,
    from: usize,
    to: usize,
) -> bool {
    model.constraints.contains(Rule::Rank0Announce)
        && model.ranks.rank(from) == 0
        && model.ranks.rank(to) > 0
        && !announced(model, state, from)
}

fn announced(model: &ChainModel, state: &ScheduleState, node: usize) -> bool {
    state
        .messages()
        .iter()
        .any(|m| m.from == node && model.ranks.rank(m.to) > 0)
}

fn announcements_done(model: &ChainModel, state: &ScheduleState) -> bool {
    if !model.constraints.contains(Rule::Rank0Announce) {
        return true;
    }
    let topo = &model.topology;
    (0..topo.node_count())
        .filter(|&i| model.ranks.rank(i) == 0)
        .filter(|&i| topo.neighbors(i).any(|j| model.ranks.rank(j) > 0))
        .all(|i| announced(model, state, i))
}

/// No message has been sent at the current step.
pub(crate) fn is_idle(state: &ScheduleState) -> bool {
    !state
        .messages()
        .last()
        .is_some_and(|m| m.time == state.time())
}

/// Nothing left to decide: both endpoints are complete and every required
/// announcement has been made.
pub(crate) fn is_complete(model: &ChainModel, state: &ScheduleState) -> bool {
    state.boundary_complete(&model.topology) && announcements_done(model, state)
}

/// Messages still needed before both endpoints are complete.
///
/// A result missing at endpoint 0 must cross every edge between its leftmost
/// holder and node 0, one message per edge; likewise to the right. Leftward
/// and rightward edges are disjoint, so the two maxima add.
pub(crate) fn lower_bound(model: &ChainModel, state: &ScheduleState) -> usize {
    let topo = &model.topology;
    let last = topo.last();
    let all = topo.all_results();
    let next: Vec<ResultSet> = (0..topo.node_count()).map(|i| state.held_next(i)).collect();

    let mut left = 0;
    for k in all.difference(next[0]) {
        let pos = (0..=last).find(|&i| next[i].contains(k)).unwrap_or(k);
        left = left.max(pos);
    }
    let mut right = 0;
    for k in all.difference(next[last]) {
        let pos = (0..=last).rev().find(|&i| next[i].contains(k)).unwrap_or(k);
        right = right.max(last - pos);
    }
    left + right
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::ModelBuilder;

    fn model(ranks: Vec<i32>, horizon: usize) -> ChainModel {
        ModelBuilder::new(ranks.len(), horizon, ranks).build().unwrap()
    }

    #[test]
    fn test_rank_zero_executes_first() {
        let m = model(vec![2, 0, 1, 0, 2], 3);
        let mut s = m.empty_state();
        execute_enabled(&m, &mut s);
        assert_eq!(s.exec_time(1), Some(0));
        assert_eq!(s.exec_time(3), Some(0));
        assert_eq!(s.exec_time(2), None);
        assert!(s.possession().holds(1, 1, 0));
    }

    #[test]
    fn test_candidate_order_and_usefulness() {
        let m = model(vec![2, 0, 1, 0, 2], 3);
        let mut s = m.empty_state();
        execute_enabled(&m, &mut s);
        let edges = candidate_edges(&m, &s);
        assert_eq!(edges, vec![(1, 0), (1, 2), (3, 2), (3, 4)]);

        // Once 1 has told 2, a second identical delivery is pointless.
        s.send(1, 2);
        assert!(!worth_sending(&m, &s, 1, 2));
        assert!(worth_sending(&m, &s, 3, 2));
    }

    #[test]
    fn test_no_candidates_at_horizon() {
        let m = model(vec![1, 0, 1], 1);
        let mut s = m.empty_state();
        execute_enabled(&m, &mut s);
        s.advance();
        execute_enabled(&m, &mut s);
        assert!(candidate_edges(&m, &s).is_empty());
    }

    #[test]
    fn test_idle_tracks_current_step() {
        let m = model(vec![1, 0, 0, 1], 3);
        let mut s = m.empty_state();
        execute_enabled(&m, &mut s);
        assert!(is_idle(&s));
        s.send(1, 0);
        assert!(!is_idle(&s));
        s.advance();
        assert!(is_idle(&s));
    }

    #[test]
    fn test_lower_bound_initial() {
        // Result 3 must travel three hops left and result 1 three hops right.
        let m = model(vec![2, 0, 1, 0, 2], 3);
        let mut s = m.empty_state();
        execute_enabled(&m, &mut s);
        assert_eq!(lower_bound(&m, &s), 6);
    }

    #[test]
    fn test_lower_bound_counts_in_flight() {
        let m = model(vec![1, 0, 1], 1);
        let mut s = m.empty_state();
        execute_enabled(&m, &mut s);
        assert_eq!(lower_bound(&m, &s), 2);
        s.send(1, 0);
        assert_eq!(lower_bound(&m, &s), 1);
        s.send(1, 2);
        assert_eq!(lower_bound(&m, &s), 0);
    }

    #[test]
    fn test_announce_keeps_redundant_edge() {
        let m = ModelBuilder::new(4, 2, vec![1, 0, 0, 1])
            .with_rank0_announce()
            .build()
            .unwrap();
        let mut s = m.empty_state();
        execute_enabled(&m, &mut s);
        assert!(announce_pending(&m, &s, 1, 0));
        assert!(!announce_pending(&m, &s, 1, 2));
        s.send(1, 0);
        assert!(!announce_pending(&m, &s, 1, 0));
        assert!(!is_complete(&m, &s));
    }
}
