//! Parallel-execution grouping of agent spans.
//!
//! Spans whose start times sit within one second of the previous span's start
//! were issued in the same orchestration step. Grouping is a single greedy
//! left-to-right walk; a boundary is never revisited once placed.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::event::seconds_between;
use crate::spans::AgentSpan;

/// Maximum start-to-start gap, in milliseconds, inside one group.
pub const PARALLEL_WINDOW_MS: i64 = 1_000;

/// Spans judged to have been issued together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelGroup {
    /// 1-based ordinal in start order.
    pub group_id: usize,
    pub size: usize,
    pub is_parallel: bool,
    /// Earliest member start.
    pub started_at: Option<DateTime<Utc>>,
    /// Latest member end.
    pub finished_at: Option<DateTime<Utc>>,
    /// `finished_at - started_at` when both are known.
    pub wall_seconds: Option<f64>,
    /// Sum of the members' own durations.
    pub member_seconds: f64,
    pub members: Vec<AgentSpan>,
}

impl ParallelGroup {
    fn new(group_id: usize, members: Vec<AgentSpan>) -> Self {
        let started_at = members.iter().filter_map(|s| s.start_time).min();
        let finished_at = members.iter().filter_map(|s| s.end_time).max();
        let wall_seconds = match (started_at, finished_at) {
            (Some(start), Some(end)) => Some(seconds_between(start, end)),
            _ => None,
        };
        Self {
            group_id,
            size: members.len(),
            is_parallel: members.len() > 1,
            started_at,
            finished_at,
            wall_seconds,
            member_seconds: members.iter().filter_map(|s| s.duration_seconds).sum(),
            members,
        }
    }
}

/// Partitions spans into groups of near-simultaneous starts.
///
/// Spans are sorted by start time; spans without a start sort last and each
/// forms its own group. A new group begins whenever a start is more than
/// [`PARALLEL_WINDOW_MS`] after the previous span's start.
pub fn group_parallel_spans(spans: &[AgentSpan]) -> Vec<ParallelGroup> {
    let mut sorted = spans.to_vec();
    sorted.sort_by_key(|s| (s.start_time.is_none(), s.start_time));

    let window = Duration::milliseconds(PARALLEL_WINDOW_MS);
    let mut groups: Vec<Vec<AgentSpan>> = Vec::new();
    let mut previous_start: Option<DateTime<Utc>> = None;

    for span in sorted {
        let extends = match (previous_start, span.start_time) {
            (Some(previous), Some(start)) => start - previous <= window,
            _ => false,
        };
        previous_start = span.start_time;
        match groups.last_mut() {
            Some(group) if extends => group.push(span),
            _ => groups.push(vec![span]),
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(index, members)| ParallelGroup::new(index + 1, members))
        .collect()
}
