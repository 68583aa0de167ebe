//! Inter-event gap classification.
//!
//! For each session partition, the time from every event to its successor is
//! labelled by how long the assistant (or the user) sat still. The final event
//! of a partition has no successor and closes the partition as `session_end`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::{TraceEvent, non_empty, partition_by_session, seconds_between};

/// Gaps up to this many seconds count as continuous activity.
pub const ACTIVE_GAP_SECS: f64 = 5.0;

/// Gaps up to this many seconds count as idle; longer ones as waiting.
pub const IDLE_GAP_SECS: f64 = 30.0;

/// Activity label for one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    /// Gap of at most 5 seconds.
    Active,
    /// Gap over 5 and at most 30 seconds.
    Idle,
    /// Gap over 30 seconds.
    Waiting,
    /// Last event of the partition.
    SessionEnd,
}

impl ActivityState {
    /// Labels a gap by the fixed thresholds.
    pub fn classify(gap_seconds: f64) -> Self {
        if gap_seconds <= ACTIVE_GAP_SECS {
            Self::Active
        } else if gap_seconds <= IDLE_GAP_SECS {
            Self::Idle
        } else {
            Self::Waiting
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::SessionEnd => "session_end",
        }
    }
}

impl std::fmt::Display for ActivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The interval from one event to the next event of the same session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interval {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Successor timestamp; `None` for `session_end`.
    pub next_timestamp: Option<DateTime<Utc>>,
    /// Seconds until the successor; `None` for `session_end`.
    pub gap_seconds: Option<f64>,
    pub state: ActivityState,
}

/// Lazy iterator over the [`Interval`]s of an event slice.
///
/// Finite and restartable: clone it before consuming to walk it again.
pub struct Gaps<'a, E> {
    partitions: Vec<(&'a str, Vec<&'a E>)>,
    partition: usize,
    index: usize,
}

impl<E> Clone for Gaps<'_, E> {
    fn clone(&self) -> Self {
        Self {
            partitions: self.partitions.clone(),
            partition: self.partition,
            index: self.index,
        }
    }
}

impl<E: TraceEvent> Iterator for Gaps<'_, E> {
    type Item = Interval;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (session_id, events) = self.partitions.get(self.partition)?;
            let Some(event) = events.get(self.index) else {
                self.partition += 1;
                self.index = 0;
                continue;
            };
            let next = events.get(self.index + 1);
            self.index += 1;

            let next_timestamp = next.map(|n| n.timestamp());
            let gap_seconds = next_timestamp.map(|n| seconds_between(event.timestamp(), n));
            return Some(Interval {
                session_id: (*session_id).to_string(),
                timestamp: event.timestamp(),
                event_type: event.event_type().to_string(),
                tool_name: non_empty(event.tool_name()).map(String::from),
                next_timestamp,
                gap_seconds,
                state: gap_seconds.map_or(ActivityState::SessionEnd, ActivityState::classify),
            });
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .partitions
            .iter()
            .skip(self.partition)
            .map(|(_, events)| events.len())
            .sum::<usize>()
            .saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<E: TraceEvent> ExactSizeIterator for Gaps<'_, E> {}

/// Classifies the gaps of `events`, partitioned by session id.
///
/// Events are stably sorted by timestamp, so ties keep their arrival order.
/// Events without a session id are skipped. Partitions are yielded in order
/// of their first event.
pub fn classify_gaps<E: TraceEvent>(events: &[E]) -> Gaps<'_, E> {
    Gaps {
        partitions: partition_by_session(events),
        partition: 0,
        index: 0,
    }
}

/// Totals per activity state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GapSummary {
    pub active_count: usize,
    pub idle_count: usize,
    pub waiting_count: usize,
    pub active_seconds: f64,
    pub idle_seconds: f64,
    pub waiting_seconds: f64,
    pub sessions: usize,
}

impl GapSummary {
    pub fn from_intervals<'i>(intervals: impl IntoIterator<Item = &'i Interval>) -> Self {
        let mut summary = Self::default();
        for interval in intervals {
            let gap = interval.gap_seconds.unwrap_or(0.0);
            match interval.state {
                ActivityState::Active => {
                    summary.active_count += 1;
                    summary.active_seconds += gap;
                }
                ActivityState::Idle => {
                    summary.idle_count += 1;
                    summary.idle_seconds += gap;
                }
                ActivityState::Waiting => {
                    summary.waiting_count += 1;
                    summary.waiting_seconds += gap;
                }
                ActivityState::SessionEnd => summary.sessions += 1,
            }
        }
        summary
    }
}
