//! Work/wait accounting from lifecycle markers.
//!
//! Only sessions with at least one `Stop` event are eligible. Sessions without
//! a `Stop` are left out entirely; there is no estimated fallback.
//!
//! # Algorithm
//!
//! 1. Keep the marker events of each eligible session (`SessionStart`,
//!    `UserPromptSubmit`, `Stop`) in timestamp order
//! 2. A prompt (or session start) followed directly by `Stop` is working time
//! 3. A `Stop` followed directly by a prompt is waiting time, bucketed by length

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::QueryError;
use crate::event::{TraceEvent, non_empty, partition_by_session, seconds_between};
use crate::event_type::EventType;

/// Waits up to this long are `short`.
pub const SHORT_WAIT_SECS: f64 = 60.0;

/// Waits up to this long are `medium`; longer ones are `long`.
pub const MEDIUM_WAIT_SECS: f64 = 300.0;

/// Consecutive-event gaps longer than this are reported for drill-down.
pub const SIGNIFICANT_GAP_SECS: f64 = 60.0;

/// Waiting interval counts by length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WaitHistogram {
    /// At most one minute.
    pub short: usize,
    /// Over one minute, at most five.
    pub medium: usize,
    /// Over five minutes.
    pub long: usize,
}

impl WaitHistogram {
    pub fn record(&mut self, wait_seconds: f64) {
        if wait_seconds <= SHORT_WAIT_SECS {
            self.short += 1;
        } else if wait_seconds <= MEDIUM_WAIT_SECS {
            self.medium += 1;
        } else {
            self.long += 1;
        }
    }

    pub const fn total(&self) -> usize {
        self.short + self.medium + self.long
    }

    fn merge(&mut self, other: &Self) {
        self.short += other.short;
        self.medium += other.medium;
        self.long += other.long;
    }
}

/// Work/wait split for one eligible session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionWorkWait {
    pub session_id: String,
    pub working_seconds: f64,
    pub waiting_seconds: f64,
    pub active_percentage: f64,
    /// Completed prompt→`Stop` turns.
    pub turns: usize,
    pub waits: WaitHistogram,
}

/// Work/wait split across every eligible session in a slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkWaitReport {
    pub sessions: Vec<SessionWorkWait>,
    pub working_seconds: f64,
    pub waiting_seconds: f64,
    pub active_percentage: f64,
    pub waits: WaitHistogram,
}

/// A quiet stretch of more than a minute between two events of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificantGap {
    pub session_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub gap_seconds: f64,
    pub before_event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_tool: Option<String>,
    pub after_event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_tool: Option<String>,
}

fn active_percentage(working: f64, waiting: f64) -> f64 {
    let total = working + waiting;
    if total > 0.0 {
        working / total * 100.0
    } else {
        0.0
    }
}

const fn is_marker(kind: EventType) -> bool {
    matches!(
        kind,
        EventType::SessionStart | EventType::UserPromptSubmit | EventType::Stop
    )
}

fn account_session<E: TraceEvent>(session_id: &str, events: &[&E]) -> Option<SessionWorkWait> {
    let markers: Vec<(EventType, DateTime<Utc>)> = events
        .iter()
        .filter_map(|e| e.kind().filter(|k| is_marker(*k)).map(|k| (k, e.timestamp())))
        .collect();
    if !markers.iter().any(|(kind, _)| *kind == EventType::Stop) {
        return None;
    }

    let mut working_seconds = 0.0;
    let mut waiting_seconds = 0.0;
    let mut turns = 0;
    let mut waits = WaitHistogram::default();

    for pair in markers.windows(2) {
        let (first, start) = pair[0];
        let (second, end) = pair[1];
        match (first, second) {
            (EventType::UserPromptSubmit | EventType::SessionStart, EventType::Stop) => {
                working_seconds += seconds_between(start, end);
                turns += 1;
            }
            (EventType::Stop, EventType::UserPromptSubmit) => {
                let wait = seconds_between(start, end);
                waiting_seconds += wait;
                waits.record(wait);
            }
            _ => {}
        }
    }

    Some(SessionWorkWait {
        session_id: session_id.to_string(),
        working_seconds,
        waiting_seconds,
        active_percentage: active_percentage(working_seconds, waiting_seconds),
        turns,
        waits,
    })
}

/// Computes the work/wait split for every session that has a `Stop` event.
///
/// Returns [`QueryError::NoEligibleData`] when no session qualifies.
pub fn compute_work_wait<E: TraceEvent>(events: &[E]) -> Result<WorkWaitReport, QueryError> {
    let partitions = partition_by_session(events);
    let sessions: Vec<SessionWorkWait> = partitions
        .par_iter()
        .filter_map(|(session_id, events)| account_session(session_id, events))
        .collect();

    if sessions.is_empty() {
        tracing::debug!(
            sessions = partitions.len(),
            "no session with a Stop event, skipping work/wait accounting"
        );
        return Err(QueryError::NoEligibleData);
    }

    let working_seconds: f64 = sessions.iter().map(|s| s.working_seconds).sum();
    let waiting_seconds: f64 = sessions.iter().map(|s| s.waiting_seconds).sum();
    let mut waits = WaitHistogram::default();
    for session in &sessions {
        waits.merge(&session.waits);
    }

    Ok(WorkWaitReport {
        active_percentage: active_percentage(working_seconds, waiting_seconds),
        sessions,
        working_seconds,
        waiting_seconds,
        waits,
    })
}

/// Lists every gap over [`SIGNIFICANT_GAP_SECS`] between consecutive events of a session.
///
/// Independent of the `Stop`-based accounting: sessions without `Stop` are included.
pub fn find_significant_gaps<E: TraceEvent>(events: &[E]) -> Vec<SignificantGap> {
    let mut gaps = Vec::new();
    for (session_id, events) in partition_by_session(events) {
        for pair in events.windows(2) {
            let (before, after) = (pair[0], pair[1]);
            let gap_seconds = seconds_between(before.timestamp(), after.timestamp());
            if gap_seconds > SIGNIFICANT_GAP_SECS {
                gaps.push(SignificantGap {
                    session_id: session_id.to_string(),
                    start: before.timestamp(),
                    end: after.timestamp(),
                    gap_seconds,
                    before_event_type: before.event_type().to_string(),
                    before_tool: non_empty(before.tool_name()).map(String::from),
                    after_event_type: after.event_type().to_string(),
                    after_tool: non_empty(after.tool_name()).map(String::from),
                });
            }
        }
    }
    gaps
}
