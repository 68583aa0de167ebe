//! Session and tmux-session lifecycle reconstruction.
//!
//! A session exists only through its events: it starts at its earliest event,
//! ends at its latest, and is `completed` once a `SessionEnd` has been seen.
//! Nothing is cached; every call re-derives from the slice it is given.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{EntityKind, QueryError};
use crate::event::{
    TraceEvent, non_empty, partition_by_session, seconds_between, session_key, sorted_by_time,
};
use crate::event_type::EventType;
use crate::payload::PayloadField;

/// A session without `SessionEnd` is `active` if its last event is this recent.
pub const SESSION_RECENCY_SECS: i64 = 5 * 60;

/// A tmux session is `active` if its last activity is this recent.
pub const TMUX_ACTIVE_SECS: i64 = 60 * 60;

/// A tmux session is `recent` if its last activity is this recent.
pub const TMUX_RECENT_SECS: i64 = 24 * 60 * 60;

/// Lifecycle status of one assistant session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// A `SessionEnd` event exists.
    Completed,
    /// No end marker, last event within [`SESSION_RECENCY_SECS`] of now.
    Active,
    /// No end marker and quiet for longer than that.
    Inactive,
}

impl SessionStatus {
    /// Resolves status: end marker first, then recency of the last event.
    pub fn resolve(has_end_marker: bool, last_event: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if has_end_marker {
            Self::Completed
        } else if last_event > now - Duration::seconds(SESSION_RECENCY_SECS) {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity status of a tmux session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TmuxStatus {
    /// Last activity less than an hour ago.
    Active,
    /// Last activity less than a day ago.
    Recent,
    Inactive,
}

impl TmuxStatus {
    pub fn resolve(last_activity: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let since = now - last_activity;
        if since < Duration::seconds(TMUX_ACTIVE_SECS) {
            Self::Active
        } else if since < Duration::seconds(TMUX_RECENT_SECS) {
            Self::Recent
        } else {
            Self::Inactive
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Recent => "recent",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for TmuxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session derived from the events sharing one `session_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub session_id: String,
    /// Earliest event timestamp.
    pub start: DateTime<Utc>,
    /// Latest event timestamp.
    pub end: DateTime<Utc>,
    pub has_end_marker: bool,
    pub status: SessionStatus,
    pub duration_seconds: f64,
    pub total_events: usize,
    /// Number of `SessionStart` events (resumes and compactions add more).
    pub start_events: usize,
    /// Number of `SessionEnd` events.
    pub end_events: usize,
    /// Distinct tool names, sorted.
    pub tools_used: Vec<String>,
    /// `source` of the first `SessionStart` (`startup`, `resume`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_source: Option<String>,
    /// Most recently reported working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Most recently reported tmux session label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmux_session: Option<String>,
}

impl Session {
    /// Number of distinct tools used.
    pub fn unique_tools(&self) -> usize {
        self.tools_used.len()
    }

    /// Folds the time-ordered events of one session.
    fn from_events<E: TraceEvent>(
        session_id: &str,
        events: &[&E],
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let first = events.first()?;
        let mut start = first.timestamp();
        let mut end = start;
        let mut start_events = 0;
        let mut end_events = 0;
        let mut tools = BTreeSet::new();
        let mut start_source = None;
        let mut cwd = None;
        let mut tmux_session = None;

        for event in events {
            let timestamp = event.timestamp();
            start = start.min(timestamp);
            end = end.max(timestamp);

            match event.kind() {
                Some(EventType::SessionStart) => {
                    start_events += 1;
                    if start_source.is_none() {
                        start_source = event.field_str(PayloadField::Source).map(String::from);
                    }
                }
                Some(EventType::SessionEnd) => end_events += 1,
                _ => {}
            }
            if let Some(tool) = non_empty(event.tool_name()) {
                tools.insert(tool);
            }
            if let Some(dir) = non_empty(event.field_str(PayloadField::Cwd)) {
                cwd = Some(dir);
            }
            if let Some(label) = non_empty(event.tmux_session()) {
                tmux_session = Some(label);
            }
        }

        let has_end_marker = end_events > 0;
        Some(Self {
            session_id: session_id.to_string(),
            start,
            end,
            has_end_marker,
            status: SessionStatus::resolve(has_end_marker, end, now),
            duration_seconds: seconds_between(start, end),
            total_events: events.len(),
            start_events,
            end_events,
            tools_used: tools.into_iter().map(String::from).collect(),
            start_source,
            cwd: cwd.map(String::from),
            tmux_session: tmux_session.map(String::from),
        })
    }
}

/// One tmux label and the sessions launched under it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TmuxSession {
    pub tmux_session: String,
    /// Constituent session ids, sorted.
    pub session_ids: Vec<String>,
    pub first_activity: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub total_events: usize,
    /// Sum of member session durations, not the wall-clock span.
    pub total_duration_seconds: f64,
    pub status: TmuxStatus,
}

/// Derives one [`Session`] per session id, newest start first.
///
/// Events without a `session_id` are excluded.
pub fn reconstruct_sessions<E: TraceEvent>(events: &[E], now: DateTime<Utc>) -> Vec<Session> {
    let partitions = partition_by_session(events);
    let mut sessions: Vec<Session> = partitions
        .par_iter()
        .filter_map(|(session_id, events)| Session::from_events(session_id, events, now))
        .collect();
    sessions.sort_by(|a, b| {
        b.start
            .cmp(&a.start)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
    sessions
}

/// Derives the lifecycle of a single session.
pub fn reconstruct_session_lifecycle<E: TraceEvent>(
    events: &[E],
    session_id: &str,
    now: DateTime<Utc>,
) -> Result<Session, QueryError> {
    if session_id.is_empty() {
        return Err(QueryError::not_found(EntityKind::Session, session_id));
    }
    let matching: Vec<&E> = sorted_by_time(events)
        .into_iter()
        .filter(|e| e.session_id() == Some(session_id))
        .collect();
    Session::from_events(session_id, &matching, now)
        .ok_or_else(|| QueryError::not_found(EntityKind::Session, session_id))
}

/// Non-empty tmux labels reported by each session id.
fn labels_by_session<E: TraceEvent>(events: &[E]) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut labels: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for event in events {
        let label = non_empty(event.tmux_session());
        if let (Some(session_id), Some(label)) = (session_key(event), label) {
            labels.entry(session_id).or_default().insert(label);
        }
    }
    labels
}

/// Groups sessions by tmux label, most recently active first.
///
/// A session belongs to every label it ever reported. Sessions that never
/// reported a tmux label are left out.
pub fn reconstruct_tmux_sessions<E: TraceEvent>(
    events: &[E],
    now: DateTime<Utc>,
) -> Vec<TmuxSession> {
    let labels = labels_by_session(events);
    let mut groups: BTreeMap<&str, Vec<Session>> = BTreeMap::new();
    for session in reconstruct_sessions(events, now) {
        let Some(session_labels) = labels.get(session.session_id.as_str()) else {
            continue;
        };
        for label in session_labels {
            groups.entry(label).or_default().push(session.clone());
        }
    }

    let mut tmux_sessions: Vec<TmuxSession> = groups
        .into_iter()
        .filter_map(|(label, sessions)| aggregate_tmux(label.to_string(), &sessions, now))
        .collect();
    tmux_sessions.sort_by(|a, b| {
        b.last_activity
            .cmp(&a.last_activity)
            .then_with(|| a.tmux_session.cmp(&b.tmux_session))
    });
    tmux_sessions
}

/// Derives the lifecycle of a single tmux session.
pub fn reconstruct_tmux_lifecycle<E: TraceEvent>(
    events: &[E],
    label: &str,
    now: DateTime<Utc>,
) -> Result<TmuxSession, QueryError> {
    reconstruct_tmux_sessions(events, now)
        .into_iter()
        .find(|t| t.tmux_session == label)
        .ok_or_else(|| QueryError::not_found(EntityKind::TmuxSession, label))
}

fn aggregate_tmux(label: String, sessions: &[Session], now: DateTime<Utc>) -> Option<TmuxSession> {
    let first_activity = sessions.iter().map(|s| s.start).min()?;
    let last_activity = sessions.iter().map(|s| s.end).max()?;
    let session_ids: BTreeSet<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();

    Some(TmuxSession {
        tmux_session: label,
        session_ids: session_ids.into_iter().map(String::from).collect(),
        first_activity,
        last_activity,
        total_events: sessions.iter().map(|s| s.total_events).sum(),
        total_duration_seconds: sessions.iter().map(|s| s.duration_seconds).sum(),
        status: TmuxStatus::resolve(last_activity, now),
    })
}
