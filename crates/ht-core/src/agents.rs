//! Sub-agent usage statistics.
//!
//! Invocations are counted from `Task` `PreToolUse` events. Reported
//! durations only exist on the `PostToolUse` side
//! (`tool_response.totalDurationMs`), so duration statistics are taken from
//! there.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::QueryError;
use crate::event::{TraceEvent, non_empty, session_key, sorted_by_time};
use crate::event_type::EventType;
use crate::lifecycle::{Session, reconstruct_sessions};
use crate::parallel::{ParallelGroup, group_parallel_spans};
use crate::payload::PayloadField;
use crate::spans::{AgentSpan, build_agent_spans_for};

/// At most this many recent invocations are listed per agent type.
pub const RECENT_INVOCATIONS: usize = 50;

/// At most this many sessions are listed per agent type.
pub const AGENT_SESSIONS: usize = 20;

/// Usage summary for one agent type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentUsage {
    pub agent_type: String,
    pub usage_count: usize,
    pub sessions_used: usize,
    pub first_used: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

/// Distribution of reported durations, in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationStats {
    pub samples: usize,
    pub avg_ms: i64,
    pub min_ms: i64,
    pub max_ms: i64,
    pub median_ms: i64,
    pub p95_ms: i64,
}

impl DurationStats {
    /// Summarizes `samples`; `None` when there are none.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn from_samples(mut samples: Vec<f64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(f64::total_cmp);
        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        Some(Self {
            samples: count,
            avg_ms: mean.round() as i64,
            min_ms: samples[0].round() as i64,
            max_ms: samples[count - 1].round() as i64,
            median_ms: percentile(&samples, 0.5).round() as i64,
            p95_ms: percentile(&samples, 0.95).round() as i64,
        })
    }
}

/// Linear-interpolated percentile of a sorted, non-empty slice.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    let rank = fraction * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// One `Task` start for an agent type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentInvocation {
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
    pub description: Option<String>,
    pub cwd: Option<String>,
    pub tmux_session: Option<String>,
}

/// Everything known about one agent type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentDetail {
    pub agent_type: String,
    pub total_invocations: usize,
    pub unique_sessions: usize,
    pub first_used: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    /// `None` when no end event reported a duration.
    pub durations: Option<DurationStats>,
    /// Newest first.
    pub recent_invocations: Vec<AgentInvocation>,
    /// Sessions that invoked the agent, most recently active first.
    pub sessions: Vec<Session>,
    pub spans: Vec<AgentSpan>,
    pub orphans: usize,
    pub parallel_groups: Vec<ParallelGroup>,
}

fn task_agent<E: TraceEvent>(event: &E, kind: EventType) -> Option<&str> {
    if event.is_task() && event.kind() == Some(kind) {
        non_empty(event.subagent_type())
    } else {
        None
    }
}

#[derive(Default)]
struct UsageAccumulator<'a> {
    count: usize,
    sessions: BTreeSet<&'a str>,
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

impl<'a> UsageAccumulator<'a> {
    fn add<E: TraceEvent>(&mut self, event: &'a E) {
        let timestamp = event.timestamp();
        self.count += 1;
        if let Some(session_id) = session_key(event) {
            self.sessions.insert(session_id);
        }
        self.first = Some(self.first.map_or(timestamp, |t| t.min(timestamp)));
        self.last = Some(self.last.map_or(timestamp, |t| t.max(timestamp)));
    }
}

/// Per agent type usage, most used first (ties by name).
pub fn summarize_agent_usage<E: TraceEvent>(events: &[E]) -> Vec<AgentUsage> {
    let mut by_agent: BTreeMap<&str, UsageAccumulator<'_>> = BTreeMap::new();
    for event in events {
        if let Some(agent_type) = task_agent(event, EventType::PreToolUse) {
            by_agent.entry(agent_type).or_default().add(event);
        }
    }

    let mut usage: Vec<AgentUsage> = by_agent
        .into_iter()
        .filter_map(|(agent_type, acc)| {
            Some(AgentUsage {
                agent_type: agent_type.to_string(),
                usage_count: acc.count,
                sessions_used: acc.sessions.len(),
                first_used: acc.first?,
                last_used: acc.last?,
            })
        })
        .collect();
    usage.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| a.agent_type.cmp(&b.agent_type))
    });
    usage
}

/// Detailed statistics for one agent type.
///
/// `events` should hold every event of the sessions involved, since the
/// session list is reconstructed from them. Returns
/// [`QueryError::NotFound`] if no `Task` event names `agent_type`.
pub fn agent_detail<E: TraceEvent>(
    events: &[E],
    agent_type: &str,
    now: DateTime<Utc>,
) -> Result<AgentDetail, QueryError> {
    let spans = build_agent_spans_for(events, agent_type)?;

    let mut usage = UsageAccumulator::default();
    let mut invocations = Vec::new();
    let mut durations = Vec::new();
    for event in sorted_by_time(events) {
        if task_agent(event, EventType::PreToolUse) == Some(agent_type) {
            usage.add(event);
            invocations.push(AgentInvocation {
                timestamp: event.timestamp(),
                session_id: session_key(event).map(String::from),
                description: non_empty(event.field_str(PayloadField::Description))
                    .map(String::from),
                cwd: non_empty(event.field_str(PayloadField::Cwd)).map(String::from),
                tmux_session: non_empty(event.tmux_session()).map(String::from),
            });
        } else if task_agent(event, EventType::PostToolUse) == Some(agent_type) {
            if let Some(ms) = event.field_f64(PayloadField::TotalDurationMs) {
                durations.push(ms);
            }
        }
    }
    invocations.reverse();
    invocations.truncate(RECENT_INVOCATIONS);

    let mut sessions: Vec<Session> = reconstruct_sessions(events, now)
        .into_iter()
        .filter(|s| usage.sessions.contains(s.session_id.as_str()))
        .collect();
    sessions.sort_by(|a, b| b.end.cmp(&a.end).then_with(|| a.session_id.cmp(&b.session_id)));
    sessions.truncate(AGENT_SESSIONS);

    tracing::debug!(
        agent_type,
        invocations = usage.count,
        duration_samples = durations.len(),
        spans = spans.len(),
        "built agent detail"
    );

    Ok(AgentDetail {
        agent_type: agent_type.to_string(),
        total_invocations: usage.count,
        unique_sessions: usage.sessions.len(),
        first_used: usage.first,
        last_used: usage.last,
        durations: DurationStats::from_samples(durations),
        recent_invocations: invocations,
        sessions,
        orphans: spans.iter().filter(|s| s.is_orphan()).count(),
        parallel_groups: group_parallel_spans(&spans),
        spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{TestEvent, ts};
    use serde_json::json;

    fn finished(seconds: f64, session: &str, agent: &str, duration_ms: i64) -> TestEvent {
        TestEvent::task(seconds, "PostToolUse", session, agent).with_payload(json!({
            "tool_input": {"subagent_type": agent},
            "tool_response": {"totalDurationMs": duration_ms}
        }))
    }

    #[test]
    fn test_usage_counts_starts_per_agent_type() {
        let events = vec![
            TestEvent::task(0.0, "PreToolUse", "a", "explorer"),
            TestEvent::task(5.0, "PreToolUse", "b", "explorer"),
            TestEvent::task(9.0, "PreToolUse", "b", "explorer"),
            TestEvent::task(2.0, "PreToolUse", "a", "planner"),
            TestEvent::task(3.0, "PostToolUse", "a", "planner"),
            TestEvent::tool(4.0, "PreToolUse", "a", "Bash"),
        ];

        let usage = summarize_agent_usage(&events);
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].agent_type, "explorer");
        assert_eq!(usage[0].usage_count, 3);
        assert_eq!(usage[0].sessions_used, 2);
        assert_eq!(usage[0].first_used, ts(0.0));
        assert_eq!(usage[0].last_used, ts(9.0));
        assert_eq!(usage[1].agent_type, "planner");
        assert_eq!(usage[1].usage_count, 1);
    }

    #[test]
    fn test_percentiles_interpolate_linearly() {
        let stats = DurationStats::from_samples(vec![400.0, 100.0, 300.0, 200.0]).unwrap();
        assert_eq!(stats.samples, 4);
        assert_eq!(stats.avg_ms, 250);
        assert_eq!(stats.min_ms, 100);
        assert_eq!(stats.max_ms, 400);
        assert_eq!(stats.median_ms, 250);
        assert_eq!(stats.p95_ms, 385);
        assert_eq!(DurationStats::from_samples(Vec::new()), None);
    }

    #[test]
    fn test_detail_combines_invocations_durations_and_spans() {
        let events = vec![
            TestEvent::at(0.0, "SessionStart", "s1").in_tmux("main"),
            TestEvent::task(1.0, "PreToolUse", "s1", "reviewer").with_payload(json!({
                "tool_input": {"subagent_type": "reviewer", "description": "check diff"},
                "cwd": "/repo"
            })),
            TestEvent::task(1.5, "PreToolUse", "s1", "reviewer"),
            finished(4.0, "s1", "reviewer", 3000),
            finished(6.0, "s1", "reviewer", 4000),
            TestEvent::task(20.0, "PreToolUse", "s2", "reviewer"),
            TestEvent::task(21.0, "PreToolUse", "s2", "planner"),
        ];

        let detail = agent_detail(&events, "reviewer", ts(30.0)).unwrap();
        assert_eq!(detail.total_invocations, 3);
        assert_eq!(detail.unique_sessions, 2);
        assert_eq!(detail.first_used, Some(ts(1.0)));
        assert_eq!(detail.last_used, Some(ts(20.0)));

        let durations = detail.durations.unwrap();
        assert_eq!((durations.samples, durations.avg_ms), (2, 3500));

        assert_eq!(detail.recent_invocations[0].timestamp, ts(20.0));
        let oldest = &detail.recent_invocations[2];
        assert_eq!(oldest.description.as_deref(), Some("check diff"));
        assert_eq!(oldest.cwd.as_deref(), Some("/repo"));

        assert_eq!(detail.spans.len(), 3);
        assert_eq!(detail.orphans, 1);
        assert_eq!(detail.parallel_groups[0].size, 2);

        let ids: Vec<_> = detail.sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, ["s2", "s1"]);
        assert_eq!(detail.sessions[1].tmux_session.as_deref(), Some("main"));
    }

    #[test]
    fn test_detail_without_reported_durations_has_no_stats() {
        let events = vec![TestEvent::task(0.0, "PreToolUse", "s", "x")];
        let detail = agent_detail(&events, "x", ts(1.0)).unwrap();
        assert_eq!(detail.durations, None);
    }

    #[test]
    fn test_detail_for_unknown_agent_is_not_found() {
        let events = vec![TestEvent::task(0.0, "PreToolUse", "s", "x")];
        assert!(agent_detail(&events, "y", ts(1.0)).unwrap_err().is_not_found());
    }
}
