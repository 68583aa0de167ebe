//! Sub-agent invocation spans from `Task` tool events.
//!
//! The hook log has no invocation id linking a `PreToolUse` of the `Task` tool
//! to its `PostToolUse`. Spans are therefore paired positionally: within one
//! session and one agent type, the k-th start (by timestamp) pairs with the
//! k-th end. Unmatched events on either side become orphan spans.
//!
//! # Limitation
//!
//! Positional pairing assumes invocations of the same agent type finish in the
//! order they were issued. Two overlapping same-type invocations that complete
//! in crossed order are mispaired; both spans still exist, with swapped ends.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{EntityKind, QueryError};
use crate::event::{TraceEvent, non_empty, seconds_between, session_key, sorted_by_time};
use crate::event_type::EventType;
use crate::payload::PayloadField;

/// One reconstructed sub-agent invocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSpan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub agent_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `None` when the start event was not found.
    pub start_time: Option<DateTime<Utc>>,
    /// `None` when the end event was not found.
    pub end_time: Option<DateTime<Utc>>,
    /// `end_time - start_time`, only when both are present.
    pub duration_seconds: Option<f64>,
    /// Token total reported by the end event.
    pub total_tokens: Option<i64>,
    /// Duration reported by the end event itself, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_duration_ms: Option<i64>,
    /// True when either counterpart is missing.
    pub orphan: bool,
}

impl AgentSpan {
    fn pair<E: TraceEvent>(
        session_id: Option<&str>,
        agent_type: &str,
        start: Option<&E>,
        end: Option<&E>,
    ) -> Self {
        let start_time = start.map(|e| e.timestamp());
        let end_time = end.map(|e| e.timestamp());
        let description = start
            .and_then(|e| non_empty(e.field_str(PayloadField::Description)))
            .or_else(|| end.and_then(|e| non_empty(e.field_str(PayloadField::Description))))
            .map(String::from);
        let duration_seconds = match (start_time, end_time) {
            (Some(s), Some(e)) => Some(seconds_between(s, e)),
            _ => None,
        };

        Self {
            session_id: session_id.map(String::from),
            agent_type: agent_type.to_string(),
            description,
            start_time,
            end_time,
            duration_seconds,
            total_tokens: end.and_then(|e| e.field_i64(PayloadField::TotalTokens)),
            reported_duration_ms: end.and_then(|e| e.field_i64(PayloadField::TotalDurationMs)),
            orphan: start.is_none() || end.is_none(),
        }
    }

    /// Returns true if the start or end counterpart is missing.
    pub const fn is_orphan(&self) -> bool {
        self.orphan
    }
}

type SpanKey<'a> = (Option<&'a str>, &'a str);

struct Sides<'a, E> {
    starts: Vec<&'a E>,
    ends: Vec<&'a E>,
}

/// Pairs `Task` start/end events into spans.
///
/// Pairing is per (session, agent type). For P starts and Q ends the result
/// holds max(P, Q) spans, |P - Q| of them orphans. `Task` events without an
/// agent type are skipped. Spans are ordered by start time (orphans without a
/// start last), then end time.
pub fn build_agent_spans<E: TraceEvent>(events: &[E]) -> Vec<AgentSpan> {
    let mut partitions: BTreeMap<SpanKey<'_>, Sides<'_, E>> = BTreeMap::new();

    for event in sorted_by_time(events) {
        if !event.is_task() {
            continue;
        }
        let kind = event.kind();
        if !matches!(kind, Some(EventType::PreToolUse | EventType::PostToolUse)) {
            continue;
        }
        let Some(agent_type) = non_empty(event.subagent_type()) else {
            tracing::debug!(
                timestamp = %event.timestamp(),
                "Task event without subagent_type, not pairing"
            );
            continue;
        };

        let sides = partitions
            .entry((session_key(event), agent_type))
            .or_insert_with(|| Sides {
                starts: Vec::new(),
                ends: Vec::new(),
            });
        if kind == Some(EventType::PreToolUse) {
            sides.starts.push(event);
        } else {
            sides.ends.push(event);
        }
    }

    let mut spans = Vec::new();
    for ((session_id, agent_type), sides) in partitions {
        let count = sides.starts.len().max(sides.ends.len());
        for rank in 0..count {
            spans.push(AgentSpan::pair(
                session_id,
                agent_type,
                sides.starts.get(rank).copied(),
                sides.ends.get(rank).copied(),
            ));
        }
    }

    spans.sort_by(|a, b| {
        (a.start_time.is_none(), a.start_time, a.end_time)
            .cmp(&(b.start_time.is_none(), b.start_time, b.end_time))
    });
    spans
}

/// Spans for one agent type.
///
/// Returns [`QueryError::NotFound`] if no `Task` event names that agent type.
pub fn build_agent_spans_for<E: TraceEvent>(
    events: &[E],
    agent_type: &str,
) -> Result<Vec<AgentSpan>, QueryError> {
    let spans: Vec<AgentSpan> = build_agent_spans(events)
        .into_iter()
        .filter(|s| s.agent_type == agent_type)
        .collect();
    if spans.is_empty() {
        return Err(QueryError::not_found(EntityKind::AgentType, agent_type));
    }
    Ok(spans)
}
