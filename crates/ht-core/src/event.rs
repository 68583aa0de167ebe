//! The read-side view of one hook event.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use crate::event_type::EventType;
use crate::payload::{self, PayloadField};

/// Tool name that denotes a sub-agent invocation.
pub const TASK_TOOL: &str = "Task";

/// An event the derivations can read.
///
/// This trait allows the derivations to work with different event
/// representations (e.g., `StoredEvent` from ht-db, or test fixtures).
/// Implementations must be cheap to query; every method is called many times
/// per pass.
pub trait TraceEvent: Sync {
    /// When the event was recorded.
    fn timestamp(&self) -> DateTime<Utc>;

    /// The raw hook event name (e.g., `PreToolUse`).
    fn event_type(&self) -> &str;

    /// The assistant session this event belongs to.
    fn session_id(&self) -> Option<&str>;

    /// The terminal multiplexer session the assistant ran in.
    fn tmux_session(&self) -> Option<&str>;

    /// Tool name for tool-use events.
    fn tool_name(&self) -> Option<&str>;

    /// Sub-agent type, only present on `Task` tool events.
    fn subagent_type(&self) -> Option<&str>;

    /// The full schemaless payload.
    fn payload(&self) -> &Value;

    /// Parsed event type; `None` for event names the core ignores.
    fn kind(&self) -> Option<EventType> {
        self.event_type().parse().ok()
    }

    /// Returns true if this is a `Task` tool event.
    fn is_task(&self) -> bool {
        self.tool_name() == Some(TASK_TOOL)
    }

    /// Reads a string payload field.
    fn field_str(&self, field: PayloadField) -> Option<&str> {
        payload::get_str(self.payload(), field)
    }

    /// Reads an integer payload field.
    fn field_i64(&self, field: PayloadField) -> Option<i64> {
        payload::get_i64(self.payload(), field)
    }

    /// Reads a numeric payload field.
    fn field_f64(&self, field: PayloadField) -> Option<f64> {
        payload::get_f64(self.payload(), field)
    }
}

/// Treats empty strings the same as absent values.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Session id used for partitioning, empty ids excluded.
pub(crate) fn session_key<E: TraceEvent>(event: &E) -> Option<&str> {
    non_empty(event.session_id())
}

/// References to `events` in timestamp order.
///
/// The sort is stable, so events sharing a timestamp keep their arrival order.
pub(crate) fn sorted_by_time<E: TraceEvent>(events: &[E]) -> Vec<&E> {
    let mut sorted: Vec<&E> = events.iter().collect();
    sorted.sort_by_key(|e| e.timestamp());
    sorted
}

/// Groups events by session id, each partition in timestamp order.
///
/// Partitions are ordered by their first timestamp, then by session id.
/// Events without a session id are dropped.
pub(crate) fn partition_by_session<E: TraceEvent>(events: &[E]) -> Vec<(&str, Vec<&E>)> {
    let mut partitions: BTreeMap<&str, Vec<&E>> = BTreeMap::new();
    for event in sorted_by_time(events) {
        if let Some(session_id) = session_key(event) {
            partitions.entry(session_id).or_default().push(event);
        }
    }

    let mut partitions: Vec<_> = partitions.into_iter().collect();
    partitions.sort_by_key(|(_, events)| events.first().map(|e| e.timestamp()));
    partitions
}

/// Seconds between two instants, negative if `end` precedes `start`.
pub(crate) fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    delta_seconds(end - start)
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn delta_seconds(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}
