//! Test event fixtures shared by the derivation tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};

use crate::error::StoreError;
use crate::event::TraceEvent;
use crate::store::{EventFilter, EventStore, SortOrder};

/// Test event implementation.
#[derive(Debug, Clone)]
pub struct TestEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub session_id: Option<String>,
    pub tmux_session: Option<String>,
    pub tool_name: Option<String>,
    pub subagent_type: Option<String>,
    pub payload: Value,
}

impl TestEvent {
    pub fn new(timestamp: DateTime<Utc>, event_type: &str, session_id: Option<&str>) -> Self {
        Self {
            timestamp,
            event_type: event_type.to_string(),
            session_id: session_id.map(String::from),
            tmux_session: None,
            tool_name: None,
            subagent_type: None,
            payload: json!({}),
        }
    }

    /// A lifecycle or prompt event in session `session_id`.
    pub fn at(seconds: f64, event_type: &str, session_id: &str) -> Self {
        Self::new(ts(seconds), event_type, Some(session_id))
    }

    /// A tool-use event for a non-Task tool.
    pub fn tool(seconds: f64, event_type: &str, session_id: &str, tool: &str) -> Self {
        let mut event = Self::at(seconds, event_type, session_id);
        event.tool_name = Some(tool.to_string());
        event
    }

    /// A `Task` tool event for `agent_type`.
    pub fn task(seconds: f64, event_type: &str, session_id: &str, agent_type: &str) -> Self {
        let mut event = Self::tool(seconds, event_type, session_id, "Task");
        event.subagent_type = Some(agent_type.to_string());
        event.payload = json!({"tool_input": {"subagent_type": agent_type}});
        event
    }

    pub fn in_tmux(mut self, label: &str) -> Self {
        self.tmux_session = Some(label.to_string());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

impl TraceEvent for TestEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn tmux_session(&self) -> Option<&str> {
        self.tmux_session.as_deref()
    }

    fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    fn subagent_type(&self) -> Option<&str> {
        self.subagent_type.as_deref()
    }

    fn payload(&self) -> &Value {
        &self.payload
    }
}

/// Base instant plus `seconds` (millisecond resolution).
#[allow(clippy::cast_possible_truncation)]
pub fn ts(seconds: f64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0)
        .single()
        .expect("valid test timestamp")
        + Duration::milliseconds((seconds * 1000.0).round() as i64)
}

/// In-memory store over fixture events, insertion order breaking timestamp ties.
pub struct VecStore(pub Vec<TestEvent>);

impl EventStore for VecStore {
    type Event = TestEvent;

    fn query(&self, filter: &EventFilter) -> Result<Vec<TestEvent>, StoreError> {
        let mut events: Vec<TestEvent> = self
            .0
            .iter()
            .filter(|e| filter.matches(*e))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        if filter.order == SortOrder::Descending {
            events.reverse();
        }
        if let Some(limit) = filter.limit {
            events.truncate(limit);
        }
        Ok(events)
    }
}
