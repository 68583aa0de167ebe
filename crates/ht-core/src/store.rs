//! The read-only event store seam.
//!
//! The derivations never touch storage. A store turns an [`EventFilter`] into
//! a slice of events; everything else happens in memory.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::event::TraceEvent;
use crate::event_type::EventType;

/// Timestamp order of a query result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Conjunctive filter over the event log. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub session_id: Option<String>,
    pub tmux_session: Option<String>,
    /// Restrict to these event types.
    pub event_types: Option<Vec<EventType>>,
    /// Only events with a non-empty session id.
    pub with_session_only: bool,
    /// Inclusive lower bound on timestamp.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub order: SortOrder,
}

impl EventFilter {
    /// Matches every event, oldest first.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_session(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            ..Self::default()
        }
    }

    pub fn for_tmux(label: &str) -> Self {
        Self {
            tmux_session: Some(label.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = Some(types.into_iter().collect());
        self
    }

    #[must_use]
    pub const fn with_session_only(mut self) -> Self {
        self.with_session_only = true;
        self
    }

    #[must_use]
    pub const fn since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn newest_first(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    /// Evaluates the filter against one event, ignoring `limit` and `order`.
    pub fn matches<E: TraceEvent>(&self, event: &E) -> bool {
        if let Some(id) = &self.session_id {
            if event.session_id() != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(label) = &self.tmux_session {
            if event.tmux_session() != Some(label.as_str()) {
                return false;
            }
        }
        if let Some(types) = &self.event_types {
            if !event.kind().is_some_and(|kind| types.contains(&kind)) {
                return false;
            }
        }
        if self.with_session_only && event.session_id().is_none_or(str::is_empty) {
            return false;
        }
        self.since.is_none_or(|since| event.timestamp() >= since)
    }
}

/// A read-only source of events.
///
/// Implementations return events ordered by timestamp in the filter's
/// [`SortOrder`], ties broken by insertion order, truncated to `limit`.
pub trait EventStore {
    type Event: TraceEvent;

    fn query(&self, filter: &EventFilter) -> Result<Vec<Self::Event>, StoreError>;
}

impl<S: EventStore + ?Sized> EventStore for &S {
    type Event = S::Event;

    fn query(&self, filter: &EventFilter) -> Result<Vec<Self::Event>, StoreError> {
        (**self).query(filter)
    }
}
