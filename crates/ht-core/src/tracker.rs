//! Query facade over an [`EventStore`].
//!
//! Each method loads the slice it needs and hands it to one derivation.
//! Nothing is cached between calls; "now" and "current" are resolved per call.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::activity::{
    ActiveSession, ActivityStats, FileOperation, TimelineEntry, ToolUsage, active_sessions,
    activity_stats, file_operations, summarize_tool_usage, timeline,
};
use crate::agents::{AgentDetail, AgentUsage, agent_detail, summarize_agent_usage};
use crate::error::{EntityKind, QueryError};
use crate::event::session_key;
use crate::event_type::EventType;
use crate::gaps::{Interval, classify_gaps};
use crate::lifecycle::{
    Session, TmuxSession, reconstruct_session_lifecycle, reconstruct_sessions,
    reconstruct_tmux_lifecycle, reconstruct_tmux_sessions,
};
use crate::parallel::{ParallelGroup, group_parallel_spans};
use crate::spans::{AgentSpan, build_agent_spans};
use crate::store::{EventFilter, EventStore};
use crate::work_wait::{SignificantGap, WorkWaitReport, compute_work_wait, find_significant_gaps};

/// Read-only analytics over one event store.
#[derive(Debug, Clone)]
pub struct Tracker<S> {
    store: S,
}

impl<S: EventStore> Tracker<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    fn load(&self, filter: &EventFilter) -> Result<Vec<S::Event>, QueryError> {
        let events = self.store.query(filter)?;
        tracing::debug!(count = events.len(), ?filter, "loaded events");
        Ok(events)
    }

    fn load_session(&self, session_id: &str) -> Result<Vec<S::Event>, QueryError> {
        if session_id.is_empty() {
            return Err(QueryError::not_found(EntityKind::Session, session_id));
        }
        let events = self.load(&EventFilter::for_session(session_id))?;
        if events.is_empty() {
            return Err(QueryError::not_found(EntityKind::Session, session_id));
        }
        Ok(events)
    }

    /// Every event of every session that ever ran under `label`.
    fn load_tmux(&self, label: &str) -> Result<Vec<S::Event>, QueryError> {
        let labelled = self.load(&EventFilter::for_tmux(label))?;
        let session_ids: BTreeSet<&str> = labelled.iter().filter_map(session_key).collect();
        if session_ids.is_empty() {
            return Err(QueryError::not_found(EntityKind::TmuxSession, label));
        }

        let mut events = Vec::new();
        for session_id in session_ids {
            events.extend(self.load(&EventFilter::for_session(session_id))?);
        }
        Ok(events)
    }

    /// Id of the session that logged the most recent event.
    pub fn current_session(&self) -> Result<String, QueryError> {
        let filter = EventFilter::all().with_session_only().newest_first().limit(1);
        self.load(&filter)?
            .first()
            .and_then(session_key)
            .map(String::from)
            .ok_or(QueryError::NoSessions)
    }

    pub fn session(&self, session_id: &str, now: DateTime<Utc>) -> Result<Session, QueryError> {
        let events = self.load_session(session_id)?;
        reconstruct_session_lifecycle(&events, session_id, now)
    }

    pub fn sessions(&self, now: DateTime<Utc>) -> Result<Vec<Session>, QueryError> {
        let events = self.load(&EventFilter::all().with_session_only())?;
        Ok(reconstruct_sessions(&events, now))
    }

    pub fn tmux_session(&self, label: &str, now: DateTime<Utc>) -> Result<TmuxSession, QueryError> {
        let events = self.load_tmux(label)?;
        reconstruct_tmux_lifecycle(&events, label, now)
    }

    pub fn tmux_sessions(&self, now: DateTime<Utc>) -> Result<Vec<TmuxSession>, QueryError> {
        let events = self.load(&EventFilter::all().with_session_only())?;
        Ok(reconstruct_tmux_sessions(&events, now))
    }

    pub fn session_gaps(&self, session_id: &str) -> Result<Vec<Interval>, QueryError> {
        let events = self.load_session(session_id)?;
        Ok(classify_gaps(&events).collect())
    }

    /// Gaps of every session under a tmux label, one partition per session.
    pub fn tmux_gaps(&self, label: &str) -> Result<Vec<Interval>, QueryError> {
        let events = self.load_tmux(label)?;
        Ok(classify_gaps(&events).collect())
    }

    pub fn work_wait(&self, since: Option<DateTime<Utc>>) -> Result<WorkWaitReport, QueryError> {
        let events = self.load(&EventFilter::all().with_session_only().since(since))?;
        compute_work_wait(&events)
    }

    pub fn significant_gaps(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SignificantGap>, QueryError> {
        let events = self.load(&EventFilter::all().with_session_only().since(since))?;
        Ok(find_significant_gaps(&events))
    }

    pub fn session_spans(&self, session_id: &str) -> Result<Vec<AgentSpan>, QueryError> {
        let events = self.load_session(session_id)?;
        Ok(build_agent_spans(&events))
    }

    pub fn parallel_groups(&self, session_id: &str) -> Result<Vec<ParallelGroup>, QueryError> {
        let spans = self.session_spans(session_id)?;
        Ok(group_parallel_spans(&spans))
    }

    pub fn agent_usage(&self, since: Option<DateTime<Utc>>) -> Result<Vec<AgentUsage>, QueryError> {
        let filter = EventFilter::all()
            .event_types([EventType::PreToolUse])
            .since(since);
        Ok(summarize_agent_usage(&self.load(&filter)?))
    }

    pub fn agent_detail(
        &self,
        agent_type: &str,
        now: DateTime<Utc>,
    ) -> Result<AgentDetail, QueryError> {
        let events = self.load(&EventFilter::all())?;
        agent_detail(&events, agent_type, now)
    }

    pub fn tool_usage(&self, session_id: &str) -> Result<Vec<ToolUsage>, QueryError> {
        let events = self.load_session(session_id)?;
        Ok(summarize_tool_usage(&events))
    }

    pub fn activity_stats(&self, now: DateTime<Utc>) -> Result<ActivityStats, QueryError> {
        let filter = EventFilter::all().since(Some(now - Duration::days(7)));
        Ok(activity_stats(&self.load(&filter)?, now))
    }

    pub fn active_sessions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ActiveSession>, QueryError> {
        let events = self.load(&EventFilter::all().with_session_only())?;
        Ok(active_sessions(&events, now, limit))
    }

    pub fn file_operations(&self, limit: usize) -> Result<Vec<FileOperation>, QueryError> {
        let filter =
            EventFilter::all().event_types([EventType::PreToolUse, EventType::PostToolUse]);
        Ok(file_operations(&self.load(&filter)?, limit))
    }

    /// The last `limit` events of a session, oldest first.
    pub fn timeline(&self, session_id: &str, limit: usize) -> Result<Vec<TimelineEntry>, QueryError> {
        if session_id.is_empty() {
            return Err(QueryError::not_found(EntityKind::Session, session_id));
        }
        let filter = EventFilter::for_session(session_id).newest_first().limit(limit);
        let events = self.load(&filter)?;
        if events.is_empty() {
            return Err(QueryError::not_found(EntityKind::Session, session_id));
        }
        Ok(timeline(&events))
    }
}
