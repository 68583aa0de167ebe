//! Core derivation logic for coding-assistant hook event logs.
//!
//! This crate contains the fundamental types and logic for:
//! - Lifecycle: reconstructing session and tmux-session start/end/status
//! - Gaps: labelling inter-event intervals by activity state
//! - Work/wait: active vs. waiting time from `UserPromptSubmit`/`Stop` markers
//! - Spans: positional pairing of `Task` tool start/end events into sub-agent spans
//! - Parallel groups: clustering spans issued in the same orchestration step
//! - Agent and tool statistics for the session drill-down views
//!
//! Every derivation is a pure function of an event slice. The [`Tracker`]
//! facade composes them with an [`EventStore`].

pub mod activity;
pub mod agents;
mod error;
pub mod event;
pub mod event_type;
#[cfg(test)]
mod fixtures;
pub mod gaps;
pub mod lifecycle;
pub mod parallel;
pub mod payload;
pub mod spans;
pub mod store;
pub mod tracker;
pub mod work_wait;

pub use activity::{
    ActiveSession, ActivityStats, FileOperation, TimelineEntry, ToolUsage, WindowStats,
};
pub use agents::{AgentDetail, AgentInvocation, AgentUsage, DurationStats};
pub use error::{EntityKind, QueryError, StoreError};
pub use event::TraceEvent;
pub use event_type::{EventType, UnknownEventType};
pub use gaps::{ActivityState, GapSummary, Gaps, Interval, classify_gaps};
pub use lifecycle::{
    Session, SessionStatus, TmuxSession, TmuxStatus, reconstruct_session_lifecycle,
    reconstruct_sessions, reconstruct_tmux_lifecycle, reconstruct_tmux_sessions,
};
pub use parallel::{ParallelGroup, group_parallel_spans};
pub use payload::PayloadField;
pub use spans::{AgentSpan, build_agent_spans, build_agent_spans_for};
pub use store::{EventFilter, EventStore, SortOrder};
pub use tracker::Tracker;
pub use work_wait::{
    SessionWorkWait, SignificantGap, WaitHistogram, WorkWaitReport, compute_work_wait,
    find_significant_gaps,
};
