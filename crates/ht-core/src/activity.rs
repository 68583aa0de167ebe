//! Session drill-down: tool usage, recent activity, file operations and
//! per-event timelines.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::event::{TraceEvent, non_empty, seconds_between, sorted_by_time};
use crate::event_type::EventType;
use crate::lifecycle::reconstruct_sessions;
use crate::payload::PayloadField;

/// Label used for tool events that do not name their tool.
pub const UNKNOWN_TOOL: &str = "Unknown";

/// Tools that operate on a single file.
pub const FILE_TOOLS: [&str; 4] = ["Read", "Write", "Edit", "MultiEdit"];

/// A session without `SessionEnd` counts as running if its last event is this recent.
pub const ACTIVE_SESSION_SECS: i64 = 60 * 60;

/// Usage counts for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolUsage {
    pub tool_name: String,
    pub pre_count: usize,
    pub post_count: usize,
    pub unique_commands: usize,
    pub unique_files: usize,
}

#[derive(Default)]
struct ToolAccumulator<'a> {
    pre: usize,
    post: usize,
    commands: BTreeSet<&'a str>,
    files: BTreeSet<&'a str>,
}

/// Per tool usage over `PreToolUse`/`PostToolUse` events, most started first.
pub fn summarize_tool_usage<E: TraceEvent>(events: &[E]) -> Vec<ToolUsage> {
    let mut by_tool: BTreeMap<&str, ToolAccumulator<'_>> = BTreeMap::new();
    for event in events {
        let kind = event.kind();
        if !matches!(kind, Some(EventType::PreToolUse | EventType::PostToolUse)) {
            continue;
        }
        let tool = non_empty(event.tool_name()).unwrap_or(UNKNOWN_TOOL);
        let acc = by_tool.entry(tool).or_default();
        if kind == Some(EventType::PreToolUse) {
            acc.pre += 1;
        } else {
            acc.post += 1;
        }
        if let Some(command) = event.field_str(PayloadField::Command) {
            acc.commands.insert(command);
        }
        if let Some(path) = event.field_str(PayloadField::FilePath) {
            acc.files.insert(path);
        }
    }

    let mut usage: Vec<ToolUsage> = by_tool
        .into_iter()
        .map(|(tool, acc)| ToolUsage {
            tool_name: tool.to_string(),
            pre_count: acc.pre,
            post_count: acc.post,
            unique_commands: acc.commands.len(),
            unique_files: acc.files.len(),
        })
        .collect();
    usage.sort_by(|a, b| {
        b.pre_count
            .cmp(&a.pre_count)
            .then_with(|| a.tool_name.cmp(&b.tool_name))
    });
    usage
}

/// Activity totals for one trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowStats {
    pub total_events: usize,
    /// Distinct non-empty tmux labels.
    pub tmux_sessions: usize,
    /// Distinct agent types started.
    pub agent_types: usize,
}

impl WindowStats {
    fn over<'a, E: TraceEvent + 'a>(events: impl Iterator<Item = &'a E>) -> Self {
        let mut total_events = 0;
        let mut labels = BTreeSet::new();
        let mut agents = BTreeSet::new();
        for event in events {
            total_events += 1;
            if let Some(label) = non_empty(event.tmux_session()) {
                labels.insert(label);
            }
            if event.is_task() && event.kind() == Some(EventType::PreToolUse) {
                if let Some(agent) = non_empty(event.subagent_type()) {
                    agents.insert(agent);
                }
            }
        }
        Self {
            total_events,
            tmux_sessions: labels.len(),
            agent_types: agents.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityStats {
    pub last_24h: WindowStats,
    pub last_7d: WindowStats,
}

/// Activity over the last day and the last week, windows inclusive of their start.
pub fn activity_stats<E: TraceEvent>(events: &[E], now: DateTime<Utc>) -> ActivityStats {
    let within = |window: Duration| {
        let cutoff = now - window;
        events.iter().filter(move |e| e.timestamp() >= cutoff)
    };
    ActivityStats {
        last_24h: WindowStats::over(within(Duration::hours(24))),
        last_7d: WindowStats::over(within(Duration::days(7))),
    }
}

/// A session that has not ended and was recently heard from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSession {
    pub session_id: String,
    pub session_start: DateTime<Utc>,
    pub last_event: DateTime<Utc>,
    pub total_events: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmux_session: Option<String>,
    pub seconds_since_last: f64,
    pub duration_seconds: f64,
}

/// Sessions without `SessionEnd` whose last event is under an hour old,
/// most recently active first.
pub fn active_sessions<E: TraceEvent>(
    events: &[E],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ActiveSession> {
    let window = Duration::seconds(ACTIVE_SESSION_SECS);
    let mut active: Vec<ActiveSession> = reconstruct_sessions(events, now)
        .into_iter()
        .filter(|s| !s.has_end_marker && now - s.end < window)
        .map(|s| ActiveSession {
            seconds_since_last: seconds_between(s.end, now),
            session_start: s.start,
            last_event: s.end,
            total_events: s.total_events,
            duration_seconds: s.duration_seconds,
            session_id: s.session_id,
            cwd: s.cwd,
            tmux_session: s.tmux_session,
        })
        .collect();
    active.sort_by(|a, b| {
        b.last_event
            .cmp(&a.last_event)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
    active.truncate(limit);
    active
}

/// A `Read`/`Write`/`Edit`/`MultiEdit` event on a known path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOperation {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub file_path: String,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// File operations, newest first, at most `limit`.
pub fn file_operations<E: TraceEvent>(events: &[E], limit: usize) -> Vec<FileOperation> {
    sorted_by_time(events)
        .into_iter()
        .rev()
        .filter_map(|event| {
            let tool = event.tool_name().filter(|t| FILE_TOOLS.contains(t))?;
            let path = event.field_str(PayloadField::FilePath)?;
            Some(FileOperation {
                timestamp: event.timestamp(),
                tool_name: tool.to_string(),
                file_path: path.to_string(),
                event_type: event.event_type().to_string(),
                session_id: non_empty(event.session_id()).map(String::from),
            })
        })
        .take(limit)
        .collect()
}

/// One event with its well-known payload fields pulled out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subagent_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
}

impl TimelineEntry {
    fn from_event<E: TraceEvent>(event: &E) -> Self {
        let field = |f: PayloadField| non_empty(event.field_str(f)).map(String::from);
        Self {
            timestamp: event.timestamp(),
            event_type: event.event_type().to_string(),
            tool_name: non_empty(event.tool_name()).map(String::from),
            subagent_type: non_empty(event.subagent_type()).map(String::from),
            description: field(PayloadField::Description),
            command: field(PayloadField::Command),
            file_path: field(PayloadField::FilePath),
            pattern: field(PayloadField::Pattern),
            url: field(PayloadField::Url),
            query: field(PayloadField::Query),
            source: field(PayloadField::Source),
            permission_mode: field(PayloadField::PermissionMode),
        }
    }

    /// Most descriptive single detail, for one-line rendering.
    pub fn detail(&self) -> Option<&str> {
        [
            &self.command,
            &self.file_path,
            &self.pattern,
            &self.url,
            &self.query,
            &self.description,
            &self.subagent_type,
            &self.source,
        ]
        .into_iter()
        .find_map(Option::as_deref)
    }
}

/// Timeline of `events` in timestamp order.
pub fn timeline<E: TraceEvent>(events: &[E]) -> Vec<TimelineEntry> {
    sorted_by_time(events)
        .into_iter()
        .map(TimelineEntry::from_event)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{TestEvent, ts};
    use serde_json::json;

    fn bash(seconds: f64, event_type: &str, command: &str) -> TestEvent {
        TestEvent::tool(seconds, event_type, "s", "Bash")
            .with_payload(json!({"tool_input": {"command": command}}))
    }

    fn file_tool(seconds: f64, tool: &str, path: &str) -> TestEvent {
        TestEvent::tool(seconds, "PreToolUse", "s", tool)
            .with_payload(json!({"tool_input": {"file_path": path}}))
    }

    #[test]
    fn test_tool_usage_counts_sides_and_distinct_inputs() {
        let mut anonymous = TestEvent::at(5.0, "PreToolUse", "s");
        anonymous.tool_name = None;
        let events = vec![
            bash(0.0, "PreToolUse", "ls"),
            bash(1.0, "PostToolUse", "ls"),
            bash(2.0, "PreToolUse", "cargo fmt"),
            file_tool(3.0, "Edit", "src/a.rs"),
            file_tool(4.0, "Edit", "src/b.rs"),
            anonymous,
            TestEvent::at(6.0, "Stop", "s"),
        ];

        let usage = summarize_tool_usage(&events);
        let shape: Vec<_> = usage
            .iter()
            .map(|u| (u.tool_name.as_str(), u.pre_count, u.post_count))
            .collect();
        assert_eq!(shape, [("Bash", 2, 1), ("Edit", 2, 0), ("Unknown", 1, 0)]);
        assert_eq!(usage[0].unique_commands, 2);
        assert_eq!(usage[1].unique_files, 2);
    }

    #[test]
    fn test_stats_windows_count_labels_and_agents() {
        let now = ts(8.0 * 86_400.0);
        let events = vec![
            TestEvent::at(0.0, "SessionStart", "old").in_tmux("ancient"),
            TestEvent::at(3.0 * 86_400.0, "SessionStart", "week").in_tmux("w"),
            TestEvent::task(3.0 * 86_400.0, "PreToolUse", "week", "planner"),
            TestEvent::at(7.5 * 86_400.0, "SessionStart", "day").in_tmux("d"),
            TestEvent::at(7.6 * 86_400.0, "Stop", "day").in_tmux(""),
            TestEvent::task(7.7 * 86_400.0, "PreToolUse", "day", "reviewer"),
            TestEvent::task(7.8 * 86_400.0, "PostToolUse", "day", "explorer"),
        ];

        let stats = activity_stats(&events, now);
        assert_eq!(
            stats.last_24h,
            WindowStats {
                total_events: 4,
                tmux_sessions: 1,
                agent_types: 1
            }
        );
        assert_eq!(
            stats.last_7d,
            WindowStats {
                total_events: 6,
                tmux_sessions: 2,
                agent_types: 2
            }
        );
    }

    #[test]
    fn test_active_sessions_exclude_ended_and_stale() {
        let now = ts(10_000.0);
        let events = vec![
            TestEvent::at(9_000.0, "SessionStart", "running").in_tmux("main"),
            TestEvent::at(9_900.0, "Stop", "running"),
            TestEvent::at(9_500.0, "SessionStart", "ended"),
            TestEvent::at(9_600.0, "SessionEnd", "ended"),
            TestEvent::at(1_000.0, "SessionStart", "stale"),
            TestEvent::at(9_950.0, "UserPromptSubmit", "fresh"),
        ];

        let active = active_sessions(&events, now, 10);
        let ids: Vec<_> = active.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, ["fresh", "running"]);
        assert!((active[1].seconds_since_last - 100.0).abs() < f64::EPSILON);
        assert!((active[1].duration_seconds - 900.0).abs() < f64::EPSILON);
        assert_eq!(active[1].tmux_session.as_deref(), Some("main"));

        assert_eq!(active_sessions(&events, now, 1).len(), 1);
    }

    #[test]
    fn test_file_operations_are_newest_first_and_limited() {
        let events = vec![
            file_tool(0.0, "Read", "a.rs"),
            file_tool(1.0, "Write", "b.rs"),
            file_tool(2.0, "Grep", "c.rs"),
            TestEvent::tool(3.0, "PreToolUse", "s", "Edit"),
            file_tool(4.0, "MultiEdit", "d.rs"),
        ];

        let ops = file_operations(&events, 2);
        let paths: Vec<_> = ops.iter().map(|o| o.file_path.as_str()).collect();
        assert_eq!(paths, ["d.rs", "b.rs"]);
        assert_eq!(ops[0].tool_name, "MultiEdit");
        assert_eq!(file_operations(&events, 50).len(), 3);
    }

    #[test]
    fn test_timeline_extracts_known_fields_in_order() {
        let events = vec![
            bash(2.0, "PreToolUse", "cargo test"),
            TestEvent::at(0.0, "SessionStart", "s")
                .with_payload(json!({"source": "resume", "permission_mode": "plan"})),
            TestEvent::task(1.0, "PreToolUse", "s", "explorer"),
        ];

        let entries = timeline(&events);
        assert_eq!(entries[0].source.as_deref(), Some("resume"));
        assert_eq!(entries[0].permission_mode.as_deref(), Some("plan"));
        assert_eq!(entries[1].detail(), Some("explorer"));
        assert_eq!(entries[2].command.as_deref(), Some("cargo test"));
        assert_eq!(entries[2].detail(), Some("cargo test"));
    }
}
