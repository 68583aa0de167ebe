//! Activity windows, file operations and per-session timelines.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use ht_core::{EventStore, Tracker, WindowStats};

use super::rule;
use super::util::{format_time, resolve_session, truncate, write_json};

const DETAIL_WIDTH: usize = 80;

/// Event, tmux and agent counts over the last day and week.
pub fn stats<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let stats = tracker.activity_stats(now)?;
    if json {
        return write_json(writer, &stats);
    }

    writeln!(writer, "ACTIVITY")?;
    writeln!(
        writer,
        "{:<8}  {:>6}  {:>4}  {:>6}",
        "Window", "Events", "Tmux", "Agents"
    )?;
    writeln!(writer, "{}", rule(&[8, 6, 4, 6]))?;
    let windows: [(&str, WindowStats); 2] =
        [("Last 24h", stats.last_24h), ("Last 7d", stats.last_7d)];
    for (label, window) in windows {
        writeln!(
            writer,
            "{:<8}  {:>6}  {:>4}  {:>6}",
            label, window.total_events, window.tmux_sessions, window.agent_types
        )?;
    }
    Ok(())
}

/// Most recent file reads and edits.
pub fn files<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let operations = tracker.file_operations(limit)?;
    if json {
        return write_json(writer, &operations);
    }
    if operations.is_empty() {
        writeln!(writer, "No file operations recorded.")?;
        return Ok(());
    }

    writeln!(writer, "FILE OPERATIONS ({})", operations.len())?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<19}  {:<12}  {:<9}  Path",
        "Time", "Event", "Tool"
    )?;
    writeln!(writer, "{}", rule(&[19, 12, 9, 4]))?;
    for operation in &operations {
        writeln!(
            writer,
            "{:<19}  {:<12}  {:<9}  {}",
            format_time(operation.timestamp),
            operation.event_type,
            operation.tool_name,
            operation.file_path
        )?;
    }
    Ok(())
}

/// A session's most recent events, oldest first.
pub fn timeline<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    session: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let session_id = resolve_session(tracker, session)?;
    let entries = tracker.timeline(&session_id, limit)?;
    if json {
        return write_json(writer, &entries);
    }

    writeln!(
        writer,
        "TIMELINE session {session_id} ({} events)",
        entries.len()
    )?;
    writeln!(writer)?;
    for entry in &entries {
        let line = format!(
            "{:<19}  {:<16}  {:<8}  {}",
            format_time(entry.timestamp),
            entry.event_type,
            entry.tool_name.as_deref().unwrap_or(""),
            truncate(entry.detail().unwrap_or(""), DETAIL_WIDTH)
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{now, render, tracker, ts};
    use insta::assert_snapshot;

    #[test]
    fn test_activity_windows() {
        let tracker = tracker();
        let output = render(|w| stats(w, &tracker, now(), false));
        assert_snapshot!(output, @r"
        ACTIVITY
        Window    Events  Tmux  Agents
        ────────  ──────  ────  ──────
        Last 24h      15     2       2
        Last 7d       15     2       2
        ");
    }

    #[test]
    fn test_activity_window_excludes_old_events() {
        let tracker = tracker();
        // Two days later only the weekly window still sees the log.
        let later = ts(2.0 * 24.0 * 3600.0);
        let output = render(|w| stats(w, &tracker, later, true));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["last_24h"]["total_events"], 0);
        assert_eq!(value["last_7d"]["total_events"], 15);
    }

    #[test]
    fn test_file_operations_newest_first() {
        let tracker = tracker();
        let output = render(|w| files(w, &tracker, 50, false));
        assert_snapshot!(output, @r"
        FILE OPERATIONS (2)

        Time                 Event         Tool       Path
        ───────────────────  ────────────  ─────────  ────
        2025-01-15 09:01:11  PostToolUse   Edit       src/lib.rs
        2025-01-15 09:01:10  PreToolUse    Edit       src/lib.rs
        ");

        let output = render(|w| files(w, &tracker, 1, true));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["event_type"], "PostToolUse");
    }

    #[test]
    fn test_timeline_of_session() {
        let tracker = tracker();
        let output = render(|w| timeline(w, &tracker, Some("s2"), 100, false));
        assert_snapshot!(output, @r"
        TIMELINE session s2 (3 events)

        2025-01-15 09:16:40  SessionStart                startup
        2025-01-15 09:16:43  PreToolUse        Bash      cargo test
        2025-01-15 09:16:50  PostToolUse       Bash      cargo test
        ");
    }

    #[test]
    fn test_timeline_keeps_the_latest_events() {
        let tracker = tracker();
        let output = render(|w| timeline(w, &tracker, Some("s1"), 2, false));
        assert_snapshot!(output, @r"
        TIMELINE session s1 (2 events)

        2025-01-15 09:03:30  Stop
        2025-01-15 09:03:35  SessionEnd
        ");
    }

    #[test]
    fn test_timeline_unknown_session() {
        let tracker = tracker();
        let err = timeline(&mut Vec::new(), &tracker, Some("nope"), 10, false).unwrap_err();
        assert_eq!(err.to_string(), "session not found: nope");
    }
}
