//! Session, tmux-session and active-session listings.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use ht_core::{EventStore, Session, ToolUsage, Tracker};
use serde::Serialize;

use super::rule;
use super::util::{format_duration, format_time, resolve_session, truncate, write_json};

/// Lists every session, newest start first.
pub fn list<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let sessions = tracker.sessions(now)?;
    if json {
        return write_json(writer, &sessions);
    }

    if sessions.is_empty() {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    }

    writeln!(writer, "SESSIONS ({})", sessions.len())?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<9}  {:<19}  {:>8}  {:>6}  {:<10}  Session",
        "Status", "Start", "Duration", "Events", "Tmux"
    )?;
    writeln!(writer, "{}", rule(&[9, 19, 8, 6, 10, 7]))?;
    for session in &sessions {
        writeln!(
            writer,
            "{:<9}  {:<19}  {:>8}  {:>6}  {:<10}  {}",
            session.status.as_str(),
            format_time(session.start),
            format_duration(session.duration_seconds),
            session.total_events,
            truncate(session.tmux_session.as_deref().unwrap_or("-"), 10),
            session.session_id
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct SessionReport {
    session: Session,
    tools: Vec<ToolUsage>,
}

/// Shows one session's lifecycle and per-tool counts.
pub fn show<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    id: Option<&str>,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let session_id = resolve_session(tracker, id)?;
    let session = tracker.session(&session_id, now)?;
    let tools = tracker.tool_usage(&session_id)?;
    if json {
        return write_json(writer, &SessionReport { session, tools });
    }

    writeln!(writer, "SESSION {}", session.session_id)?;
    writeln!(writer, "Status:    {}", session.status)?;
    writeln!(writer, "Start:     {}", format_time(session.start))?;
    writeln!(writer, "End:       {}", format_time(session.end))?;
    writeln!(writer, "Duration:  {}", format_duration(session.duration_seconds))?;
    writeln!(
        writer,
        "Events:    {} ({} start, {} end)",
        session.total_events, session.start_events, session.end_events
    )?;
    if let Some(source) = &session.start_source {
        writeln!(writer, "Source:    {source}")?;
    }
    if let Some(cwd) = &session.cwd {
        writeln!(writer, "Cwd:       {cwd}")?;
    }
    if let Some(label) = &session.tmux_session {
        writeln!(writer, "Tmux:      {label}")?;
    }

    writeln!(writer)?;
    if tools.is_empty() {
        writeln!(writer, "No tool use recorded.")?;
        return Ok(());
    }
    writeln!(writer, "TOOLS")?;
    writeln!(
        writer,
        "{:<10}  {:>3}  {:>4}  {:>8}  {:>5}",
        "Tool", "Pre", "Post", "Commands", "Files"
    )?;
    writeln!(writer, "{}", rule(&[10, 3, 4, 8, 5]))?;
    for tool in &tools {
        writeln!(
            writer,
            "{:<10}  {:>3}  {:>4}  {:>8}  {:>5}",
            truncate(&tool.tool_name, 10),
            tool.pre_count,
            tool.post_count,
            tool.unique_commands,
            tool.unique_files
        )?;
    }
    Ok(())
}

/// Lists tmux sessions, or details one label.
pub fn tmux<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    label: Option<&str>,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    if let Some(label) = label {
        let tmux = tracker.tmux_session(label, now)?;
        if json {
            return write_json(writer, &tmux);
        }
        writeln!(writer, "TMUX {}", tmux.tmux_session)?;
        writeln!(writer, "Status:    {}", tmux.status)?;
        writeln!(writer, "First:     {}", format_time(tmux.first_activity))?;
        writeln!(writer, "Last:      {}", format_time(tmux.last_activity))?;
        writeln!(
            writer,
            "Duration:  {}",
            format_duration(tmux.total_duration_seconds)
        )?;
        writeln!(writer, "Events:    {}", tmux.total_events)?;
        writeln!(writer, "Sessions:  {}", tmux.session_ids.join(", "))?;
        return Ok(());
    }

    let all = tracker.tmux_sessions(now)?;
    if json {
        return write_json(writer, &all);
    }
    if all.is_empty() {
        writeln!(writer, "No tmux sessions recorded.")?;
        return Ok(());
    }

    writeln!(writer, "TMUX SESSIONS ({})", all.len())?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<8}  {:<19}  {:>8}  {:>8}  Label",
        "Status", "Last activity", "Sessions", "Duration"
    )?;
    writeln!(writer, "{}", rule(&[8, 19, 8, 8, 5]))?;
    for tmux in &all {
        writeln!(
            writer,
            "{:<8}  {:<19}  {:>8}  {:>8}  {}",
            tmux.status.as_str(),
            format_time(tmux.last_activity),
            tmux.session_ids.len(),
            format_duration(tmux.total_duration_seconds),
            tmux.tmux_session
        )?;
    }
    Ok(())
}

/// Lists sessions that have not ended and were heard from in the last hour.
pub fn active<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    now: DateTime<Utc>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let sessions = tracker.active_sessions(now, limit)?;
    if json {
        return write_json(writer, &sessions);
    }
    if sessions.is_empty() {
        writeln!(writer, "No active sessions in the last hour.")?;
        return Ok(());
    }

    writeln!(writer, "ACTIVE SESSIONS ({})", sessions.len())?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<19}  {:>8}  {:>8}  {:>6}  {:<10}  Session",
        "Last event", "Idle", "Duration", "Events", "Tmux"
    )?;
    writeln!(writer, "{}", rule(&[19, 8, 8, 6, 10, 7]))?;
    for session in &sessions {
        writeln!(
            writer,
            "{:<19}  {:>8}  {:>8}  {:>6}  {:<10}  {}",
            format_time(session.last_event),
            format_duration(session.seconds_since_last),
            format_duration(session.duration_seconds),
            session.total_events,
            truncate(session.tmux_session.as_deref().unwrap_or("-"), 10),
            session.session_id
        )?;
    }
    Ok(())
}
