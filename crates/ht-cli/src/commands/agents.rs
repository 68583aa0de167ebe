//! Sub-agent spans, parallel groups and per-agent statistics.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use ht_core::{AgentSpan, EventStore, Tracker};
use serde::Serialize;

use super::rule;
use super::util::{
    format_duration, format_optional_duration, format_optional_time, format_time,
    resolve_session, truncate, write_json,
};

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_ms(ms: i64) -> String {
    format_duration(ms as f64 / 1000.0)
}

#[derive(Serialize)]
struct SpanReport<'a> {
    session_id: &'a str,
    orphans: usize,
    spans: &'a [AgentSpan],
}

/// Lists the sub-agent spans of a session in start order.
pub fn spans<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    session: Option<&str>,
    json: bool,
) -> Result<()> {
    let session_id = resolve_session(tracker, session)?;
    let spans = tracker.session_spans(&session_id)?;
    let orphans = spans.iter().filter(|s| s.is_orphan()).count();
    if json {
        return write_json(
            writer,
            &SpanReport {
                session_id: &session_id,
                orphans,
                spans: &spans,
            },
        );
    }

    writeln!(
        writer,
        "SPANS session {session_id} ({}, {orphans} orphaned)",
        spans.len()
    )?;
    if spans.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<19}  {:>8}  {:>6}  {:<12}  Description",
        "Start", "Duration", "Tokens", "Agent"
    )?;
    writeln!(writer, "{}", rule(&[19, 8, 6, 12, 11]))?;
    for span in &spans {
        let mut description = span.description.clone().unwrap_or_default();
        if span.is_orphan() {
            description.push_str(" [orphan]");
        }
        let line = format!(
            "{:<19}  {:>8}  {:>6}  {:<12}  {}",
            format_optional_time(span.start_time),
            format_optional_duration(span.duration_seconds),
            span.total_tokens.map_or_else(|| "-".to_string(), |t| t.to_string()),
            truncate(&span.agent_type, 12),
            description.trim_start()
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}

/// Groups a session's spans into batches launched together.
pub fn parallel<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    session: Option<&str>,
    json: bool,
) -> Result<()> {
    let session_id = resolve_session(tracker, session)?;
    let groups = tracker.parallel_groups(&session_id)?;
    if json {
        return write_json(writer, &groups);
    }

    let parallel = groups.iter().filter(|g| g.is_parallel).count();
    writeln!(
        writer,
        "PARALLEL GROUPS session {session_id} ({}, {parallel} parallel)",
        plural(groups.len(), "group")
    )?;
    for group in &groups {
        writeln!(writer)?;
        writeln!(
            writer,
            "Group {}  {}  {}  wall {}  agent time {}",
            group.group_id,
            plural(group.size, "agent"),
            if group.is_parallel { "parallel" } else { "sequential" },
            format_optional_duration(group.wall_seconds),
            format_duration(group.member_seconds)
        )?;
        for member in &group.members {
            writeln!(
                writer,
                "  {:<19}  {:<12}  {:>8}",
                format_optional_time(member.start_time),
                truncate(&member.agent_type, 12),
                format_optional_duration(member.duration_seconds)
            )?;
        }
    }
    Ok(())
}

/// Summarizes sub-agent usage by agent type.
pub fn list<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    since: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let usage = tracker.agent_usage(since)?;
    if json {
        return write_json(writer, &usage);
    }
    if usage.is_empty() {
        writeln!(writer, "No sub-agent invocations recorded.")?;
        return Ok(());
    }

    writeln!(writer, "AGENTS ({})", usage.len())?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<12}  {:>4}  {:>8}  Last used",
        "Agent", "Uses", "Sessions"
    )?;
    writeln!(writer, "{}", rule(&[12, 4, 8, 19]))?;
    for agent in &usage {
        writeln!(
            writer,
            "{:<12}  {:>4}  {:>8}  {}",
            truncate(&agent.agent_type, 12),
            agent.usage_count,
            agent.sessions_used,
            format_time(agent.last_used)
        )?;
    }
    Ok(())
}

/// Shows invocation, duration and grouping statistics for one agent type.
pub fn detail<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    agent_type: &str,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let detail = tracker.agent_detail(agent_type, now)?;
    if json {
        return write_json(writer, &detail);
    }

    writeln!(writer, "AGENT {}", detail.agent_type)?;
    writeln!(
        writer,
        "Invocations:  {} in {}",
        detail.total_invocations,
        plural(detail.unique_sessions, "session")
    )?;
    writeln!(writer, "First used:   {}", format_optional_time(detail.first_used))?;
    writeln!(writer, "Last used:    {}", format_optional_time(detail.last_used))?;
    match &detail.durations {
        Some(stats) => writeln!(
            writer,
            "Durations:    avg {}  median {}  p95 {}  min {}  max {} ({})",
            format_ms(stats.avg_ms),
            format_ms(stats.median_ms),
            format_ms(stats.p95_ms),
            format_ms(stats.min_ms),
            format_ms(stats.max_ms),
            plural(stats.samples, "sample")
        )?,
        None => writeln!(writer, "Durations:    -")?,
    }
    writeln!(
        writer,
        "Spans:        {} ({} orphaned) in {}",
        detail.spans.len(),
        detail.orphans,
        plural(detail.parallel_groups.len(), "group")
    )?;
    let sessions: Vec<&str> = detail
        .sessions
        .iter()
        .map(|s| s.session_id.as_str())
        .collect();
    writeln!(writer, "Sessions:     {}", sessions.join(", "))?;

    if detail.recent_invocations.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(writer, "RECENT INVOCATIONS")?;
    for invocation in &detail.recent_invocations {
        let line = format!(
            "{}  {:<12}  {}",
            format_time(invocation.timestamp),
            truncate(invocation.session_id.as_deref().unwrap_or("-"), 12),
            invocation.description.as_deref().unwrap_or("")
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}
