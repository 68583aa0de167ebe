//! Inter-event gap classification for a session or tmux label.

use std::io::Write;

use anyhow::Result;
use ht_core::{EventStore, GapSummary, Interval, Tracker};
use serde::Serialize;

use super::rule;
use super::util::{format_duration, format_optional_duration, format_time, write_json};

/// What to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapTarget<'a> {
    Session(&'a str),
    Tmux(&'a str),
}

#[derive(Serialize)]
struct GapReport<'a> {
    summary: GapSummary,
    intervals: &'a [Interval],
}

/// Writes every interval of the target with its activity state.
pub fn run<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    target: GapTarget<'_>,
    json: bool,
) -> Result<()> {
    let intervals = match target {
        GapTarget::Session(id) => tracker.session_gaps(id)?,
        GapTarget::Tmux(label) => tracker.tmux_gaps(label)?,
    };
    let summary = GapSummary::from_intervals(&intervals);
    if json {
        return write_json(
            writer,
            &GapReport {
                summary,
                intervals: &intervals,
            },
        );
    }

    let (kind, name) = match target {
        GapTarget::Session(id) => ("session", id),
        GapTarget::Tmux(label) => ("tmux", label),
    };
    writeln!(writer, "GAPS {kind} {name} ({} intervals)", intervals.len())?;
    writeln!(
        writer,
        "active {} ({})  idle {} ({})  waiting {} ({})",
        summary.active_count,
        format_duration(summary.active_seconds),
        summary.idle_count,
        format_duration(summary.idle_seconds),
        summary.waiting_count,
        format_duration(summary.waiting_seconds)
    )?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<19}  {:<11}  {:>6}  {:<16}  Tool",
        "Time", "State", "Gap", "Event"
    )?;
    writeln!(writer, "{}", rule(&[19, 11, 6, 16, 4]))?;

    let mut current_session = None;
    for interval in &intervals {
        if matches!(target, GapTarget::Tmux(_))
            && current_session != Some(interval.session_id.as_str())
        {
            writeln!(writer, "[{}]", interval.session_id)?;
            current_session = Some(interval.session_id.as_str());
        }
        let line = format!(
            "{:<19}  {:<11}  {:>6}  {:<16}  {}",
            format_time(interval.timestamp),
            interval.state.as_str(),
            format_optional_duration(interval.gap_seconds),
            interval.event_type,
            interval.tool_name.as_deref().unwrap_or("")
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}
