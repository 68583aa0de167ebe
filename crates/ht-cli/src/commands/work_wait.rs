//! Working vs. waiting time from prompt/stop markers.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use ht_core::{EventStore, SignificantGap, Tracker, WorkWaitReport};
use serde::Serialize;

use super::rule;
use super::util::{format_duration, format_time, truncate, write_json};

#[derive(Serialize)]
struct Report {
    #[serde(flatten)]
    work_wait: WorkWaitReport,
    significant_gaps: Vec<SignificantGap>,
}

/// Writes the work/wait split and every significant gap since `since`.
pub fn run<W: Write, S: EventStore>(
    writer: &mut W,
    tracker: &Tracker<S>,
    since: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let work_wait = tracker.work_wait(since)?;
    let significant_gaps = tracker.significant_gaps(since)?;
    if json {
        return write_json(
            writer,
            &Report {
                work_wait,
                significant_gaps,
            },
        );
    }

    let count = work_wait.sessions.len();
    let noun = if count == 1 { "session" } else { "sessions" };
    writeln!(writer, "WORK/WAIT ({count} {noun})")?;
    writeln!(writer, "Working:  {}", format_duration(work_wait.working_seconds))?;
    writeln!(writer, "Waiting:  {}", format_duration(work_wait.waiting_seconds))?;
    writeln!(writer, "Active:   {:.1}%", work_wait.active_percentage)?;
    writeln!(
        writer,
        "Waits:    {} short, {} medium, {} long",
        work_wait.waits.short, work_wait.waits.medium, work_wait.waits.long
    )?;
    writeln!(writer)?;

    writeln!(
        writer,
        "{:<12}  {:>8}  {:>8}  {:>6}  {:>5}",
        "Session", "Working", "Waiting", "Active", "Turns"
    )?;
    writeln!(writer, "{}", rule(&[12, 8, 8, 6, 5]))?;
    for session in &work_wait.sessions {
        writeln!(
            writer,
            "{:<12}  {:>8}  {:>8}  {:>6}  {:>5}",
            truncate(&session.session_id, 12),
            format_duration(session.working_seconds),
            format_duration(session.waiting_seconds),
            format!("{:.1}%", session.active_percentage),
            session.turns
        )?;
    }

    writeln!(writer)?;
    if significant_gaps.is_empty() {
        writeln!(writer, "No gaps over 1m.")?;
        return Ok(());
    }
    writeln!(writer, "SIGNIFICANT GAPS ({})", significant_gaps.len())?;
    for gap in &significant_gaps {
        writeln!(
            writer,
            "{}  {:>8}  {} -> {}  {}",
            format_time(gap.start),
            format_duration(gap.gap_seconds),
            describe(&gap.before_event_type, gap.before_tool.as_deref()),
            describe(&gap.after_event_type, gap.after_tool.as_deref()),
            gap.session_id
        )?;
    }
    Ok(())
}

fn describe(event_type: &str, tool: Option<&str>) -> String {
    tool.map_or_else(|| event_type.to_string(), |tool| format!("{event_type}({tool})"))
}
