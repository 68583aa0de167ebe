//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

/// Session, idle time and sub-agent analytics for coding-assistant hook logs.
///
/// Reads the event log written by the assistant's hooks and reconstructs
/// sessions, activity gaps, work/wait time and sub-agent invocations.
#[derive(Debug, Parser)]
#[command(name = "ht", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List every session, newest first.
    Sessions {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one session's lifecycle and tool usage.
    Session {
        /// Session id (defaults to the session with the most recent event).
        id: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List tmux sessions, or show one by label.
    Tmux {
        /// Tmux session label.
        label: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify the gaps between consecutive events.
    #[command(group(ArgGroup::new("target").required(true).args(["session", "tmux"])))]
    Gaps {
        /// Session id.
        session: Option<String>,

        /// Classify every session under this tmux label instead.
        #[arg(long)]
        tmux: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Working vs. waiting time from prompt/stop markers.
    WorkWait {
        /// Only consider events at or after this time (ISO 8601 or "2 hours ago").
        #[arg(long)]
        since: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List sub-agent spans of a session.
    Spans {
        /// Session id (defaults to the current session).
        session: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Group a session's sub-agent spans into parallel batches.
    Parallel {
        /// Session id (defaults to the current session).
        session: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Summarize sub-agent usage by agent type.
    Agents {
        /// Only count invocations at or after this time (ISO 8601 or "2 hours ago").
        #[arg(long)]
        since: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show statistics for one agent type.
    Agent {
        /// Agent type (the `subagent_type` of the Task tool).
        agent_type: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Event, tmux and agent counts for the last 24 hours and 7 days.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List sessions that have not ended and were active in the last hour.
    Active {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List recent file reads and edits.
    Files {
        /// Maximum number of operations (defaults to the configured limit).
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a session's events in order.
    Timeline {
        /// Session id (defaults to the current session).
        session: Option<String>,

        /// Maximum number of most recent events (defaults to the configured limit).
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
