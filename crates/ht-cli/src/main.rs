use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser};
use ht_core::Tracker;
use ht_db::SqliteEventStore;
use tracing_subscriber::EnvFilter;

use ht_cli::commands::gaps::GapTarget;
use ht_cli::commands::{activity, agents, gaps, sessions, util, work_wait};
use ht_cli::{Cli, Commands, Config};

/// Load config and point a tracker at the configured event database.
fn open_tracker(config_path: Option<&Path>) -> Result<(Tracker<SqliteEventStore>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let store = SqliteEventStore::new(config.database_path.clone());
    Ok((Tracker::new(store), config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let (tracker, config) = open_tracker(cli.config.as_deref())?;
    let now = Utc::now();
    let mut stdout = std::io::stdout().lock();
    let out = &mut stdout;

    match command {
        Commands::Sessions { json } => sessions::list(out, &tracker, now, *json)?,
        Commands::Session { id, json } => {
            sessions::show(out, &tracker, id.as_deref(), now, *json)?;
        }
        Commands::Tmux { label, json } => {
            sessions::tmux(out, &tracker, label.as_deref(), now, *json)?;
        }
        Commands::Gaps {
            session,
            tmux,
            json,
        } => {
            let target = match (session, tmux) {
                (_, Some(label)) => GapTarget::Tmux(label),
                (Some(id), None) => GapTarget::Session(id),
                (None, None) => anyhow::bail!("either a session id or --tmux is required"),
            };
            gaps::run(out, &tracker, target, *json)?;
        }
        Commands::WorkWait { since, json } => {
            let since = util::parse_since(since.as_deref(), now)?;
            work_wait::run(out, &tracker, since, *json)?;
        }
        Commands::Spans { session, json } => {
            agents::spans(out, &tracker, session.as_deref(), *json)?;
        }
        Commands::Parallel { session, json } => {
            agents::parallel(out, &tracker, session.as_deref(), *json)?;
        }
        Commands::Agents { since, json } => {
            let since = util::parse_since(since.as_deref(), now)?;
            agents::list(out, &tracker, since, *json)?;
        }
        Commands::Agent { agent_type, json } => {
            agents::detail(out, &tracker, agent_type, now, *json)?;
        }
        Commands::Stats { json } => activity::stats(out, &tracker, now, *json)?,
        Commands::Active { json } => {
            sessions::active(out, &tracker, now, config.active_sessions_limit, *json)?;
        }
        Commands::Files { limit, json } => {
            let limit = limit.unwrap_or(config.file_operations_limit);
            activity::files(out, &tracker, limit, *json)?;
        }
        Commands::Timeline {
            session,
            limit,
            json,
        } => {
            let limit = limit.unwrap_or(config.timeline_limit);
            activity::timeline(out, &tracker, session.as_deref(), limit, *json)?;
        }
    }

    out.flush()?;
    Ok(())
}
