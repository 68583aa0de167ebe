//! End-to-end tests that run the `ht` binary against a seeded event database.

use std::path::Path;
use std::process::{Command, Output};

use chrono::{DateTime, Duration, TimeZone, Utc};
use ht_db::{Database, EventRecord};
use serde_json::{Value, json};
use tempfile::TempDir;

fn ht_binary() -> String {
    env!("CARGO_BIN_EXE_ht").to_string()
}

fn ts(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 14, 0, 0).unwrap() + Duration::seconds(seconds)
}

fn record(seconds: i64, event_type: &str, session: &str, extra: &Value) -> EventRecord {
    let mut data = json!({"session_id": session, "tmux_session": "dev", "cwd": "/work"});
    if let (Some(data), Some(extra)) = (data.as_object_mut(), extra.as_object()) {
        data.extend(extra.clone());
    }
    EventRecord::new(ts(seconds), event_type, &data)
}

/// Writes a two-session log: `alpha` with one prompt/stop cycle and a
/// sub-agent, `beta` with a resumed prompt after a long wait.
fn seed(path: &Path) {
    let task = json!({
        "tool_name": "Task",
        "tool_input": {"subagent_type": "planner", "description": "plan"}
    });
    let none = json!({});
    let mut db = Database::open(path).expect("create database");
    db.insert_events(&[
        record(0, "SessionStart", "alpha", &json!({"source": "startup"})),
        record(1, "UserPromptSubmit", "alpha", &none),
        record(2, "PreToolUse", "alpha", &task),
        record(12, "PostToolUse", "alpha", &task),
        record(20, "Stop", "alpha", &none),
        record(25, "SessionEnd", "alpha", &none),
        record(100, "SessionStart", "beta", &none),
        record(101, "UserPromptSubmit", "beta", &none),
        record(111, "Stop", "beta", &none),
        record(411, "UserPromptSubmit", "beta", &none),
        record(421, "Stop", "beta", &none),
    ])
    .expect("seed events");
}

/// Runs `ht` with configuration isolated to `temp`.
fn ht(temp: &TempDir, database: &Path, args: &[&str]) -> Output {
    Command::new(ht_binary())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .env("HT_DATABASE_PATH", database)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run ht")
}

fn seeded() -> (TempDir, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let database = temp.path().join("events.db");
    seed(&database);
    (temp, database)
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "ht should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_sessions_lists_every_session() {
    let (temp, database) = seeded();
    let output = stdout(&ht(&temp, &database, &["sessions", "--json"]));
    let sessions: Value = serde_json::from_str(&output).unwrap();

    let ids: Vec<&str> = sessions
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["session_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["beta", "alpha"]);
    assert_eq!(sessions[1]["status"], "completed");
    assert_eq!(sessions[1]["start_source"], "startup");
}

#[test]
fn test_work_wait_totals_across_sessions() {
    let (temp, database) = seeded();
    let output = stdout(&ht(&temp, &database, &["work-wait", "--json"]));
    let report: Value = serde_json::from_str(&output).unwrap();

    // alpha works 19s; beta works 10s + 10s and waits 300s.
    assert_eq!(report["working_seconds"], 39.0);
    assert_eq!(report["waiting_seconds"], 300.0);
    assert_eq!(report["waits"]["medium"], 1);
    assert_eq!(report["significant_gaps"][0]["session_id"], "beta");
}

#[test]
fn test_current_session_drives_default_views() {
    let (temp, database) = seeded();
    let output = stdout(&ht(&temp, &database, &["timeline", "--limit", "2"]));
    assert!(output.starts_with("TIMELINE session beta (2 events)"));

    let output = stdout(&ht(&temp, &database, &["spans", "alpha"]));
    assert!(output.contains("planner"), "{output}");
}

#[test]
fn test_gaps_by_tmux_label() {
    let (temp, database) = seeded();
    let output = stdout(&ht(&temp, &database, &["gaps", "--tmux", "dev"]));
    assert!(output.starts_with("GAPS tmux dev (11 intervals)"), "{output}");
    assert!(output.contains("[alpha]"));
    assert!(output.contains("[beta]"));
}

#[test]
fn test_unknown_session_fails() {
    let (temp, database) = seeded();
    let output = ht(&temp, &database, &["session", "nope"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("session not found: nope"), "{stderr}");
}

#[test]
fn test_missing_database_reports_unavailable_store() {
    let temp = TempDir::new().unwrap();
    let output = ht(&temp, &temp.path().join("absent.db"), &["sessions"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("event store unavailable"), "{stderr}");
}

#[test]
fn test_no_subcommand_prints_help() {
    let temp = TempDir::new().unwrap();
    let output = stdout(&ht(&temp, &temp.path().join("events.db"), &[]));
    assert!(output.contains("Usage: ht"), "{output}");
}
