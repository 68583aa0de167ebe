//! CLI subcommand implementations.
//!
//! Every command renders into a `Write` so output can be snapshot-tested.

pub mod activity;
pub mod agents;
pub mod gaps;
pub mod sessions;
pub mod util;
pub mod work_wait;

/// Separator row for a table whose columns have the given widths.
fn rule(widths: &[usize]) -> String {
    widths
        .iter()
        .map(|w| "─".repeat(*w))
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A small seeded hook log shared by the command tests.

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use ht_core::Tracker;
    use ht_db::{Database, EventRecord};
    use serde_json::{Value, json};

    /// Base instant plus `seconds`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn ts(seconds: f64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
            + Duration::milliseconds((seconds * 1000.0).round() as i64)
    }

    /// "Now" for every command test: 90 seconds after the last event.
    pub fn now() -> DateTime<Utc> {
        ts(1100.0)
    }

    fn event(seconds: f64, event_type: &str, session: &str, extra: &Value) -> EventRecord {
        let (tmux, cwd) = if session == "s1" {
            ("main", "/repo")
        } else {
            ("side", "/other")
        };
        let mut data = json!({"session_id": session, "tmux_session": tmux, "cwd": cwd});
        if let (Some(data), Some(extra)) = (data.as_object_mut(), extra.as_object()) {
            data.extend(extra.clone());
        }
        EventRecord::new(ts(seconds), event_type, &data)
    }

    fn task(agent: &str, description: &str) -> Value {
        json!({
            "tool_name": "Task",
            "tool_input": {"subagent_type": agent, "description": description}
        })
    }

    fn task_done(agent: &str, description: &str, duration_ms: i64, tokens: i64) -> Value {
        json!({
            "tool_name": "Task",
            "tool_input": {"subagent_type": agent, "description": description},
            "tool_response": {"totalDurationMs": duration_ms, "totalTokens": tokens}
        })
    }

    pub fn seeded_database() -> Database {
        let edit = json!({"tool_name": "Edit", "tool_input": {"file_path": "src/lib.rs"}});
        let bash = json!({"tool_name": "Bash", "tool_input": {"command": "cargo test"}});
        let none = json!({});

        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.insert_events(&[
            event(0.0, "SessionStart", "s1", &json!({"source": "startup"})),
            event(2.0, "UserPromptSubmit", "s1", &none),
            event(5.0, "PreToolUse", "s1", &task("reviewer", "review diff")),
            event(5.5, "PreToolUse", "s1", &task("explorer", "find callers")),
            event(35.0, "PostToolUse", "s1", &task_done("explorer", "find callers", 29_500, 1200)),
            event(65.0, "PostToolUse", "s1", &task_done("reviewer", "review diff", 60_000, 3400)),
            event(70.0, "PreToolUse", "s1", &edit),
            event(71.0, "PostToolUse", "s1", &edit),
            event(80.0, "Stop", "s1", &none),
            event(200.0, "UserPromptSubmit", "s1", &none),
            event(210.0, "Stop", "s1", &none),
            event(215.0, "SessionEnd", "s1", &none),
            event(1000.0, "SessionStart", "s2", &json!({"source": "startup"})),
            event(1003.0, "PreToolUse", "s2", &bash),
            event(1010.0, "PostToolUse", "s2", &bash),
        ])
        .expect("seed events");
        db
    }

    pub fn tracker() -> Tracker<Database> {
        Tracker::new(seeded_database())
    }

    /// Runs a rendering closure against a buffer and returns the text.
    pub fn render(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut output = Vec::new();
        f(&mut output).expect("command succeeds");
        String::from_utf8(output).expect("utf-8 output")
    }
}
