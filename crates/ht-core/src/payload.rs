//! Typed access to the schemaless hook payload.
//!
//! The payload is arbitrary JSON. Rather than reflecting over it, callers ask
//! for one of a fixed list of [`PayloadField`]s and get an optional scalar back.
//! Absent fields and JSON `null` resolve to `None`. A field that is present but
//! has the wrong shape (e.g. a token count written as `"lots"`) also resolves to
//! `None`; that is logged at debug level and never fails the query.

use serde_json::Value;

/// Well-known payload locations written by the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadField {
    SessionId,
    TmuxSession,
    ToolName,
    Source,
    Cwd,
    PermissionMode,
    SubagentType,
    Description,
    Command,
    FilePath,
    Pattern,
    Url,
    Query,
    TotalTokens,
    TotalDurationMs,
}

impl PayloadField {
    /// JSON object path of the field, outermost key first.
    pub const fn path(self) -> &'static [&'static str] {
        match self {
            Self::SessionId => &["session_id"],
            Self::TmuxSession => &["tmux_session"],
            Self::ToolName => &["tool_name"],
            Self::Source => &["source"],
            Self::Cwd => &["cwd"],
            Self::PermissionMode => &["permission_mode"],
            Self::SubagentType => &["tool_input", "subagent_type"],
            Self::Description => &["tool_input", "description"],
            Self::Command => &["tool_input", "command"],
            Self::FilePath => &["tool_input", "file_path"],
            Self::Pattern => &["tool_input", "pattern"],
            Self::Url => &["tool_input", "url"],
            Self::Query => &["tool_input", "query"],
            Self::TotalTokens => &["tool_response", "totalTokens"],
            Self::TotalDurationMs => &["tool_response", "totalDurationMs"],
        }
    }
}

fn lookup(payload: &Value, field: PayloadField) -> Option<&Value> {
    let mut current = payload;
    for key in field.path() {
        current = current.get(key)?;
    }
    (!current.is_null()).then_some(current)
}

/// Reads a string field.
pub fn get_str(payload: &Value, field: PayloadField) -> Option<&str> {
    let value = lookup(payload, field)?;
    let s = value.as_str();
    if s.is_none() {
        tracing::debug!(?field, %value, "malformed payload field, expected string");
    }
    s
}

/// Reads an integer field. Accepts JSON integers, floats (rounded) and numeric strings.
#[allow(clippy::cast_possible_truncation)]
pub fn get_i64(payload: &Value, field: PayloadField) -> Option<i64> {
    let value = lookup(payload, field)?;
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().or_else(|| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
        }),
        _ => None,
    };
    if parsed.is_none() {
        tracing::debug!(?field, %value, "malformed payload field, expected integer");
    }
    parsed
}

/// Reads a numeric field as `f64`. Accepts JSON numbers and numeric strings.
pub fn get_f64(payload: &Value, field: PayloadField) -> Option<f64> {
    let value = lookup(payload, field)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite());
    if parsed.is_none() {
        tracing::debug!(?field, %value, "malformed payload field, expected number");
    }
    parsed
}
