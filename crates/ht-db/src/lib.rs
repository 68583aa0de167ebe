//! SQLite event store for hook trace analytics.
//!
//! Hook events live in a single append-only table:
//!
//! ```sql
//! all_events(id INTEGER PRIMARY KEY, timestamp TEXT, event_type TEXT, data TEXT)
//! ```
//!
//! `data` is the raw hook payload as JSON. Session ids, tmux labels, tool names
//! and sub-agent types are not columns; they are read from the payload with
//! SQLite's `json_extract` when filtering and with the typed getters of
//! [`ht_core::payload`] once a row is loaded.
//!
//! # Timestamps
//!
//! Timestamps are stored as TEXT. Both RFC 3339 (`2025-01-15T09:00:00.250Z`)
//! and SQLite's own `2025-01-15 09:00:00.250` (taken as UTC) are accepted.
//! Ordering and `since` comparisons go through `julianday()`, so mixed formats
//! still sort chronologically. Rows whose timestamp cannot be parsed are
//! skipped with a warning.
//!
//! # Thread Safety
//!
//! [`SqliteEventStore`] holds only a path and opens a read-only connection per
//! query, so it is `Send + Sync` and can back a shared
//! [`Tracker`](ht_core::Tracker). [`Database`] wraps a `rusqlite::Connection`,
//! which is `Send` but not `Sync`; it is the write side used to create the
//! schema and seed events.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use ht_core::payload::{self, PayloadField};
use ht_core::{EventFilter, EventStore, SortOrder, StoreError, TraceEvent};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params, params_from_iter};
use serde_json::Value;
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Database connection wrapper for schema setup and seeding.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A raw event ready to be stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub timestamp: String,
    pub event_type: String,
    pub data: String,
}

impl EventRecord {
    pub fn new(timestamp: DateTime<Utc>, event_type: &str, data: &Value) -> Self {
        Self {
            timestamp: format_timestamp(timestamp),
            event_type: event_type.to_string(),
            data: data.to_string(),
        }
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- timestamp: RFC 3339 or 'YYYY-MM-DD HH:MM:SS[.fff]' (UTC)
            -- event_type: hook event name (e.g. 'PreToolUse')
            -- data: raw hook payload as JSON
            CREATE TABLE IF NOT EXISTS all_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_all_events_timestamp ON all_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_all_events_type ON all_events(event_type);
            ",
        )?;
        Ok(())
    }

    /// Appends a batch of events in one transaction.
    pub fn insert_events(&mut self, events: &[EventRecord]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO all_events (timestamp, event_type, data) VALUES (?, ?, ?)",
            )?;
            for event in events {
                inserted += stmt.execute(params![event.timestamp, event.event_type, event.data])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, "appended events");
        Ok(inserted)
    }
}

impl EventStore for Database {
    type Event = StoredEvent;

    fn query(&self, filter: &EventFilter) -> Result<Vec<StoredEvent>, StoreError> {
        query_events(&self.conn, filter).map_err(|e| StoreError::Query(Box::new(e)))
    }
}

/// Read-only store over a database file.
///
/// Every query opens its own connection and closes it on return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteEventStore {
    path: PathBuf,
}

impl SqliteEventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Unavailable {
            location: self.path.display().to_string(),
            source: Box::new(e),
        })
    }
}

impl EventStore for SqliteEventStore {
    type Event = StoredEvent;

    fn query(&self, filter: &EventFilter) -> Result<Vec<StoredEvent>, StoreError> {
        let conn = self.connect()?;
        query_events(&conn, filter).map_err(|e| StoreError::Query(Box::new(e)))
    }
}

/// One row of `all_events` with the commonly used payload fields lifted out.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub data: Value,
    pub session_id: Option<String>,
    pub tmux_session: Option<String>,
    pub tool_name: Option<String>,
    pub subagent_type: Option<String>,
}

impl StoredEvent {
    fn from_row(id: i64, timestamp: DateTime<Utc>, event_type: String, data: Value) -> Self {
        let field = |f: PayloadField| payload::get_str(&data, f).map(String::from);
        Self {
            id,
            timestamp,
            event_type,
            session_id: field(PayloadField::SessionId),
            tmux_session: field(PayloadField::TmuxSession),
            tool_name: field(PayloadField::ToolName),
            subagent_type: field(PayloadField::SubagentType),
            data,
        }
    }
}

impl TraceEvent for StoredEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn tmux_session(&self) -> Option<&str> {
        self.tmux_session.as_deref()
    }

    fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    fn subagent_type(&self) -> Option<&str> {
        self.subagent_type.as_deref()
    }

    fn payload(&self) -> &Value {
        &self.data
    }
}

/// `data` if it is well-formed JSON, else NULL. `json_extract` raises on
/// malformed input.
const VALID_DATA: &str = "CASE WHEN json_valid(data) THEN data END";

/// Translates a filter into SQL and its positional parameters.
fn build_query(filter: &EventFilter) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if let Some(session_id) = &filter.session_id {
        clauses.push(format!("json_extract({}, '$.session_id') = ?", VALID_DATA));
        params.push(SqlValue::Text(session_id.clone()));
    }
    if let Some(label) = &filter.tmux_session {
        clauses.push(format!("json_extract({}, '$.tmux_session') = ?", VALID_DATA));
        params.push(SqlValue::Text(label.clone()));
    }
    if let Some(types) = &filter.event_types {
        if types.is_empty() {
            clauses.push("0".to_string());
        } else {
            let placeholders = vec!["?"; types.len()].join(", ");
            clauses.push(format!("event_type IN ({placeholders})"));
            params.extend(types.iter().map(|t| SqlValue::Text(t.as_str().to_string())));
        }
    }
    if filter.with_session_only {
        clauses.push(format!(
            "COALESCE(json_extract({}, '$.session_id'), '') != ''",
            VALID_DATA
        ));
    }
    if let Some(since) = filter.since {
        clauses.push("julianday(timestamp) >= julianday(?)".to_string());
        params.push(SqlValue::Text(format_timestamp(since)));
    }

    let mut sql = String::from("SELECT id, timestamp, event_type, data FROM all_events");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(match filter.order {
        SortOrder::Ascending => " ORDER BY julianday(timestamp) ASC, id ASC",
        SortOrder::Descending => " ORDER BY julianday(timestamp) DESC, id DESC",
    });
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        params.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    }
    (sql, params)
}

fn query_events(conn: &Connection, filter: &EventFilter) -> Result<Vec<StoredEvent>, DbError> {
    let (sql, params) = build_query(filter);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut events = Vec::new();
    let mut skipped = 0;
    for row in rows {
        let (id, timestamp, event_type, data) = row?;
        let Some(parsed) = parse_timestamp(&timestamp) else {
            tracing::warn!(id, %timestamp, "skipping event with unparseable timestamp");
            skipped += 1;
            continue;
        };
        events.push(StoredEvent::from_row(
            id,
            parsed,
            event_type,
            parse_event_data(data.as_deref(), id),
        ));
    }
    tracing::debug!(loaded = events.len(), skipped, "queried all_events");
    Ok(events)
}

fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(timestamp, format).ok())
        .map(|naive| naive.and_utc())
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_event_data(data: Option<&str>, id: i64) -> Value {
    let Some(data) = data else {
        return Value::Null;
    };
    serde_json::from_str(data).unwrap_or_else(|err| {
        tracing::debug!(id, %err, "event data is not valid JSON");
        Value::Null
    })
}
