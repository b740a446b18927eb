//! Event store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the durable, queryable table of events keyed by `uuid`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Event::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Every write is atomic per call: it fully succeeds or leaves the
//!   table unchanged.

use crate::db::DbError;
use crate::model::event::{Event, EventId, EventType, EventValidationError};
use crate::time_rules;
use log::debug;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const EVENT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    type,
    start_time,
    end_time
FROM events";

// Effective occupied interval end of a row: assignments (and rows without
// an end) occupy their start point only.
const EFFECTIVE_END_SQL: &str =
    "CASE WHEN type = 'assignment' OR end_time IS NULL THEN start_time \
     ELSE MAX(end_time, start_time) END";

pub type StoreResult<T> = Result<T, StoreError>;

/// Generic store error for event persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    /// Insert with an already-used `uuid`.
    Constraint(EventId),
    /// Update or explicit lookup of a missing `uuid`.
    NotFound(EventId),
    /// Field combination rejected before or after persistence.
    InvalidTimeRange(EventValidationError),
    /// Persisted row content that cannot be interpreted.
    InvalidData(String),
    /// Transport-level database failure.
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constraint(id) => write!(f, "event id already exists: {id}"),
            Self::NotFound(id) => write!(f, "event not found: {id}"),
            Self::InvalidTimeRange(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted event data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Constraint(_) | Self::NotFound(_) | Self::InvalidData(_) => None,
            Self::InvalidTimeRange(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<EventValidationError> for StoreError {
    fn from(value: EventValidationError) -> Self {
        Self::InvalidTimeRange(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable table of events keyed by `uuid`.
///
/// Reads are pure with respect to store state; writes are atomic per call.
pub trait EventStore {
    /// Adds a new row; a duplicate `uuid` fails with `Constraint`.
    fn insert(&self, event: &Event) -> StoreResult<()>;

    /// Replaces the row matching `event.uuid`; missing rows fail with
    /// `NotFound`.
    fn update(&self, event: &Event) -> StoreResult<()>;

    /// Deletes the row matching `id`. Idempotent: deleting an absent row
    /// succeeds and leaves the table unchanged.
    fn remove(&self, id: EventId) -> StoreResult<()>;

    /// Fetches one event by `uuid`.
    fn get(&self, id: EventId) -> StoreResult<Option<Event>>;

    /// Events whose occupied interval intersects `[start_ms, end_ms)`,
    /// ordered by `start_time` ascending. Assignments are matched by
    /// `start_time` alone.
    fn query_range(&self, start_ms: i64, end_ms: i64) -> StoreResult<Vec<Event>>;

    /// `query_range` over the day containing `day_ms`.
    fn query_day(&self, day_ms: i64) -> StoreResult<Vec<Event>> {
        let (start, end) = time_rules::day_bounds(day_ms);
        self.query_range(start, end)
    }

    /// Every event, ordered by `start_time` ascending.
    fn query_all(&self) -> StoreResult<Vec<Event>>;
}

/// SQLite-backed event store owning its connection.
pub struct SqliteEventStore {
    conn: Connection,
}

impl SqliteEventStore {
    /// Wraps a bootstrapped connection (see `db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl EventStore for SqliteEventStore {
    fn insert(&self, event: &Event) -> StoreResult<()> {
        event.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO events (uuid, name, description, type, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                event.uuid.to_string(),
                event.name.as_str(),
                event.description.as_str(),
                event_type_to_db(event.kind),
                event.start_time,
                event.end_time,
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Constraint(event.uuid))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update(&self, event: &Event) -> StoreResult<()> {
        event.validate()?;

        let changed = self.conn.execute(
            "UPDATE events
             SET
                name = ?1,
                description = ?2,
                type = ?3,
                start_time = ?4,
                end_time = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?6;",
            params![
                event.name.as_str(),
                event.description.as_str(),
                event_type_to_db(event.kind),
                event.start_time,
                event.end_time,
                event.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(event.uuid));
        }

        Ok(())
    }

    fn remove(&self, id: EventId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM events WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            debug!("event=event_remove module=store status=noop id={id}");
        }

        Ok(())
    }

    fn get(&self, id: EventId) -> StoreResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_event_row(row)?));
        }

        Ok(None)
    }

    fn query_range(&self, start_ms: i64, end_ms: i64) -> StoreResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE start_time < ?2 AND {EFFECTIVE_END_SQL} >= ?1
             ORDER BY start_time ASC, uuid ASC;"
        ))?;

        let mut rows = stmt.query(params![start_ms, end_ms])?;
        collect_events(&mut rows)
    }

    fn query_all(&self) -> StoreResult<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} ORDER BY start_time ASC, uuid ASC;"))?;

        let mut rows = stmt.query([])?;
        collect_events(&mut rows)
    }
}

fn collect_events(rows: &mut rusqlite::Rows<'_>) -> StoreResult<Vec<Event>> {
    let mut events = Vec::new();
    while let Some(row) = rows.next()? {
        events.push(parse_event_row(row)?);
    }
    Ok(events)
}

fn parse_event_row(row: &Row<'_>) -> StoreResult<Event> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{uuid_text}` in events.uuid"))
    })?;

    let type_text: String = row.get("type")?;
    let kind = parse_event_type(&type_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid event type `{type_text}` in events.type"))
    })?;

    let event = Event {
        uuid,
        name: row.get("name")?,
        description: row.get("description")?,
        kind,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
    };
    event.validate()?;
    Ok(event)
}

fn event_type_to_db(kind: EventType) -> &'static str {
    match kind {
        EventType::TimedEvent => "timed_event",
        EventType::Assignment => "assignment",
    }
}

fn parse_event_type(value: &str) -> Option<EventType> {
    match value {
        "timed_event" => Some(EventType::TimedEvent),
        "assignment" => Some(EventType::Assignment),
        _ => None,
    }
}
