//! Event domain model.
//!
//! # Responsibility
//! - Define the persisted calendar entity and its construction defaults.
//! - Apply time-edit rules when a start, end or type field changes.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another event.
//! - For `EventType::TimedEvent`, `end_time` is present and `>= start_time`.
//! - For `EventType::Assignment`, a stored `end_time` is retained but never
//!   surfaced on the read path (`display_end` returns `None`).

use crate::time_rules;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a persisted calendar event.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type EventId = Uuid;

/// Default name given to a freshly created timed event.
pub const DEFAULT_EVENT_NAME: &str = "New Event";
/// Default name given to a freshly created assignment.
pub const DEFAULT_ASSIGNMENT_NAME: &str = "New Assignment";

/// Category of a calendar event.
///
/// The category governs whether `end_time` is authoritative: a timed event
/// occupies `[start_time, end_time]`, an assignment only marks a due point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Event with a start and an end on the same wall clock.
    TimedEvent,
    /// All-day style item with a due time and no meaningful end.
    Assignment,
}

/// Validation failures for event field combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventValidationError {
    /// The nil UUID is reserved and never a valid identity.
    NilUuid,
    /// A timed event was given no end time.
    MissingEndTime,
    /// A timed event would end before it starts.
    EndBeforeStart { start: i64, end: i64 },
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "event uuid cannot be nil"),
            Self::MissingEndTime => write!(f, "timed event requires an end_time"),
            Self::EndBeforeStart { start, end } => {
                write!(f, "end_time ({end}) must be >= start_time ({start})")
            }
        }
    }
}

impl Error for EventValidationError {}

/// Canonical persisted calendar entity.
///
/// Timestamps are epoch milliseconds on the local wall clock. Day queries
/// derive their boundaries by truncation (`time_rules::day_bounds`); there
/// is no separately stored day field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord")]
pub struct Event {
    /// Stable global ID assigned at creation, immutable afterwards.
    pub uuid: EventId,
    /// Display name; starts as a type-specific placeholder.
    pub name: String,
    /// Free-form description body.
    pub description: String,
    /// Serialized as `type` to match the external schema naming.
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Event start in epoch milliseconds.
    pub start_time: i64,
    /// Event end in epoch milliseconds. Authoritative only for timed events.
    pub end_time: Option<i64>,
}

/// Raw wire/storage shape, validated before it becomes an [`Event`].
#[derive(Deserialize)]
struct EventRecord {
    uuid: EventId,
    name: String,
    description: String,
    #[serde(rename = "type")]
    kind: EventType,
    start_time: i64,
    end_time: Option<i64>,
}

impl TryFrom<EventRecord> for Event {
    type Error = EventValidationError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let event = Event {
            uuid: record.uuid,
            name: record.name,
            description: record.description,
            kind: record.kind,
            start_time: record.start_time,
            end_time: record.end_time,
        };
        event.validate()?;
        Ok(event)
    }
}

impl Event {
    /// Creates a new timed event starting at `start_ms`.
    ///
    /// # Contract
    /// - `end_time` defaults to one hour after the start.
    /// - Name defaults to [`DEFAULT_EVENT_NAME`].
    pub fn new_timed(start_ms: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: DEFAULT_EVENT_NAME.to_string(),
            description: String::new(),
            kind: EventType::TimedEvent,
            start_time: start_ms,
            end_time: Some(time_rules::default_end_time(start_ms)),
        }
    }

    /// Creates a new assignment due at `start_ms`, with no end time.
    pub fn new_assignment(start_ms: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: DEFAULT_ASSIGNMENT_NAME.to_string(),
            description: String::new(),
            kind: EventType::Assignment,
            start_time: start_ms,
            end_time: None,
        }
    }

    /// Creates an event with caller-provided identity.
    ///
    /// Used by import paths where identity already exists externally.
    /// Rejects the nil UUID; field combinations are checked by `validate`.
    pub fn with_id(
        uuid: EventId,
        kind: EventType,
        start_ms: i64,
        end_ms: Option<i64>,
    ) -> Result<Self, EventValidationError> {
        if uuid.is_nil() {
            return Err(EventValidationError::NilUuid);
        }
        let event = Self {
            uuid,
            name: match kind {
                EventType::TimedEvent => DEFAULT_EVENT_NAME.to_string(),
                EventType::Assignment => DEFAULT_ASSIGNMENT_NAME.to_string(),
            },
            description: String::new(),
            kind,
            start_time: start_ms,
            end_time: end_ms,
        };
        event.validate()?;
        Ok(event)
    }

    /// Checks stored field combinations.
    ///
    /// # Contract
    /// - Nil UUIDs are rejected.
    /// - Timed events require `end_time >= start_time`.
    /// - Assignments carry no end-time constraint; a stored value is legal.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.uuid.is_nil() {
            return Err(EventValidationError::NilUuid);
        }
        if self.kind == EventType::TimedEvent {
            match self.end_time {
                None => return Err(EventValidationError::MissingEndTime),
                Some(end) if end < self.start_time => {
                    return Err(EventValidationError::EndBeforeStart {
                        start: self.start_time,
                        end,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// End time as the read path may show it.
    ///
    /// Assignments have no displayable end even when a value is stored.
    pub fn display_end(&self) -> Option<i64> {
        match self.kind {
            EventType::TimedEvent => self.end_time,
            EventType::Assignment => None,
        }
    }

    /// Closed interval `[start, effective_end]` this event occupies.
    ///
    /// Assignments occupy the due point only; they match range queries on
    /// `start_time` alone.
    pub fn occupied_range(&self) -> (i64, i64) {
        let end = match self.kind {
            EventType::TimedEvent => self
                .end_time
                .map_or(self.start_time, |end| end.max(self.start_time)),
            EventType::Assignment => self.start_time,
        };
        (self.start_time, end)
    }

    /// Moves the start, shifting a timed end by the same delta.
    ///
    /// # Contract
    /// - The event duration is preserved; the end never stays fixed while
    ///   the start moves past it.
    pub fn reschedule_start(&mut self, new_start_ms: i64) {
        let old_start = self.start_time;
        self.start_time = new_start_ms;
        if self.kind == EventType::TimedEvent {
            if let Some(end) = self.end_time {
                self.end_time = Some(time_rules::derive_new_end_time(
                    old_start,
                    new_start_ms,
                    end,
                ));
            }
        }
    }

    /// Applies a date-picker edit: new calendar date, same time of day.
    pub fn set_start_date(&mut self, date_from_ms: i64) {
        let new_start = time_rules::combine_date_and_time(date_from_ms, self.start_time);
        self.reschedule_start(new_start);
    }

    /// Applies a time-picker edit: same calendar date, new time of day.
    pub fn set_start_time_of_day(&mut self, time_from_ms: i64) {
        let new_start = time_rules::combine_date_and_time(self.start_time, time_from_ms);
        self.reschedule_start(new_start);
    }

    /// Applies an end-time-picker edit, repaired so the end never precedes
    /// the start (`time_rules::fix_end_time`). No-op for assignments.
    pub fn propose_end(&mut self, proposed_ms: i64) {
        if self.kind == EventType::TimedEvent {
            self.end_time = Some(time_rules::fix_end_time(self.start_time, proposed_ms));
        }
    }

    /// Switches the event category.
    ///
    /// # Contract
    /// - Switching to `Assignment` keeps the stored end value; it is only
    ///   suppressed from display.
    /// - Switching to `TimedEvent` re-derives a sane end: the stored value
    ///   when still valid, otherwise start + 1 hour.
    pub fn change_kind(&mut self, kind: EventType) {
        if self.kind == kind {
            return;
        }
        self.kind = kind;
        if kind == EventType::TimedEvent {
            self.end_time = Some(time_rules::retimed_end(self.start_time, self.end_time));
        }
    }
}
