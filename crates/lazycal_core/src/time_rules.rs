//! Pure time-edit arithmetic for calendar events.
//!
//! # Responsibility
//! - Combine picker-style partial edits (date-only / time-of-day-only).
//! - Repair end times so a timed event never ends before it starts.
//! - Derive day boundaries for day-scoped queries.
//!
//! # Invariants
//! - All functions are stateless and total over `i64` epoch milliseconds.
//! - Timestamps are local wall-clock values; day boundaries are midnight
//!   truncations of that wall clock, not timezone conversions.

use chrono::NaiveDate;

/// Milliseconds in one hour.
pub const HOUR_MS: i64 = 60 * 60 * 1000;
/// Milliseconds in one day.
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Builds a wall-clock timestamp from calendar components.
///
/// Returns `None` for dates or times that do not exist on the calendar.
pub fn wall_clock_ms(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let datetime = date.and_hms_opt(hour, minute, 0)?;
    Some(datetime.and_utc().timestamp_millis())
}

/// Midnight at the start of the day containing `ms`.
pub fn midnight_of(ms: i64) -> i64 {
    ms - time_of_day(ms)
}

/// Milliseconds elapsed since midnight of the day containing `ms`.
pub fn time_of_day(ms: i64) -> i64 {
    ms.rem_euclid(DAY_MS)
}

/// Half-open `[midnight, midnight + 24h)` bounds of the day containing `ms`.
pub fn day_bounds(ms: i64) -> (i64, i64) {
    let midnight = midnight_of(ms);
    (midnight, midnight + DAY_MS)
}

/// Calendar date from the first argument, time of day from the second.
///
/// # Contract
/// - Editing only the date preserves the time of day and vice versa; the
///   caller picks argument order depending on which picker fired.
pub fn combine_date_and_time(date_from: i64, time_from: i64) -> i64 {
    midnight_of(date_from) + time_of_day(time_from)
}

/// End time after the start moved from `old_start` to `new_start`.
///
/// The end shifts by the same delta, preserving the event duration.
pub fn derive_new_end_time(old_start: i64, new_start: i64, old_end: i64) -> i64 {
    old_end + (new_start - old_start)
}

/// Repairs a proposed end time so it never precedes `start`.
///
/// Takes the proposal's time of day on the start's date; when that instant
/// is earlier than `start`, rolls it to the next day at the same time of
/// day.
///
/// # Contract
/// - `fix_end_time(start, proposed) >= start` for all inputs.
pub fn fix_end_time(start: i64, proposed_end: i64) -> i64 {
    let candidate = combine_date_and_time(start, proposed_end);
    if candidate < start {
        candidate + DAY_MS
    } else {
        candidate
    }
}

/// Default end for a freshly created timed event: start + 1 hour.
pub fn default_end_time(start: i64) -> i64 {
    start + HOUR_MS
}

/// End to use when an event becomes timed again.
///
/// Keeps the stored end when it is still valid, otherwise falls back to
/// `default_end_time`.
pub fn retimed_end(start: i64, stored_end: Option<i64>) -> i64 {
    match stored_end {
        Some(end) if end >= start => end,
        _ => default_end_time(start),
    }
}
