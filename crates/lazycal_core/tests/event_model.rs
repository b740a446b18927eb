use lazycal_core::time_rules::{self, HOUR_MS};
use lazycal_core::{
    Event, EventType, EventValidationError, DEFAULT_ASSIGNMENT_NAME, DEFAULT_EVENT_NAME,
};
use uuid::Uuid;

fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
    time_rules::wall_clock_ms(year, month, day, hour, minute).expect("valid wall-clock input")
}

#[test]
fn new_timed_event_defaults_to_one_hour_duration() {
    let start = ts(2024, 3, 15, 9, 0);
    let event = Event::new_timed(start);

    assert!(!event.uuid.is_nil());
    assert_eq!(event.name, DEFAULT_EVENT_NAME);
    assert_eq!(event.description, "");
    assert_eq!(event.kind, EventType::TimedEvent);
    assert_eq!(event.start_time, start);
    assert_eq!(event.end_time, Some(start + HOUR_MS));
    assert!(event.validate().is_ok());
}

#[test]
fn new_assignment_has_no_end_time() {
    let start = ts(2024, 3, 15, 23, 59);
    let event = Event::new_assignment(start);

    assert_eq!(event.name, DEFAULT_ASSIGNMENT_NAME);
    assert_eq!(event.kind, EventType::Assignment);
    assert_eq!(event.end_time, None);
    assert_eq!(event.display_end(), None);
    assert!(event.validate().is_ok());
}

#[test]
fn assignment_stored_end_is_never_displayed() {
    let start = ts(2024, 3, 15, 10, 0);
    let mut event = Event::new_assignment(start);
    event.end_time = Some(start + HOUR_MS);

    assert_eq!(event.display_end(), None);
    assert_eq!(event.occupied_range(), (start, start));
    assert!(event.validate().is_ok());
}

#[test]
fn with_id_rejects_nil_uuid() {
    let err = Event::with_id(Uuid::nil(), EventType::Assignment, 0, None).unwrap_err();
    assert_eq!(err, EventValidationError::NilUuid);
}

#[test]
fn validate_rejects_timed_event_without_end() {
    let mut event = Event::new_timed(ts(2024, 1, 1, 9, 0));
    event.end_time = None;

    let err = event.validate().unwrap_err();
    assert_eq!(err, EventValidationError::MissingEndTime);
}

#[test]
fn validate_rejects_reversed_time_window() {
    let start = ts(2024, 1, 1, 9, 0);
    let mut event = Event::new_timed(start);
    event.end_time = Some(start - 1);

    let err = event.validate().unwrap_err();
    assert_eq!(
        err,
        EventValidationError::EndBeforeStart {
            start,
            end: start - 1,
        }
    );
}

#[test]
fn reschedule_start_preserves_duration() {
    let start = ts(2024, 1, 1, 9, 0);
    let mut event = Event::new_timed(start);
    event.propose_end(ts(2024, 1, 1, 11, 30));

    let new_start = ts(2024, 2, 20, 14, 0);
    event.reschedule_start(new_start);

    assert_eq!(event.start_time, new_start);
    assert_eq!(event.end_time, Some(new_start + 2 * HOUR_MS + HOUR_MS / 2));
}

#[test]
fn set_start_date_keeps_time_of_day() {
    let mut event = Event::new_timed(ts(2024, 1, 1, 9, 15));
    event.set_start_date(ts(2024, 6, 30, 0, 0));

    assert_eq!(event.start_time, ts(2024, 6, 30, 9, 15));
}

#[test]
fn set_start_time_of_day_keeps_date() {
    let mut event = Event::new_assignment(ts(2024, 1, 1, 9, 15));
    event.set_start_time_of_day(ts(1999, 12, 31, 16, 45));

    assert_eq!(event.start_time, ts(2024, 1, 1, 16, 45));
}

#[test]
fn propose_end_repairs_earlier_time_of_day() {
    let mut event = Event::new_timed(ts(2024, 1, 1, 9, 0));
    event.propose_end(ts(2024, 1, 1, 8, 0));

    assert_eq!(event.end_time, Some(ts(2024, 1, 2, 8, 0)));
    assert!(event.validate().is_ok());
}

#[test]
fn propose_end_is_a_noop_for_assignments() {
    let mut event = Event::new_assignment(ts(2024, 1, 1, 9, 0));
    event.propose_end(ts(2024, 1, 1, 8, 0));

    assert_eq!(event.end_time, None);
}

#[test]
fn switching_kind_keeps_stored_end_and_rederives_when_stale() {
    let start = ts(2024, 1, 1, 9, 0);
    let mut event = Event::new_timed(start);
    let original_end = event.end_time;

    event.change_kind(EventType::Assignment);
    assert_eq!(event.end_time, original_end);
    assert_eq!(event.display_end(), None);

    event.change_kind(EventType::TimedEvent);
    assert_eq!(event.end_time, original_end);

    // A start moved past the stored end while it was an assignment forces
    // the one-hour fallback on the way back.
    event.change_kind(EventType::Assignment);
    event.start_time = ts(2024, 1, 1, 12, 0);
    event.change_kind(EventType::TimedEvent);
    assert_eq!(event.end_time, Some(ts(2024, 1, 1, 13, 0)));
    assert!(event.validate().is_ok());
}

#[test]
fn timed_end_never_precedes_start_across_edit_sequences() {
    let mut event = Event::new_timed(ts(2024, 5, 10, 18, 0));

    event.propose_end(ts(2024, 5, 10, 2, 0));
    event.set_start_time_of_day(ts(2024, 5, 10, 23, 30));
    event.set_start_date(ts(2023, 11, 2, 0, 0));
    event.reschedule_start(ts(2030, 8, 1, 6, 45));
    event.propose_end(ts(2030, 8, 1, 6, 0));

    let (start, end) = event.occupied_range();
    assert!(end >= start);
    assert!(event.validate().is_ok());
}

#[test]
fn serialization_uses_expected_wire_fields() {
    let event_id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
    let mut event = Event::with_id(
        event_id,
        EventType::TimedEvent,
        1_700_000_000_000,
        Some(1_700_000_360_000),
    )
    .unwrap();
    event.name = "csci lecture".to_string();
    event.description = "bring the worksheet".to_string();

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["uuid"], event_id.to_string());
    assert_eq!(json["type"], "timed_event");
    assert_eq!(json["name"], "csci lecture");
    assert_eq!(json["start_time"], 1_700_000_000_000_i64);
    assert_eq!(json["end_time"], 1_700_000_360_000_i64);

    let decoded: Event = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, event);
}

#[test]
fn deserialize_rejects_reversed_time_window() {
    let value = serde_json::json!({
        "uuid": "11111111-2222-4333-8444-555555555555",
        "name": "bad event",
        "description": "",
        "type": "timed_event",
        "start_time": 200,
        "end_time": 100
    });

    let err = serde_json::from_value::<Event>(value).unwrap_err();
    assert!(
        err.to_string()
            .contains("end_time (100) must be >= start_time (200)"),
        "unexpected error: {err}"
    );
}
