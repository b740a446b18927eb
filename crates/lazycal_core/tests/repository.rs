use lazycal_core::time_rules;
use lazycal_core::{
    CalendarRepository, Event, EventQuery, RepoError, StoreError, SubscriptionState,
};
use std::sync::Arc;
use uuid::Uuid;

fn repo() -> CalendarRepository {
    CalendarRepository::open_in_memory().expect("in-memory repository should open")
}

fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
    time_rules::wall_clock_ms(year, month, day, hour, minute).expect("valid wall-clock input")
}

#[tokio::test]
async fn subscription_is_populated_then_redelivered_after_writes() {
    let repo = repo();
    let mut all = repo.subscribe(EventQuery::All);
    assert_eq!(all.state(), SubscriptionState::Unpopulated);

    let initial = all.next().await.expect("initial snapshot");
    assert!(initial.is_empty());
    assert_eq!(all.state(), SubscriptionState::Populated);

    let mut event = Event::new_timed(ts(2024, 1, 1, 9, 0));
    event.name = "lecture".to_string();
    repo.add(event.clone()).completed().await.unwrap();

    let after_add = all.next().await.expect("snapshot after add");
    assert_eq!(after_add, vec![event.clone()]);
    assert_eq!(all.latest(), Some(&after_add[..]));

    event.name = "lecture (moved)".to_string();
    repo.update(event.clone()).completed().await.unwrap();

    let after_update = all.next().await.expect("snapshot after update");
    assert_eq!(after_update[0].name, "lecture (moved)");
}

#[tokio::test]
async fn queued_update_observes_the_add_before_it() {
    let repo = repo();

    let mut event = Event::new_timed(ts(2024, 1, 1, 9, 0));
    event.name = "first".to_string();
    let add_receipt = repo.add(event.clone());

    event.name = "second".to_string();
    let update_receipt = repo.update(event.clone());

    // Neither receipt was awaited before queueing the other; FIFO order
    // still guarantees the update sees the inserted row.
    add_receipt.completed().await.unwrap();
    update_receipt.completed().await.unwrap();

    let mut by_id = repo.subscribe(EventQuery::ById(event.uuid));
    let snapshot = by_id.next().await.expect("snapshot");
    assert_eq!(snapshot[0].name, "second");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interleaved_callers_are_serialized() {
    let repo = Arc::new(repo());
    let event = Event::new_timed(ts(2024, 1, 1, 9, 0));

    let (added_tx, added_rx) = tokio::sync::oneshot::channel();

    let adder = {
        let repo = Arc::clone(&repo);
        let event = event.clone();
        tokio::spawn(async move {
            repo.add(event).completed().await.unwrap();
            added_tx.send(()).unwrap();
        })
    };

    let updater = {
        let repo = Arc::clone(&repo);
        let mut event = event.clone();
        tokio::spawn(async move {
            added_rx.await.unwrap();
            event.name = "updated".to_string();
            repo.update(event).completed().await.unwrap();
        })
    };

    adder.await.unwrap();
    updater.await.unwrap();

    let mut by_id = repo.subscribe(EventQuery::ById(event.uuid));
    let snapshot = by_id.next().await.expect("snapshot");
    assert_eq!(snapshot[0].name, "updated");
}

#[tokio::test]
async fn failed_write_is_reported_and_does_not_poison_the_queue() {
    let repo = repo();
    let mut all = repo.subscribe(EventQuery::All);
    assert!(all.next().await.expect("initial snapshot").is_empty());

    let ghost = Event::new_timed(ts(2024, 1, 1, 9, 0));
    let err = repo.update(ghost.clone()).completed().await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::Store(StoreError::NotFound(id)) if id == ghost.uuid
    ));

    let survivor = Event::new_assignment(ts(2024, 1, 1, 12, 0));
    repo.add(survivor.clone()).completed().await.unwrap();

    // The failed update produced no snapshot; the next delivery is the
    // post-add result set.
    let snapshot = all.next().await.expect("snapshot after add");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].uuid, survivor.uuid);
}

#[tokio::test]
async fn removing_a_missing_event_is_not_fatal() {
    let repo = repo();

    let keeper = Event::new_timed(ts(2024, 1, 1, 9, 0));
    repo.add(keeper.clone()).completed().await.unwrap();

    repo.remove(Uuid::new_v4()).completed().await.unwrap();
    repo.remove(keeper.uuid).completed().await.unwrap();
    repo.remove(keeper.uuid).completed().await.unwrap();

    let mut all = repo.subscribe(EventQuery::All);
    assert!(all.next().await.expect("snapshot").is_empty());
}

#[tokio::test]
async fn day_subscription_tracks_relevant_writes() {
    let repo = repo();
    let mut monday = repo.subscribe(EventQuery::OnDay(ts(2024, 1, 1, 0, 0)));
    assert!(monday.next().await.expect("initial snapshot").is_empty());

    let on_day = Event::new_assignment(ts(2024, 1, 1, 10, 0));
    repo.add(on_day.clone()).completed().await.unwrap();
    let snapshot = monday.next().await.expect("snapshot after add");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].display_end(), None);

    // Conservative invalidation re-runs the query after unrelated writes;
    // the result set stays the same.
    let elsewhere = Event::new_timed(ts(2024, 3, 9, 10, 0));
    repo.add(elsewhere).completed().await.unwrap();
    let unchanged = monday.next().await.expect("snapshot after unrelated add");
    assert_eq!(unchanged.len(), 1);
    assert_eq!(unchanged[0].uuid, on_day.uuid);
}

#[tokio::test]
async fn by_id_subscription_sees_creation_and_deletion() {
    let repo = repo();
    let event = Event::new_timed(ts(2024, 1, 1, 9, 0));

    let mut by_id = repo.subscribe(EventQuery::ById(event.uuid));
    assert!(by_id.next().await.expect("initial snapshot").is_empty());

    repo.add(event.clone()).completed().await.unwrap();
    assert_eq!(by_id.next().await.expect("after add"), vec![event.clone()]);

    repo.remove(event.uuid).completed().await.unwrap();
    assert!(by_id.next().await.expect("after remove").is_empty());
}

#[tokio::test]
async fn detach_is_terminal_and_safe_to_repeat() {
    let repo = repo();
    let mut all = repo.subscribe(EventQuery::All);
    assert!(all.next().await.expect("initial snapshot").is_empty());

    all.detach();
    all.detach();
    assert_eq!(all.state(), SubscriptionState::Detached);
    assert!(all.is_detached());

    repo.add(Event::new_timed(ts(2024, 1, 1, 9, 0)))
        .completed()
        .await
        .unwrap();
    assert_eq!(all.next().await, None);
}

#[tokio::test]
async fn close_drains_queued_writes() {
    let repo = repo();
    let event = Event::new_timed(ts(2024, 1, 1, 9, 0));
    let receipt = repo.add(event);

    repo.close();
    receipt.completed().await.unwrap();
}

#[tokio::test]
async fn dropping_the_handle_stops_delivery() {
    let repo = repo();
    let mut all = repo.subscribe(EventQuery::All);
    assert!(all.next().await.expect("initial snapshot").is_empty());

    drop(repo);
    assert_eq!(all.next().await, None);
}
