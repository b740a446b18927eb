//! Calendar repository: the single entry point for reads and writes.
//!
//! # Responsibility
//! - Own the event store on a dedicated writer thread.
//! - Serialize add/update/remove through one FIFO command queue.
//! - Re-evaluate every live subscription after each applied write
//!   (conservative invalidation: re-run the query, no diffing).
//!
//! # Invariants
//! - A later write always observes an earlier write's effect.
//! - Write failures surface on the issuing receipt and in the log; they
//!   are never retried and never poison the queue.
//! - The repository is an explicit handle passed by reference to its
//!   consumers; there is no process-global instance.

use crate::db::open_db;
use crate::model::event::{Event, EventId};
use crate::repo::subscription::EventSubscription;
use crate::store::event_store::{EventStore, SqliteEventStore, StoreError, StoreResult};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use tokio::sync::{mpsc, oneshot};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository-level error taxonomy.
#[derive(Debug)]
pub enum RepoError {
    /// The handle is used while its writer is not running (never started
    /// or already closed).
    NotInitialized,
    /// Underlying storage failure, passed through unmodified.
    Store(StoreError),
    /// The writer thread could not be spawned.
    Spawn(std::io::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => {
                write!(f, "calendar repository writer is not running")
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::Spawn(err) => write!(f, "failed to spawn writer thread: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotInitialized => None,
            Self::Store(err) => Some(err),
            Self::Spawn(err) => Some(err),
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Logical query a subscription is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventQuery {
    /// Single event by stable ID; snapshots hold zero or one entries.
    ById(EventId),
    /// Events intersecting the day containing `day_ms`.
    OnDay(i64),
    /// Events intersecting the half-open `[start, end)` range.
    Between { start: i64, end: i64 },
    /// Every stored event.
    All,
}

impl EventQuery {
    pub(crate) fn evaluate<S: EventStore>(&self, store: &S) -> StoreResult<Vec<Event>> {
        match self {
            Self::ById(id) => Ok(store.get(*id)?.into_iter().collect()),
            Self::OnDay(day_ms) => store.query_day(*day_ms),
            Self::Between { start, end } => store.query_range(*start, *end),
            Self::All => store.query_all(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::ById(_) => "by_id",
            Self::OnDay(_) => "on_day",
            Self::Between { .. } => "between",
            Self::All => "all",
        }
    }
}

/// Mutation applied by the writer, in queue order.
#[derive(Debug)]
pub(crate) enum WriteOp {
    Add(Event),
    Update(Event),
    Remove(EventId),
}

impl WriteOp {
    fn label(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Update(_) => "update",
            Self::Remove(_) => "remove",
        }
    }

    fn target_id(&self) -> EventId {
        match self {
            Self::Add(event) | Self::Update(event) => event.uuid,
            Self::Remove(id) => *id,
        }
    }

    fn apply<S: EventStore>(&self, store: &S) -> StoreResult<()> {
        match self {
            Self::Add(event) => store.insert(event),
            Self::Update(event) => store.update(event),
            Self::Remove(id) => store.remove(*id),
        }
    }
}

pub(crate) enum Command {
    Write {
        op: WriteOp,
        done: oneshot::Sender<RepoResult<()>>,
    },
    Subscribe {
        id: u64,
        query: EventQuery,
        deliveries: mpsc::UnboundedSender<Vec<Event>>,
    },
    Detach {
        id: u64,
    },
    Shutdown,
}

/// Completion handle for one queued write.
///
/// Awaiting `completed` yields the write outcome; dropping the receipt is
/// the fire-and-forget path (failures are still logged by the writer).
#[derive(Debug)]
pub struct WriteReceipt {
    outcome: ReceiptOutcome,
}

#[derive(Debug)]
enum ReceiptOutcome {
    Rejected,
    Pending(oneshot::Receiver<RepoResult<()>>),
}

impl WriteReceipt {
    fn rejected() -> Self {
        Self {
            outcome: ReceiptOutcome::Rejected,
        }
    }

    fn pending(done: oneshot::Receiver<RepoResult<()>>) -> Self {
        Self {
            outcome: ReceiptOutcome::Pending(done),
        }
    }

    /// Waits for the writer to apply (or reject) this write.
    pub async fn completed(self) -> RepoResult<()> {
        match self.outcome {
            ReceiptOutcome::Rejected => Err(RepoError::NotInitialized),
            ReceiptOutcome::Pending(done) => {
                done.await.unwrap_or(Err(RepoError::NotInitialized))
            }
        }
    }
}

/// Single authoritative access point over the event store.
///
/// Construct one handle at startup and pass it by reference to every
/// consumer. All writes funnel through the handle's writer thread; reads
/// are exposed as push-based subscriptions populated asynchronously.
pub struct CalendarRepository {
    commands: mpsc::UnboundedSender<Command>,
    writer: thread::JoinHandle<()>,
    next_subscription_id: AtomicU64,
}

impl CalendarRepository {
    /// Opens (or creates) the calendar database at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let conn = open_db(path).map_err(|err| RepoError::Store(StoreError::Db(err)))?;
        Self::with_store(SqliteEventStore::new(conn))
    }

    /// Opens an in-memory calendar database. State lives and dies with the
    /// returned handle.
    pub fn open_in_memory() -> RepoResult<Self> {
        let conn = crate::db::open_db_in_memory()
            .map_err(|err| RepoError::Store(StoreError::Db(err)))?;
        Self::with_store(SqliteEventStore::new(conn))
    }

    /// Moves any event store onto a fresh writer thread.
    pub fn with_store<S>(store: S) -> RepoResult<Self>
    where
        S: EventStore + Send + 'static,
    {
        let (commands, queue) = mpsc::unbounded_channel();
        let writer = thread::Builder::new()
            .name("lazycal-writer".to_string())
            .spawn(move || run_writer(store, queue))
            .map_err(RepoError::Spawn)?;

        Ok(Self {
            commands,
            writer,
            next_subscription_id: AtomicU64::new(1),
        })
    }

    /// Queues an insert of `event`.
    pub fn add(&self, event: Event) -> WriteReceipt {
        self.submit(WriteOp::Add(event))
    }

    /// Queues a full-row update of `event`.
    pub fn update(&self, event: Event) -> WriteReceipt {
        self.submit(WriteOp::Update(event))
    }

    /// Queues a physical delete of the event with `id`. Idempotent.
    pub fn remove(&self, id: EventId) -> WriteReceipt {
        self.submit(WriteOp::Remove(id))
    }

    fn submit(&self, op: WriteOp) -> WriteReceipt {
        let (done, receipt) = oneshot::channel();
        match self.commands.send(Command::Write { op, done }) {
            Ok(()) => WriteReceipt::pending(receipt),
            Err(_) => WriteReceipt::rejected(),
        }
    }

    /// Registers a live subscription for `query`.
    ///
    /// The subscription is populated asynchronously with an initial
    /// snapshot, then redelivered after every applied write.
    pub fn subscribe(&self, query: EventQuery) -> EventSubscription {
        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let (deliveries, snapshots) = mpsc::unbounded_channel();
        let attached = self
            .commands
            .send(Command::Subscribe {
                id,
                query: query.clone(),
                deliveries,
            })
            .is_ok();

        if !attached {
            debug!("event=subscription_rejected module=repo status=error id={id}");
        }

        EventSubscription::new(id, query, snapshots, self.commands.downgrade())
    }

    /// Drains queued commands, stops the writer and waits for it to exit.
    pub fn close(self) {
        let CalendarRepository {
            commands, writer, ..
        } = self;

        let _ = commands.send(Command::Shutdown);
        drop(commands);
        if writer.join().is_err() {
            error!("event=repo_close module=repo status=error detail=writer_panicked");
            return;
        }
        info!("event=repo_close module=repo status=ok");
    }
}

struct Subscriber {
    id: u64,
    query: EventQuery,
    deliveries: mpsc::UnboundedSender<Vec<Event>>,
}

fn run_writer<S: EventStore>(store: S, mut queue: mpsc::UnboundedReceiver<Command>) {
    let mut subscribers: Vec<Subscriber> = Vec::new();
    debug!("event=writer_started module=repo status=ok");

    while let Some(command) = queue.blocking_recv() {
        match command {
            Command::Write { op, done } => {
                let result = op.apply(&store);
                match &result {
                    Ok(()) => info!(
                        "event=write_applied module=repo status=ok op={} id={}",
                        op.label(),
                        op.target_id()
                    ),
                    Err(err) => error!(
                        "event=write_failed module=repo status=error op={} id={} error={}",
                        op.label(),
                        op.target_id(),
                        err
                    ),
                }

                let applied = result.is_ok();
                let _ = done.send(result.map_err(RepoError::Store));

                if applied {
                    redeliver(&store, &mut subscribers);
                }
            }
            Command::Subscribe {
                id,
                query,
                deliveries,
            } => {
                let subscriber = Subscriber {
                    id,
                    query,
                    deliveries,
                };
                if deliver(&store, &subscriber) {
                    debug!(
                        "event=subscription_added module=repo status=ok id={} query={}",
                        id,
                        subscriber.query.label()
                    );
                    subscribers.push(subscriber);
                }
            }
            Command::Detach { id } => {
                subscribers.retain(|subscriber| subscriber.id != id);
                debug!("event=subscription_detached module=repo status=ok id={id}");
            }
            Command::Shutdown => break,
        }
    }

    debug!("event=writer_stopped module=repo status=ok");
}

fn redeliver<S: EventStore>(store: &S, subscribers: &mut Vec<Subscriber>) {
    subscribers.retain(|subscriber| deliver(store, subscriber));
}

/// Evaluates the subscriber's query and pushes a fresh snapshot.
///
/// Returns `false` when the subscriber went away (receiver dropped) so the
/// caller can prune it. Evaluation failures keep the subscriber alive; the
/// last good snapshot stands.
fn deliver<S: EventStore>(store: &S, subscriber: &Subscriber) -> bool {
    match subscriber.query.evaluate(store) {
        Ok(snapshot) => subscriber.deliveries.send(snapshot).is_ok(),
        Err(err) => {
            error!(
                "event=subscription_eval module=repo status=error id={} query={} error={}",
                subscriber.id,
                subscriber.query.label(),
                err
            );
            !subscriber.deliveries.is_closed()
        }
    }
}
