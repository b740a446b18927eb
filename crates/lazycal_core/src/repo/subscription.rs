//! Push-based query subscription primitive.
//!
//! # Responsibility
//! - Hold the live result of one logical query against the repository.
//! - Deliver snapshots FIFO by completion of the underlying evaluation,
//!   never reordered, dropped or coalesced.
//!
//! # Invariants
//! - State transitions: Unpopulated -> Populated -> ... -> Detached.
//! - Detached is terminal: no further delivery, safe to detach again.
//! - Detaching does not cancel writes already queued on the writer.

use crate::model::event::Event;
use crate::repo::calendar_repo::{Command, EventQuery};
use tokio::sync::mpsc;

/// Delivery state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// No snapshot delivered yet.
    Unpopulated,
    /// At least one snapshot delivered; `latest()` holds the newest.
    Populated,
    /// Unsubscribed; no snapshot will ever arrive again.
    Detached,
}

/// Live handle to one query's result set.
///
/// Snapshots arrive through `next`; the repository pushes a fresh one
/// after every applied write that went through its queue (conservative
/// invalidation, so unrelated writes also redeliver). Dropping the
/// subscription detaches it implicitly.
pub struct EventSubscription {
    id: u64,
    query: EventQuery,
    snapshots: mpsc::UnboundedReceiver<Vec<Event>>,
    commands: mpsc::WeakUnboundedSender<Command>,
    latest: Option<Vec<Event>>,
    detached: bool,
}

impl EventSubscription {
    pub(crate) fn new(
        id: u64,
        query: EventQuery,
        snapshots: mpsc::UnboundedReceiver<Vec<Event>>,
        commands: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            id,
            query,
            snapshots,
            commands,
            latest: None,
            detached: false,
        }
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the subscription is detached or the repository
    /// writer has stopped. Snapshots already queued before a detach are
    /// discarded, never delivered late.
    pub async fn next(&mut self) -> Option<Vec<Event>> {
        if self.detached {
            return None;
        }
        match self.snapshots.recv().await {
            Some(snapshot) => {
                self.latest = Some(snapshot.clone());
                Some(snapshot)
            }
            None => None,
        }
    }

    /// Last delivered snapshot, `None` while unpopulated.
    pub fn latest(&self) -> Option<&[Event]> {
        self.latest.as_deref()
    }

    /// Query this subscription is bound to.
    pub fn query(&self) -> &EventQuery {
        &self.query
    }

    pub fn state(&self) -> SubscriptionState {
        if self.detached {
            SubscriptionState::Detached
        } else if self.latest.is_some() {
            SubscriptionState::Populated
        } else {
            SubscriptionState::Unpopulated
        }
    }

    pub fn is_populated(&self) -> bool {
        self.latest.is_some()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Unsubscribes. Terminal and idempotent: calling it again is a no-op,
    /// and no snapshot is delivered afterwards.
    pub fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;
        self.snapshots.close();
        if let Some(commands) = self.commands.upgrade() {
            let _ = commands.send(Command::Detach { id: self.id });
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.detach();
    }
}
