//! Core domain logic for LazyCal.
//! This crate is the single source of truth for calendar invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;
pub mod time_rules;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::event::{
    Event, EventId, EventType, EventValidationError, DEFAULT_ASSIGNMENT_NAME, DEFAULT_EVENT_NAME,
};
pub use repo::calendar_repo::{
    CalendarRepository, EventQuery, RepoError, RepoResult, WriteReceipt,
};
pub use repo::subscription::{EventSubscription, SubscriptionState};
pub use store::event_store::{EventStore, SqliteEventStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
