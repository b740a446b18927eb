//! Repository layer: serialized writes and live query subscriptions.
//!
//! # Responsibility
//! - Provide the single authoritative access point over the event store.
//! - Funnel all mutations through one FIFO writer so concurrent edits
//!   never interleave at the storage layer.
//! - Fan out query re-evaluations to live subscriptions after each
//!   applied write.
//!
//! # Invariants
//! - At most one write is in flight against the store at any time.
//! - A failed write is reported and logged but never blocks, reorders,
//!   or corrupts subsequently queued writes.
//! - A query evaluation never observes a partially applied write.

pub mod calendar_repo;
pub mod subscription;
