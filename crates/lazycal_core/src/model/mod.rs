//! Calendar domain model.
//!
//! # Responsibility
//! - Define the canonical `Event` record used by core business logic.
//! - Keep one storage shape for both timed events and assignments.
//!
//! # Invariants
//! - Every event is identified by a stable, never-reused `EventId`.
//! - A timed event never ends before it starts.
//! - Deletion is physical and immediate; there are no tombstones.

pub mod event;
