//! Storage layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable event-table contract used by the repository.
//! - Isolate SQLite query details from repository orchestration.
//!
//! # Invariants
//! - Store writes must enforce `Event::validate()` before persistence.
//! - Store APIs return semantic errors (`Constraint`, `NotFound`) in
//!   addition to DB transport errors.
//! - Bulk queries return empty collections instead of erroring on "no
//!   rows found".

pub mod event_store;
