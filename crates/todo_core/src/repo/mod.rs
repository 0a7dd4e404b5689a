//! Repository layer: the record store contract and its SQLite adapter.
//!
//! # Responsibility
//! - Define the storage primitives the position index is built on.
//! - Isolate SQLite query details from the ordering engine and facades.
//!
//! # Invariants
//! - Only the position index opens units of work on a store.
//! - Repository APIs return semantic errors (`Conflict`, `InvalidData`) in
//!   addition to DB transport errors.

pub mod priority_repo;
pub mod record_store;
pub mod sqlite_store;
pub mod todo_repo;
