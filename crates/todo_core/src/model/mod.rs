//! Domain model for the ordered collections.
//!
//! # Responsibility
//! - Define the generic `Record` shape shared by every collection.
//! - Define the payloads carried by the priority and todo collections.
//! - Define page request/result value objects.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - Payload types carry no position data; position belongs to `Record`.

pub mod page;
pub mod priority;
pub mod record;
pub mod todo;
