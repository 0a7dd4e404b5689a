//! Core domain logic for the priority/todo backend.
//! This crate owns the ordering invariant: every collection keeps its
//! `position` values a dense `0..N-1` permutation.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{CoreConfig, RetryPolicy};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::page::{Page, PageRequest, SortDirection, SortField, DEFAULT_PAGE_SIZE};
pub use model::priority::{Priority, PriorityRecord};
pub use model::record::{Position, Record, RecordId};
pub use model::todo::{NewTodo, Todo, TodoChanges, TodoRecord, TodoStatus};
pub use repo::priority_repo::{PriorityTable, SqlitePriorityStore};
pub use repo::record_store::{RecordStore, StoreError, StoreResult, StoreUnit};
pub use repo::sqlite_store::{SqliteCollection, SqliteRecordStore};
pub use repo::todo_repo::{SqliteTodoStore, TodoTable};
pub use service::position_index::{IndexError, IndexResult, PositionIndex};
pub use service::priority_service::PriorityService;
pub use service::todo_service::TodoService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
