//! Record store contract consumed by the position index.
//!
//! # Responsibility
//! - Describe the storage primitives the ordering engine needs, independent
//!   of the backing database.
//! - Group multi-record changes into one unit of work that commits or rolls
//!   back as a whole.
//!
//! # Invariants
//! - A write unit excludes every other write unit on the same collection
//!   until it commits or is dropped.
//! - Dropping a unit without `commit` discards all of its changes.
//! - Inside a unit, positions may transiently leave `0..N-1`; the engine is
//!   responsible for restoring the dense permutation before `commit`.

use crate::db::DbError;
use crate::model::page::{Page, PageRequest};
use crate::model::record::{Position, Record, RecordId};
use rusqlite::ErrorCode;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeFrom;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by record store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Position uniqueness race or lock contention; the unit may be retried.
    Conflict(String),
    /// Requested page sort field is not declared sortable by the collection.
    UnsupportedSortField(String),
    /// Page number or size cannot address a row range.
    InvalidPageRequest(String),
    /// Persisted data cannot be converted to a valid record, or the stored
    /// permutation is broken.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Conflict(detail) => write!(f, "position conflict: {detail}"),
            Self::UnsupportedSortField(field) => write!(f, "unsupported sort field `{field}`"),
            Self::InvalidPageRequest(reason) => write!(f, "invalid page request: {reason}"),
            Self::InvalidData(message) => write!(f, "invalid stored record data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "record store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "record store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            let unique_violation =
                failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE;
            let contended = matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            );
            if unique_violation || contended {
                return Self::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| failure.to_string()),
                );
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage backend for one ordered collection.
pub trait RecordStore {
    /// Entity-specific data carried next to `id` and `position`.
    type Payload;
    /// Unit of work handed out by `begin_write`/`begin_read`.
    type Unit<'a>: StoreUnit<Payload = Self::Payload>
    where
        Self: 'a;

    /// Collection name used in diagnostics.
    fn collection(&self) -> &'static str;
    /// Opens an exclusive read-modify-write unit for this collection.
    fn begin_write(&self) -> StoreResult<Self::Unit<'_>>;
    /// Opens a snapshot read unit; must not block other readers.
    fn begin_read(&self) -> StoreResult<Self::Unit<'_>>;
}

/// Operations available inside one unit of work.
pub trait StoreUnit {
    type Payload;

    /// Number of records in the collection.
    fn count(&self) -> StoreResult<i64>;
    /// Record holding `position`, if any.
    fn find_by_position(&self, position: Position)
        -> StoreResult<Option<Record<Self::Payload>>>;
    /// Record with `id`, if any.
    fn find_by_id(&self, id: RecordId) -> StoreResult<Option<Record<Self::Payload>>>;
    /// Records whose id is in `ids`, ascending by position. Unknown ids are
    /// skipped.
    fn find_all_by_id(&self, ids: &BTreeSet<RecordId>)
        -> StoreResult<Vec<Record<Self::Payload>>>;
    /// Every record, ascending by position.
    fn find_all(&self) -> StoreResult<Vec<Record<Self::Payload>>>;
    /// Stores a new record at `position`, which the caller has freed.
    fn insert(&self, position: Position, payload: &Self::Payload)
        -> StoreResult<Record<Self::Payload>>;
    /// Replaces the payload of `id`; `None` when the id is unknown.
    fn update_payload(
        &self,
        id: RecordId,
        payload: &Self::Payload,
    ) -> StoreResult<Option<Record<Self::Payload>>>;
    /// Adds `delta` to every position in `range` without ever holding two
    /// records on the same position. Returns the number of moved records.
    fn shift_positions(&self, range: RangeFrom<Position>, delta: i64) -> StoreResult<usize>;
    /// Exchanges the positions of two records.
    fn swap_positions(&self, first: RecordId, second: RecordId) -> StoreResult<()>;
    /// Removes `id`; `false` when it was not present.
    fn delete_by_id(&self, id: RecordId) -> StoreResult<bool>;
    /// Removes every record. Returns the number removed.
    fn delete_all(&self) -> StoreResult<usize>;
    /// One page of records plus the total count, from the same snapshot.
    fn page(&self, request: &PageRequest) -> StoreResult<Page<Record<Self::Payload>>>;
    /// Makes every change of this unit durable and visible.
    fn commit(self) -> StoreResult<()>;
}
