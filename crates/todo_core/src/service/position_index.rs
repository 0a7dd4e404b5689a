//! Position index: the ordering engine shared by every collection.
//!
//! # Responsibility
//! - Create, move and remove records while keeping `position` a dense
//!   `0..N-1` permutation.
//! - Run each operation inside exactly one store unit of work and retry that
//!   unit, bounded by `RetryPolicy`, when the store reports a conflict.
//!
//! # Invariants
//! - After every successful call the positions of a collection of N records
//!   are exactly `{0, .., N-1}`.
//! - Insert shifts `position >= p` up by one; delete shifts
//!   `position > removed` down by one; relative order of untouched records
//!   never changes.
//! - Payload updates never touch `position`.
//! - Errors leave the collection as it was before the call.

use crate::config::RetryPolicy;
use crate::model::page::{Page, PageRequest};
use crate::model::record::{Position, Record, RecordId};
use crate::repo::record_store::{RecordStore, StoreError, StoreUnit};
use log::{debug, error, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type IndexResult<T> = Result<T, IndexError>;

/// Errors returned by the position index and the collection facades.
#[derive(Debug)]
pub enum IndexError {
    /// No record with this id.
    NotFound(RecordId),
    /// Position outside `[0, bound]` for the requested operation.
    InvalidPosition { value: Position, bound: Position },
    /// Page number negative, page size not positive, or unknown sort field.
    InvalidPageRequest(String),
    /// Concurrent writers raced on a position and retries were exhausted.
    Conflict(String),
    /// Any other persistence failure.
    Storage(StoreError),
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidPosition { value, bound } => {
                write!(f, "position {value} is outside the allowed range 0..={bound}")
            }
            Self::InvalidPageRequest(reason) => write!(f, "invalid page request: {reason}"),
            Self::Conflict(detail) => write!(f, "concurrent position update: {detail}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IndexError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for IndexError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(detail) => Self::Conflict(detail),
            StoreError::UnsupportedSortField(field) => {
                Self::InvalidPageRequest(format!("unsupported sort field `{field}`"))
            }
            StoreError::InvalidPageRequest(reason) => Self::InvalidPageRequest(reason),
            other => Self::Storage(other),
        }
    }
}

impl IndexError {
    fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidPosition { .. } | Self::InvalidPageRequest(_)
        )
    }
}

/// Generic ordering engine over one record store.
pub struct PositionIndex<S> {
    store: S,
    retry: RetryPolicy,
}

impl<S: RecordStore> PositionIndex<S> {
    /// Creates an engine with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_retry_policy(store, RetryPolicy::default())
    }

    pub fn with_retry_policy(store: S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Name of the underlying collection.
    pub fn collection(&self) -> &'static str {
        self.store.collection()
    }

    /// Number of records in the collection.
    pub fn count(&self) -> IndexResult<i64> {
        self.read("count", |unit| Ok(unit.count()?))
    }

    /// Stores `payload` at the end of the collection.
    pub fn append(&self, payload: S::Payload) -> IndexResult<Record<S::Payload>> {
        self.write("append", |unit| {
            let count = unit.count()?;
            Ok(unit.insert(count, &payload)?)
        })
    }

    /// Stores `payload` at `position`, moving the records at and after it
    /// one step back.
    ///
    /// # Errors
    /// - `InvalidPosition` when `position` is negative or greater than the
    ///   current count.
    pub fn insert_at(
        &self,
        position: Position,
        payload: S::Payload,
    ) -> IndexResult<Record<S::Payload>> {
        self.write("insert_at", |unit| {
            let count = unit.count()?;
            if position < 0 || position > count {
                return Err(IndexError::InvalidPosition {
                    value: position,
                    bound: count,
                });
            }
            if position < count {
                unit.shift_positions(position.., 1)?;
            }
            Ok(unit.insert(position, &payload)?)
        })
    }

    /// Appends when `position` is `None`, inserts at it otherwise.
    pub fn create(
        &self,
        payload: S::Payload,
        position: Option<Position>,
    ) -> IndexResult<Record<S::Payload>> {
        match position {
            Some(position) => self.insert_at(position, payload),
            None => self.append(payload),
        }
    }

    /// Replaces the payload of `id`.
    pub fn update(&self, id: RecordId, payload: S::Payload) -> IndexResult<Record<S::Payload>> {
        self.write("update", |unit| {
            unit.update_payload(id, &payload)?
                .ok_or(IndexError::NotFound(id))
        })
    }

    /// Replaces the payload of `id` with one derived from the stored payload,
    /// read and written in the same unit of work.
    pub fn update_with(
        &self,
        id: RecordId,
        change: impl Fn(&S::Payload) -> S::Payload,
    ) -> IndexResult<Record<S::Payload>> {
        self.write("update", |unit| {
            let current = unit.find_by_id(id)?.ok_or(IndexError::NotFound(id))?;
            let next = change(&current.payload);
            unit.update_payload(id, &next)?
                .ok_or(IndexError::NotFound(id))
        })
    }

    /// Exchanges the records at `from` and `to`.
    ///
    /// # Errors
    /// - `InvalidPosition` when either position is negative or past the last
    ///   occupied position. Checked before the `from == to` no-op.
    pub fn swap(&self, from: Position, to: Position) -> IndexResult<()> {
        self.write("swap", |unit| {
            let max_position = unit.count()? - 1;
            for value in [from, to] {
                if value < 0 || value > max_position {
                    return Err(IndexError::InvalidPosition {
                        value,
                        bound: max_position,
                    });
                }
            }
            if from == to {
                return Ok(());
            }

            let first = unit
                .find_by_position(from)?
                .ok_or_else(|| self.broken_permutation(from))?;
            let second = unit
                .find_by_position(to)?
                .ok_or_else(|| self.broken_permutation(to))?;
            unit.swap_positions(first.id, second.id)?;
            Ok(())
        })
    }

    /// Removes `id` and closes the gap it leaves. Returns the record as it
    /// was before removal.
    pub fn delete_by_id(&self, id: RecordId) -> IndexResult<Record<S::Payload>> {
        self.write("delete_by_id", |unit| {
            let removed = unit.find_by_id(id)?.ok_or(IndexError::NotFound(id))?;
            remove_and_close_gap(unit, &removed)?;
            Ok(removed)
        })
    }

    /// Removes every record whose id is in `ids`; unknown ids are skipped.
    ///
    /// Records are removed one by one from the highest position down, each
    /// removal closing its own gap, so survivors keep their relative order.
    /// Returns the removed records ascending by their former position.
    pub fn delete_all_by_id(
        &self,
        ids: &BTreeSet<RecordId>,
    ) -> IndexResult<Vec<Record<S::Payload>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.write("delete_all_by_id", |unit| {
            let matched = unit.find_all_by_id(ids)?;
            for record in matched.iter().rev() {
                remove_and_close_gap(unit, record)?;
            }
            Ok(matched)
        })
    }

    /// Removes every record. Returns them ascending by former position.
    pub fn delete_all(&self) -> IndexResult<Vec<Record<S::Payload>>> {
        self.write("delete_all", |unit| {
            let removed = unit.find_all()?;
            unit.delete_all()?;
            Ok(removed)
        })
    }

    pub fn get_by_id(&self, id: RecordId) -> IndexResult<Record<S::Payload>> {
        self.read("get_by_id", |unit| {
            unit.find_by_id(id)?.ok_or(IndexError::NotFound(id))
        })
    }

    /// Records matching `ids`, ascending by position; unknown ids are omitted.
    pub fn get_all_by_id(
        &self,
        ids: &BTreeSet<RecordId>,
    ) -> IndexResult<Vec<Record<S::Payload>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.read("get_all_by_id", |unit| Ok(unit.find_all_by_id(ids)?))
    }

    /// Every record, ascending by position.
    pub fn get_all(&self) -> IndexResult<Vec<Record<S::Payload>>> {
        self.read("get_all", |unit| Ok(unit.find_all()?))
    }

    /// One page of the collection.
    ///
    /// # Errors
    /// - `InvalidPageRequest` for a negative page number, a non-positive page
    ///   size, an offset past `i64::MAX`, or a sort field the collection does
    ///   not declare.
    pub fn page(&self, request: &PageRequest) -> IndexResult<Page<Record<S::Payload>>> {
        if request.page_size <= 0 {
            return Err(IndexError::InvalidPageRequest(format!(
                "page size must be positive, got {}",
                request.page_size
            )));
        }
        if request.page_number < 0 {
            return Err(IndexError::InvalidPageRequest(format!(
                "page number must not be negative, got {}",
                request.page_number
            )));
        }
        if request.offset().is_none() {
            return Err(IndexError::InvalidPageRequest(format!(
                "page {} of size {} is out of range",
                request.page_number, request.page_size
            )));
        }
        self.read("page", |unit| Ok(unit.page(request)?))
    }

    fn broken_permutation(&self, position: Position) -> IndexError {
        IndexError::Storage(StoreError::InvalidData(format!(
            "no record at position {position} in {}",
            self.collection()
        )))
    }

    fn write<'s, T>(
        &'s self,
        operation: &'static str,
        work: impl Fn(&S::Unit<'s>) -> IndexResult<T>,
    ) -> IndexResult<T> {
        let started_at = Instant::now();
        let mut attempt = 1;
        loop {
            let result = self
                .store
                .begin_write()
                .map_err(IndexError::from)
                .and_then(|unit| {
                    let value = work(&unit)?;
                    unit.commit()?;
                    Ok(value)
                });

            match result {
                Ok(value) => {
                    debug!(
                        "event=position_write module=index collection={} op={} status=ok attempts={} duration_ms={}",
                        self.collection(),
                        operation,
                        attempt,
                        started_at.elapsed().as_millis()
                    );
                    return Ok(value);
                }
                Err(IndexError::Conflict(detail)) if attempt < self.retry.max_attempts => {
                    warn!(
                        "event=position_write module=index collection={} op={} status=retry attempt={} error={}",
                        self.collection(),
                        operation,
                        attempt,
                        detail
                    );
                    attempt += 1;
                }
                Err(err) => {
                    self.log_failure(operation, &err, started_at);
                    return Err(err);
                }
            }
        }
    }

    fn read<'s, T>(
        &'s self,
        operation: &'static str,
        work: impl FnOnce(&S::Unit<'s>) -> IndexResult<T>,
    ) -> IndexResult<T> {
        let started_at = Instant::now();
        let result = self
            .store
            .begin_read()
            .map_err(IndexError::from)
            .and_then(|unit| {
                let value = work(&unit)?;
                unit.commit()?;
                Ok(value)
            });
        if let Err(err) = &result {
            self.log_failure(operation, err, started_at);
        }
        result
    }

    fn log_failure(&self, operation: &'static str, err: &IndexError, started_at: Instant) {
        if err.is_caller_error() {
            debug!(
                "event=position_op module=index collection={} op={} status=rejected error={}",
                self.collection(),
                operation,
                err
            );
        } else {
            error!(
                "event=position_op module=index collection={} op={} status=error duration_ms={} error={}",
                self.collection(),
                operation,
                started_at.elapsed().as_millis(),
                err
            );
        }
    }
}

fn remove_and_close_gap<U: StoreUnit>(unit: &U, record: &Record<U::Payload>) -> IndexResult<()> {
    if !unit.delete_by_id(record.id)? {
        return Err(IndexError::NotFound(record.id));
    }
    unit.shift_positions(record.position + 1.., -1)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{IndexError, PositionIndex};
    use crate::db::open_db_in_memory;
    use crate::model::priority::Priority;
    use crate::repo::priority_repo::SqlitePriorityStore;
    use crate::repo::record_store::StoreError;

    #[test]
    fn store_conflict_maps_to_index_conflict() {
        let err = IndexError::from(StoreError::Conflict("UNIQUE".to_string()));
        assert!(matches!(err, IndexError::Conflict(_)));
        let err = IndexError::from(StoreError::UnsupportedSortField("colour".to_string()));
        assert!(matches!(err, IndexError::InvalidPageRequest(_)));
        let err = IndexError::from(StoreError::InvalidPageRequest("page -1".to_string()));
        assert!(matches!(err, IndexError::InvalidPageRequest(_)));
    }

    #[test]
    fn swap_on_empty_collection_is_out_of_range() {
        let conn = open_db_in_memory().unwrap();
        let index = PositionIndex::new(SqlitePriorityStore::try_new(&conn).unwrap());
        let err = index.swap(0, 0).unwrap_err();
        assert!(matches!(
            err,
            IndexError::InvalidPosition {
                value: 0,
                bound: -1
            }
        ));
    }

    #[test]
    fn rejected_insert_leaves_collection_untouched() {
        let conn = open_db_in_memory().unwrap();
        let index = PositionIndex::new(SqlitePriorityStore::try_new(&conn).unwrap());
        index.append(Priority::new("low")).unwrap();

        assert!(index.insert_at(-1, Priority::new("bad")).is_err());
        assert!(index.insert_at(2, Priority::new("bad")).is_err());
        assert_eq!(index.count().unwrap(), 1);
    }
}
