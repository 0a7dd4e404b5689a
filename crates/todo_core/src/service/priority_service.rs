//! Priority collection facade.
//!
//! # Responsibility
//! - Attach the `{name}` payload to the generic position index.
//! - Expose the priority use-cases: create, rename, swap, delete, query.
//!
//! # Invariants
//! - No position arithmetic here; every ordering decision belongs to
//!   `PositionIndex`.
//! - Errors from the index are returned unchanged.

use crate::config::RetryPolicy;
use crate::model::page::{Page, PageRequest};
use crate::model::priority::{Priority, PriorityRecord};
use crate::model::record::{Position, RecordId};
use crate::repo::record_store::RecordStore;
use crate::service::position_index::{IndexResult, PositionIndex};
use std::collections::BTreeSet;

/// Use-case service for the priority collection.
pub struct PriorityService<S> {
    index: PositionIndex<S>,
}

impl<S: RecordStore<Payload = Priority>> PriorityService<S> {
    pub fn new(store: S) -> Self {
        Self {
            index: PositionIndex::new(store),
        }
    }

    pub fn with_retry_policy(store: S, retry: RetryPolicy) -> Self {
        Self {
            index: PositionIndex::with_retry_policy(store, retry),
        }
    }

    /// Creates a priority at the end, or at `position` when given.
    pub fn create(
        &self,
        name: impl Into<String>,
        position: Option<Position>,
    ) -> IndexResult<PriorityRecord> {
        self.index.create(Priority::new(name), position)
    }

    /// Replaces the name of `id`; its position is unchanged.
    pub fn rename(&self, id: RecordId, name: impl Into<String>) -> IndexResult<PriorityRecord> {
        self.index.update(id, Priority::new(name))
    }

    pub fn swap(&self, from: Position, to: Position) -> IndexResult<()> {
        self.index.swap(from, to)
    }

    /// Deletes `id`. Todo items referencing it lose their priority.
    pub fn delete_by_id(&self, id: RecordId) -> IndexResult<PriorityRecord> {
        self.index.delete_by_id(id)
    }

    pub fn delete_all_by_id(
        &self,
        ids: impl IntoIterator<Item = RecordId>,
    ) -> IndexResult<Vec<PriorityRecord>> {
        self.index
            .delete_all_by_id(&ids.into_iter().collect::<BTreeSet<_>>())
    }

    pub fn delete_all(&self) -> IndexResult<Vec<PriorityRecord>> {
        self.index.delete_all()
    }

    pub fn get_by_id(&self, id: RecordId) -> IndexResult<PriorityRecord> {
        self.index.get_by_id(id)
    }

    pub fn get_all_by_id(
        &self,
        ids: impl IntoIterator<Item = RecordId>,
    ) -> IndexResult<Vec<PriorityRecord>> {
        self.index
            .get_all_by_id(&ids.into_iter().collect::<BTreeSet<_>>())
    }

    pub fn get_all(&self) -> IndexResult<Vec<PriorityRecord>> {
        self.index.get_all()
    }

    pub fn page(&self, request: &PageRequest) -> IndexResult<Page<PriorityRecord>> {
        self.index.page(request)
    }

    pub fn count(&self) -> IndexResult<i64> {
        self.index.count()
    }
}
