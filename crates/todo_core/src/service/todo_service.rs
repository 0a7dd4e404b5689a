//! Todo collection facade.
//!
//! # Responsibility
//! - Attach the todo payload to the generic position index.
//! - Fill creation defaults: status `Open`, `creation_date` = today.
//!
//! # Invariants
//! - No position arithmetic here; ordering belongs to `PositionIndex`.
//! - Updates keep `creation_date`; `completion_date` is only ever what the
//!   caller sets.

use crate::config::RetryPolicy;
use crate::model::page::{Page, PageRequest};
use crate::model::record::{Position, RecordId};
use crate::model::todo::{NewTodo, Todo, TodoChanges, TodoRecord};
use crate::repo::record_store::RecordStore;
use crate::service::position_index::{IndexResult, PositionIndex};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Use-case service for the todo collection.
pub struct TodoService<S> {
    index: PositionIndex<S>,
    today: fn() -> NaiveDate,
}

impl<S: RecordStore<Payload = Todo>> TodoService<S> {
    pub fn new(store: S) -> Self {
        Self::with_retry_policy(store, RetryPolicy::default())
    }

    pub fn with_retry_policy(store: S, retry: RetryPolicy) -> Self {
        Self {
            index: PositionIndex::with_retry_policy(store, retry),
            today: local_today,
        }
    }

    /// Replaces the clock used to stamp `creation_date`.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Creates an open todo at the end, or at `position` when given.
    pub fn create(&self, input: NewTodo, position: Option<Position>) -> IndexResult<TodoRecord> {
        self.index.create(Todo::open(input, (self.today)()), position)
    }

    /// Replaces the mutable fields of `id`; position and creation date stay.
    pub fn update(&self, id: RecordId, changes: TodoChanges) -> IndexResult<TodoRecord> {
        self.index
            .update_with(id, |current| current.apply(changes.clone()))
    }

    pub fn swap(&self, from: Position, to: Position) -> IndexResult<()> {
        self.index.swap(from, to)
    }

    pub fn delete_by_id(&self, id: RecordId) -> IndexResult<TodoRecord> {
        self.index.delete_by_id(id)
    }

    pub fn delete_all_by_id(
        &self,
        ids: impl IntoIterator<Item = RecordId>,
    ) -> IndexResult<Vec<TodoRecord>> {
        self.index
            .delete_all_by_id(&ids.into_iter().collect::<BTreeSet<_>>())
    }

    pub fn delete_all(&self) -> IndexResult<Vec<TodoRecord>> {
        self.index.delete_all()
    }

    pub fn get_by_id(&self, id: RecordId) -> IndexResult<TodoRecord> {
        self.index.get_by_id(id)
    }

    pub fn get_all_by_id(
        &self,
        ids: impl IntoIterator<Item = RecordId>,
    ) -> IndexResult<Vec<TodoRecord>> {
        self.index
            .get_all_by_id(&ids.into_iter().collect::<BTreeSet<_>>())
    }

    pub fn get_all(&self) -> IndexResult<Vec<TodoRecord>> {
        self.index.get_all()
    }

    pub fn page(&self, request: &PageRequest) -> IndexResult<Page<TodoRecord>> {
        self.index.page(request)
    }

    pub fn count(&self) -> IndexResult<i64> {
        self.index.count()
    }
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
