//! Todo payload.
//!
//! # Invariants
//! - `priority` is a non-owning reference; deleting the priority clears it.
//! - `creation_date` is set once at creation and never replaced by updates.
//! - Status changes have no implicit side effects on `completion_date`.

use super::record::{Record, RecordId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Todo lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    /// Created, not started.
    Open,
    /// Work is in progress.
    InProgress,
    /// Finished or abandoned.
    Closed,
}

impl TodoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Todo item payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub title: String,
    pub description: Option<String>,
    /// Id of a record in the priority collection.
    pub priority: Option<RecordId>,
    pub status: TodoStatus,
    pub creation_date: NaiveDate,
    pub planned_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
}

/// Caller input for creating a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<RecordId>,
    pub planned_date: NaiveDate,
}

/// Caller input for replacing the mutable fields of a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<RecordId>,
    pub status: TodoStatus,
    pub planned_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
}

impl Todo {
    /// Builds an open todo created on `today`.
    pub fn open(input: NewTodo, today: NaiveDate) -> Self {
        Self {
            title: input.title,
            description: input.description,
            priority: input.priority,
            status: TodoStatus::Open,
            creation_date: today,
            planned_date: input.planned_date,
            completion_date: None,
        }
    }

    /// Returns this todo with `changes` applied; `creation_date` is kept.
    pub fn apply(&self, changes: TodoChanges) -> Self {
        Self {
            title: changes.title,
            description: changes.description,
            priority: changes.priority,
            status: changes.status,
            creation_date: self.creation_date,
            planned_date: changes.planned_date,
            completion_date: changes.completion_date,
        }
    }
}

/// A stored, positioned todo.
pub type TodoRecord = Record<Todo>;
