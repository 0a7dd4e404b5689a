//! Table mapping for the todo collection.
//!
//! # Invariants
//! - Dates are stored as ISO-8601 `YYYY-MM-DD` text.
//! - `priority_id` is a nullable foreign key; the schema clears it when the
//!   referenced priority is deleted.

use super::record_store::{StoreError, StoreResult};
use super::sqlite_store::{SqliteCollection, SqliteRecordStore};
use crate::model::todo::{Todo, TodoStatus};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Row;

/// `todos` table.
pub struct TodoTable;

impl SqliteCollection for TodoTable {
    type Payload = Todo;

    const TABLE: &'static str = "todos";
    const PAYLOAD_COLUMNS: &'static [&'static str] = &[
        "title",
        "description",
        "priority_id",
        "status",
        "creation_date",
        "planned_date",
        "completion_date",
    ];
    const SORTABLE_COLUMNS: &'static [&'static str] = &[
        "title",
        "status",
        "creation_date",
        "planned_date",
        "completion_date",
    ];

    fn payload_values(payload: &Todo) -> Vec<Value> {
        vec![
            Value::Text(payload.title.clone()),
            optional_text(payload.description.clone()),
            payload.priority.map_or(Value::Null, Value::Integer),
            Value::Text(payload.status.as_str().to_string()),
            date_value(payload.creation_date),
            date_value(payload.planned_date),
            payload.completion_date.map_or(Value::Null, date_value),
        ]
    }

    fn parse_payload(row: &Row<'_>) -> StoreResult<Todo> {
        let status_text: String = row.get("status")?;
        let status = TodoStatus::parse(&status_text).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid todo status `{status_text}` in todos.status"
            ))
        })?;

        Ok(Todo {
            title: row.get("title")?,
            description: row.get("description")?,
            priority: row.get("priority_id")?,
            status,
            creation_date: row.get::<_, NaiveDate>("creation_date")?,
            planned_date: row.get::<_, NaiveDate>("planned_date")?,
            completion_date: row.get::<_, Option<NaiveDate>>("completion_date")?,
        })
    }
}

/// SQLite store for todo items.
pub type SqliteTodoStore<'conn> = SqliteRecordStore<'conn, TodoTable>;

fn optional_text(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::Text)
}

fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}
