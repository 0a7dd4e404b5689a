//! Table mapping for the priority collection.

use super::record_store::StoreResult;
use super::sqlite_store::{SqliteCollection, SqliteRecordStore};
use crate::model::priority::Priority;
use rusqlite::types::Value;
use rusqlite::Row;

/// `priorities` table: payload is the priority name.
pub struct PriorityTable;

impl SqliteCollection for PriorityTable {
    type Payload = Priority;

    const TABLE: &'static str = "priorities";
    const PAYLOAD_COLUMNS: &'static [&'static str] = &["name"];
    const SORTABLE_COLUMNS: &'static [&'static str] = &["name"];

    fn payload_values(payload: &Priority) -> Vec<Value> {
        vec![Value::Text(payload.name.clone())]
    }

    fn parse_payload(row: &Row<'_>) -> StoreResult<Priority> {
        Ok(Priority {
            name: row.get("name")?,
        })
    }
}

/// SQLite store for priorities.
pub type SqlitePriorityStore<'conn> = SqliteRecordStore<'conn, PriorityTable>;
