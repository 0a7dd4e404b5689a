//! SQLite implementation of the record store contract.
//!
//! # Responsibility
//! - Map one collection table onto `RecordStore`/`StoreUnit`.
//! - Keep SQL text, parameter binding and row parsing inside the repository
//!   boundary.
//!
//! # Invariants
//! - Write units are `BEGIN IMMEDIATE` transactions: the database write lock
//!   is taken before the first read, so count/position reads cannot go stale
//!   before the unit commits. This holds across connections and processes.
//! - Read units are deferred transactions and see one consistent snapshot.
//! - Position moves never write a value already held by another row:
//!   shifted rows are parked on negative positions first, swaps go through
//!   `SWAP_SENTINEL`.
//! - Only payload columns declared in `SqliteCollection::SORTABLE_COLUMNS` are
//!   ever interpolated into SQL.

use super::record_store::{RecordStore, StoreError, StoreResult, StoreUnit};
use crate::db::migrations::latest_version;
use crate::model::page::{Page, PageRequest, SortField};
use crate::model::record::{Position, Record, RecordId};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::ops::RangeFrom;

/// Out-of-range position a record occupies while two records trade places.
pub const SWAP_SENTINEL: Position = -1;

/// Table mapping for one ordered collection.
///
/// Every table has `id INTEGER PRIMARY KEY`, `position INTEGER UNIQUE` and
/// `updated_at`; payload columns are declared by the implementor.
pub trait SqliteCollection {
    type Payload;

    /// Table name, also used as collection name in logs.
    const TABLE: &'static str;
    /// Payload columns, in the order produced by `payload_values`.
    const PAYLOAD_COLUMNS: &'static [&'static str];
    /// Payload columns accepted as `SortField::Payload`.
    const SORTABLE_COLUMNS: &'static [&'static str];

    /// Bind values for `PAYLOAD_COLUMNS`.
    fn payload_values(payload: &Self::Payload) -> Vec<Value>;
    /// Reads the payload columns from a row selected with `select_sql`.
    fn parse_payload(row: &Row<'_>) -> StoreResult<Self::Payload>;
}

/// SQLite-backed store for collection `C`.
pub struct SqliteRecordStore<'conn, C> {
    conn: &'conn Connection,
    _collection: PhantomData<fn() -> C>,
}

impl<'conn, C: SqliteCollection> SqliteRecordStore<'conn, C> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_collection_ready::<C>(conn)?;
        Ok(Self {
            conn,
            _collection: PhantomData,
        })
    }
}

impl<C: SqliteCollection> RecordStore for SqliteRecordStore<'_, C> {
    type Payload = C::Payload;
    type Unit<'a>
        = SqliteUnit<'a, C>
    where
        Self: 'a;

    fn collection(&self) -> &'static str {
        C::TABLE
    }

    fn begin_write(&self) -> StoreResult<Self::Unit<'_>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        Ok(SqliteUnit::new(tx))
    }

    fn begin_read(&self) -> StoreResult<Self::Unit<'_>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        Ok(SqliteUnit::new(tx))
    }
}

/// One open transaction against collection `C`. Rolls back on drop.
pub struct SqliteUnit<'conn, C> {
    tx: Transaction<'conn>,
    _collection: PhantomData<fn() -> C>,
}

impl<'conn, C: SqliteCollection> SqliteUnit<'conn, C> {
    fn new(tx: Transaction<'conn>) -> Self {
        Self {
            tx,
            _collection: PhantomData,
        }
    }

    fn query_records(
        &self,
        sql: &str,
        values: Vec<Value>,
    ) -> StoreResult<Vec<Record<C::Payload>>> {
        let mut stmt = self.tx.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row::<C>(row)?);
        }
        Ok(records)
    }

    fn query_optional(
        &self,
        sql: &str,
        values: Vec<Value>,
    ) -> StoreResult<Option<Record<C::Payload>>> {
        let mut stmt = self.tx.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row::<C>(row)?));
        }
        Ok(None)
    }

    fn position_of(&self, id: RecordId) -> StoreResult<Position> {
        let position: Option<Position> = self
            .tx
            .query_row(
                &format!("SELECT position FROM {} WHERE id = ?1;", C::TABLE),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        position.ok_or_else(|| {
            StoreError::InvalidData(format!("record {id} missing from {}", C::TABLE))
        })
    }

    fn set_position(&self, id: RecordId, position: Position) -> StoreResult<()> {
        self.tx.execute(
            &format!(
                "UPDATE {}
                 SET position = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                C::TABLE
            ),
            params![id, position],
        )?;
        Ok(())
    }
}

impl<C: SqliteCollection> StoreUnit for SqliteUnit<'_, C> {
    type Payload = C::Payload;

    fn count(&self) -> StoreResult<i64> {
        let count = self.tx.query_row(
            &format!("SELECT COUNT(*) FROM {};", C::TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn find_by_position(&self, position: Position) -> StoreResult<Option<Record<C::Payload>>> {
        self.query_optional(
            &format!("{} WHERE position = ?1;", select_sql::<C>()),
            vec![Value::Integer(position)],
        )
    }

    fn find_by_id(&self, id: RecordId) -> StoreResult<Option<Record<C::Payload>>> {
        self.query_optional(
            &format!("{} WHERE id = ?1;", select_sql::<C>()),
            vec![Value::Integer(id)],
        )
    }

    fn find_all_by_id(&self, ids: &BTreeSet<RecordId>) -> StoreResult<Vec<Record<C::Payload>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        self.query_records(
            &format!(
                "{} WHERE id IN ({placeholders}) ORDER BY position ASC;",
                select_sql::<C>()
            ),
            ids.iter().map(|id| Value::Integer(*id)).collect(),
        )
    }

    fn find_all(&self) -> StoreResult<Vec<Record<C::Payload>>> {
        self.query_records(
            &format!("{} ORDER BY position ASC;", select_sql::<C>()),
            Vec::new(),
        )
    }

    fn insert(&self, position: Position, payload: &C::Payload) -> StoreResult<Record<C::Payload>> {
        let columns = C::PAYLOAD_COLUMNS.join(", ");
        let placeholders = (2..=C::PAYLOAD_COLUMNS.len() + 1)
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = vec![Value::Integer(position)];
        values.extend(C::payload_values(payload));

        self.tx.execute(
            &format!(
                "INSERT INTO {} (position, {columns}) VALUES (?1, {placeholders});",
                C::TABLE
            ),
            params_from_iter(values),
        )?;

        let id = self.tx.last_insert_rowid();
        self.find_by_id(id)?.ok_or_else(|| {
            StoreError::InvalidData(format!("inserted record {id} not readable from {}", C::TABLE))
        })
    }

    fn update_payload(
        &self,
        id: RecordId,
        payload: &C::Payload,
    ) -> StoreResult<Option<Record<C::Payload>>> {
        let assignments = C::PAYLOAD_COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = vec![Value::Integer(id)];
        values.extend(C::payload_values(payload));

        let changed = self.tx.execute(
            &format!(
                "UPDATE {}
                 SET {assignments},
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                C::TABLE
            ),
            params_from_iter(values),
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.find_by_id(id)
    }

    fn shift_positions(&self, range: RangeFrom<Position>, delta: i64) -> StoreResult<usize> {
        if delta == 0 {
            return Ok(0);
        }
        if range.start < 0 || range.start + delta < 0 {
            return Err(StoreError::InvalidData(format!(
                "shift of {}.. by {delta} leaves the position range in {}",
                range.start,
                C::TABLE
            )));
        }

        // Park every moved row on a distinct negative value, then flip back.
        // A single `position = position + delta` would hit the UNIQUE index
        // mid-statement depending on row visit order.
        let moved = self.tx.execute(
            &format!(
                "UPDATE {}
                 SET position = -(position + ?2) - 1
                 WHERE position >= ?1;",
                C::TABLE
            ),
            params![range.start, delta],
        )?;
        self.tx.execute(
            &format!(
                "UPDATE {}
                 SET position = -position - 1,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE position < 0;",
                C::TABLE
            ),
            [],
        )?;
        Ok(moved)
    }

    fn swap_positions(&self, first: RecordId, second: RecordId) -> StoreResult<()> {
        let first_position = self.position_of(first)?;
        let second_position = self.position_of(second)?;
        if first_position == second_position {
            return Ok(());
        }

        self.set_position(first, SWAP_SENTINEL)?;
        self.set_position(second, first_position)?;
        self.set_position(first, second_position)?;
        Ok(())
    }

    fn delete_by_id(&self, id: RecordId) -> StoreResult<bool> {
        let changed = self
            .tx
            .execute(&format!("DELETE FROM {} WHERE id = ?1;", C::TABLE), [id])?;
        Ok(changed > 0)
    }

    fn delete_all(&self) -> StoreResult<usize> {
        let changed = self
            .tx
            .execute(&format!("DELETE FROM {};", C::TABLE), [])?;
        Ok(changed)
    }

    fn page(&self, request: &PageRequest) -> StoreResult<Page<Record<C::Payload>>> {
        let offset = request.offset().ok_or_else(|| {
            StoreError::InvalidPageRequest(format!(
                "page {} of size {} is not addressable",
                request.page_number, request.page_size
            ))
        })?;
        let sort_column = sort_column::<C>(&request.sort_field)?;
        let direction = request.sort_direction.as_sql();
        let order_by = if sort_column == "position" {
            format!("position {direction}")
        } else {
            format!("{sort_column} {direction}, position ASC")
        };

        let total_count = self.count()?;
        let items = self.query_records(
            &format!(
                "{} ORDER BY {order_by} LIMIT ?1 OFFSET ?2;",
                select_sql::<C>()
            ),
            vec![Value::Integer(request.page_size), Value::Integer(offset)],
        )?;

        Ok(Page {
            items,
            total_count,
            page_number: request.page_number,
            page_size: request.page_size,
        })
    }

    fn commit(self) -> StoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn select_sql<C: SqliteCollection>() -> String {
    format!(
        "SELECT id, position, {} FROM {}",
        C::PAYLOAD_COLUMNS.join(", "),
        C::TABLE
    )
}

fn sort_column<C: SqliteCollection>(field: &SortField) -> StoreResult<&'static str> {
    match field {
        SortField::Position => Ok("position"),
        SortField::Id => Ok("id"),
        SortField::Payload(name) => C::SORTABLE_COLUMNS
            .iter()
            .copied()
            .find(|column| *column == name.as_str())
            .ok_or_else(|| StoreError::UnsupportedSortField(name.clone())),
    }
}

fn parse_record_row<C: SqliteCollection>(row: &Row<'_>) -> StoreResult<Record<C::Payload>> {
    let position: Position = row.get("position")?;
    if position < 0 {
        return Err(StoreError::InvalidData(format!(
            "negative position `{position}` in {}.position",
            C::TABLE
        )));
    }
    Ok(Record {
        id: row.get("id")?,
        position,
        payload: C::parse_payload(row)?,
    })
}

fn ensure_collection_ready<C: SqliteCollection>(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, C::TABLE)? {
        return Err(StoreError::MissingRequiredTable(C::TABLE));
    }

    for column in ["id", "position", "updated_at"]
        .into_iter()
        .chain(C::PAYLOAD_COLUMNS.iter().copied())
    {
        if !table_has_column(conn, C::TABLE, column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: C::TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
