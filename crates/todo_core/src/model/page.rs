//! Page request/result value objects.
//!
//! # Invariants
//! - The default request sorts by `position` ascending, which is the natural
//!   collection order.
//! - Ties on any sort field are broken by `position` ascending so page
//!   boundaries are deterministic.

use serde::{Deserialize, Serialize};

/// Page size used when a caller does not pick one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Field used to order a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Collection order.
    Position,
    /// Store-assigned identity.
    Id,
    /// A payload column declared sortable by the collection, e.g. `name`.
    Payload(String),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Request for one page of a collection.
///
/// Numbers are signed so malformed input reaches the engine and is rejected
/// there rather than being unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_number: i64,
    pub page_size: i64,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort_field: SortField::Position,
            sort_direction: SortDirection::Ascending,
        }
    }
}

impl PageRequest {
    /// Position-ascending request for `page_number` with `page_size` items.
    pub fn of(page_number: i64, page_size: i64) -> Self {
        Self {
            page_number,
            page_size,
            ..Self::default()
        }
    }

    /// Returns a copy sorted by `field` in `direction`.
    pub fn sorted_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort_field = field;
        self.sort_direction = direction;
        self
    }

    /// Row offset of the first item, or `None` when the request is invalid or
    /// the offset does not fit in `i64`.
    pub fn offset(&self) -> Option<i64> {
        if self.page_number < 0 || self.page_size <= 0 {
            return None;
        }
        self.page_number.checked_mul(self.page_size)
    }
}

/// One page of records plus the collection size it was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page_number: i64,
    pub page_size: i64,
}

impl<T> Page<T> {
    /// Number of pages needed to cover `total_count`.
    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        self.total_count / self.page_size + i64::from(self.total_count % self.page_size != 0)
    }

    /// Whether a page after this one has items.
    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages() - 1
    }
}
