//! Generic positioned record.

use serde::{Deserialize, Serialize};

/// Stable row identity assigned by the store.
pub type RecordId = i64;

/// Zero-based rank inside one collection.
///
/// Signed so that caller input such as `-1` can be rejected with a position
/// error instead of wrapping.
pub type Position = i64;

/// One stored row: identity, rank, and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<P> {
    pub id: RecordId,
    pub position: Position,
    pub payload: P,
}

