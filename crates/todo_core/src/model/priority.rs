//! Priority payload.

use super::record::Record;
use serde::{Deserialize, Serialize};

/// Named priority level. Ordering lives on the enclosing `Record`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub name: String,
}

impl Priority {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A stored, positioned priority.
pub type PriorityRecord = Record<Priority>;
