//! Core use-case services.
//!
//! # Responsibility
//! - Host the generic position index.
//! - Specialize it per collection without duplicating ordering logic.

pub mod position_index;
pub mod priority_service;
pub mod todo_service;
