//! Domain layer types and invariants.

pub mod contracts;
pub mod deals;
pub mod entities;
pub mod error;
pub mod rich_text;
pub mod slug;
pub mod types;
pub mod validate;
