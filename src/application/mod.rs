//! Application services layer.

pub mod admin;
pub mod context;
pub mod directory;
pub mod error;
pub mod jobs;
pub mod pagination;
pub mod portal;
pub mod repos;
pub mod tokens;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod testing;
