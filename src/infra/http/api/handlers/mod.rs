//! Admin API handlers organized by resource.
//!
//! Each submodule owns the handlers for one resource; cursor parsing and the
//! shared clock live here.

mod activity;
mod analytics;
mod articles;
mod clients;
mod conferences;
mod contracts;
mod deals;
mod newsletter;
mod speakers;
mod tasks;
mod vendors;
mod workshops;

pub use activity::*;
pub use analytics::*;
pub use articles::*;
pub use clients::*;
pub use conferences::*;
pub use contracts::*;
pub use deals::*;
pub use newsletter::*;
pub use speakers::*;
pub use tasks::*;
pub use vendors::*;
pub use workshops::*;

use serde::{Serialize, de::DeserializeOwned};
use time::{Date, OffsetDateTime};

use crate::application::pagination::{DEFAULT_PAGE_SIZE, KeysetCursor, PageRequest};

use super::error::ApiError;

/// Decode an optional opaque cursor into a page request.
pub(crate) fn page_request<K>(
    limit: Option<u32>,
    cursor: Option<&str>,
) -> Result<PageRequest<KeysetCursor<K>>, ApiError>
where
    K: Serialize + DeserializeOwned,
{
    let cursor = cursor
        .filter(|raw| !raw.trim().is_empty())
        .map(KeysetCursor::<K>::decode)
        .transpose()
        .map_err(ApiError::invalid_cursor)?;
    Ok(PageRequest::new(limit.unwrap_or(DEFAULT_PAGE_SIZE), cursor))
}

pub(crate) fn today() -> Date {
    OffsetDateTime::now_utc().date()
}
