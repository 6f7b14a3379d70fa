//! Keyset cursor pagination shared by every listing.
//!
//! A cursor names the last row of the previous page by its sort key and id.
//! It travels as base64url-encoded JSON so handlers can treat it as opaque.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetCursor<K> {
    key: K,
    id: Uuid,
}

/// Newest-first listings keyed by `created_at` (or another timestamp).
pub type TimeCursor = KeysetCursor<OffsetDateTime>;
/// Calendar listings keyed by a date such as `starts_on`.
pub type DateCursor = KeysetCursor<Date>;
/// Task listings keyed by `(due_on nulls last, created_at)`.
pub type DueCursor = KeysetCursor<(Option<Date>, OffsetDateTime)>;

impl<K> KeysetCursor<K>
where
    K: Serialize + DeserializeOwned,
{
    pub fn new(key: K, id: Uuid) -> Self {
        Self { key, id }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        let serialized =
            serde_json::to_vec(self).expect("serializing cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| PaginationError::InvalidCursor(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            cursor,
        }
    }

    /// One extra row is fetched to decide whether another page exists.
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.limit) + 1
    }
}

impl<C> Default for PageRequest<C> {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    /// Trim an over-fetched row set to `limit` and derive the next cursor from
    /// the last kept row.
    pub fn from_overfetch<F>(mut rows: Vec<T>, limit: u32, cursor_for: F) -> Self
    where
        F: Fn(&T) -> String,
    {
        let limit = limit as usize;
        if rows.len() > limit {
            rows.truncate(limit);
            let next_cursor = rows.last().map(&cursor_for);
            Self::new(rows, next_cursor)
        } else {
            Self::new(rows, None)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CursorPage<U> {
        CursorPage {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn time_cursor_round_trip() {
        let cursor = TimeCursor::new(datetime!(2026-02-03 04:05:06 UTC), Uuid::nil());
        let decoded = TimeCursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn due_cursor_keeps_missing_dates() {
        let cursor = DueCursor::new((None, datetime!(2026-01-01 00:00 UTC)), Uuid::nil());
        let decoded = DueCursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded.key().0, None);

        let dated = DueCursor::new((Some(date!(2026 - 05 - 01)), datetime!(2026-01-01 00:00 UTC)), Uuid::nil());
        assert_eq!(DueCursor::decode(&dated.encode()).unwrap(), dated);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(matches!(
            TimeCursor::decode("not-base64!"),
            Err(PaginationError::InvalidCursor(_))
        ));
        let wrong_shape = URL_SAFE_NO_PAD.encode(b"{\"foo\":1}");
        assert!(DateCursor::decode(&wrong_shape).is_err());
    }

    #[test]
    fn overfetch_produces_next_cursor() {
        let page = CursorPage::from_overfetch(vec![1, 2, 3], 2, |n| format!("c{n}"));
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_cursor.as_deref(), Some("c2"));

        let last = CursorPage::from_overfetch(vec![1, 2], 2, |n| format!("c{n}"));
        assert_eq!(last.next_cursor, None);
    }

    #[test]
    fn page_request_clamps_limit() {
        assert_eq!(PageRequest::<TimeCursor>::new(0, None).limit, 1);
        assert_eq!(PageRequest::<TimeCursor>::new(1000, None).limit, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::<TimeCursor>::default().fetch_limit(), 21);
    }
}
