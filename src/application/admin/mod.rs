//! Application services for the administrative surface.

pub mod analytics;
pub mod articles;
pub mod audit;
pub mod clients;
pub mod conferences;
pub mod contracts;
pub mod deals;
pub mod newsletter;
pub mod speakers;
pub mod tasks;
pub mod vendors;
pub mod workshops;

use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugAsyncError, SlugError};

/// Map slug derivation failures onto a service error.
pub(crate) fn slug_error<E>(err: SlugAsyncError<RepoError>) -> E
where
    E: From<DomainError> + From<RepoError>,
{
    match err {
        SlugAsyncError::Slug(SlugError::Exhausted { base }) => {
            DomainError::invariant(format!("no free slug left for `{base}`")).into()
        }
        SlugAsyncError::Slug(err) => DomainError::validation(err.to_string()).into(),
        SlugAsyncError::Predicate(err) => err.into(),
    }
}
