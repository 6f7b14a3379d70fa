//! Services behind the bearer-authenticated webhook endpoints.

pub mod leads;
pub mod outrank;

use thiserror::Error;

use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("unsupported event type `{0}`")]
    UnsupportedEvent(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}
