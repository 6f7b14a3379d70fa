//! Slug derivation for speakers, conferences, workshops and articles.
//!
//! Slug generation is pure: callers supply the uniqueness predicate, usually
//! backed by a repository lookup.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("`{input}` does not contain any slug characters")]
    Unrepresentable { input: String },
    #[error("no free slug left for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Prefer an explicit slug when it survives slugification, else fall back to
/// the title.
pub fn preferred_slug(explicit: Option<&str>, title: &str) -> Result<String, SlugError> {
    match explicit.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => derive_slug(value).or_else(|_| derive_slug(title)),
        None => derive_slug(title),
    }
}

/// Suffix `base` with `-2`, `-3`, ... until `is_unique` accepts it.
pub fn generate_unique_slug<F>(input: &str, mut is_unique: F) -> Result<String, SlugError>
where
    F: FnMut(&str) -> bool,
{
    let base = derive_slug(input)?;

    for candidate in candidates(&base) {
        if is_unique(&candidate) {
            return Ok(candidate);
        }
    }

    Err(SlugError::Exhausted { base })
}

/// Async variant of [`generate_unique_slug`] for repository-backed checks.
///
/// `input` is expected to be already slugified or human text; either way it
/// is run through [`derive_slug`] first.
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    for candidate in candidates(&base) {
        if is_unique(candidate.clone())
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string()).chain(
        (2..=MAX_SUFFIX_ATTEMPTS + 1).map(move |attempt| format!("{base}-{attempt}")),
    )
}
