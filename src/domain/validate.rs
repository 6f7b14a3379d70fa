//! Field-level checks shared by the admin, portal and webhook services.

use url::Url;

use crate::domain::error::DomainError;

pub fn required(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DomainError::validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Blank optional strings collapse to `None`.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// `local@domain` with both parts non-empty; returned lower-cased.
pub fn email(value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    match trimmed.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !trimmed.contains(char::is_whitespace) =>
        {
            Ok(trimmed.to_ascii_lowercase())
        }
        _ => Err(DomainError::validation(format!(
            "`{trimmed}` is not a valid email address"
        ))),
    }
}

pub fn web_url(field: &'static str, value: &str) -> Result<String, DomainError> {
    let parsed = Url::parse(value.trim())
        .map_err(|err| DomainError::validation(format!("{field} is not a valid URL: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        other => Err(DomainError::validation(format!(
            "{field} must use http or https, not `{other}`"
        ))),
    }
}

pub fn non_negative(field: &'static str, value: i64) -> Result<i64, DomainError> {
    if value < 0 {
        Err(DomainError::validation(format!("{field} must not be negative")))
    } else {
        Ok(value)
    }
}

pub fn fee_range(min: Option<i64>, max: Option<i64>) -> Result<(), DomainError> {
    if let Some(min) = min {
        non_negative("fee_min_cents", min)?;
    }
    if let Some(max) = max {
        non_negative("fee_max_cents", max)?;
    }
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(DomainError::validation(
            "fee_min_cents must not exceed fee_max_cents",
        )),
        _ => Ok(()),
    }
}

pub fn rating(value: Option<i16>) -> Result<Option<i16>, DomainError> {
    match value {
        Some(rating) if !(1..=5).contains(&rating) => Err(DomainError::validation(
            "rating must be between 1 and 5",
        )),
        other => Ok(other),
    }
}

/// Trimmed, de-duplicated, non-empty topic or tag labels.
pub fn labels(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !out.iter().any(|seen| seen.eq_ignore_ascii_case(trimmed)) {
            out.push(trimmed.to_string());
        }
    }
    out
}
