//! Pipeline stage rules for deals.

use crate::domain::{error::DomainError, types::DealStage};

/// What a validated stage change does to `closed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedAtChange {
    Set,
    Clear,
    Keep,
}

/// Validate a stage change.
///
/// Open stages may move anywhere else, `won` is final and `lost` can only be
/// reopened as a fresh `lead`.
pub fn validate_stage_change(from: DealStage, to: DealStage) -> Result<ClosedAtChange, DomainError> {
    let reject = || DomainError::transition("deal", from.as_str(), to.as_str());

    if from == to {
        return Err(reject());
    }

    match from {
        DealStage::Won => Err(reject()),
        DealStage::Lost if to != DealStage::Lead => Err(reject()),
        DealStage::Lost => Ok(ClosedAtChange::Clear),
        _ if to.is_terminal() => Ok(ClosedAtChange::Set),
        _ => Ok(ClosedAtChange::Keep),
    }
}

/// Three upper-case ASCII letters.
pub fn validate_currency(currency: &str) -> Result<String, DomainError> {
    let trimmed = currency.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|ch| ch.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(DomainError::validation(format!(
            "currency `{currency}` must be a 3-letter code"
        )))
    }
}
