//! Contract lifecycle rules and numbering.

use time::{Duration, OffsetDateTime};

use crate::domain::{error::DomainError, types::ContractStatus};

pub const DEFAULT_VALIDITY_DAYS: u16 = 14;
pub const MAX_VALIDITY_DAYS: u16 = 365;

/// Validate a manual or scheduled status change.
pub fn validate_status_change(
    from: ContractStatus,
    to: ContractStatus,
) -> Result<(), DomainError> {
    use ContractStatus::*;

    match (from, to) {
        (Draft, Sent) | (Sent, Signed) | (Draft, Cancelled) | (Sent, Cancelled) | (Sent, Expired) => {
            Ok(())
        }
        _ => Err(DomainError::transition(
            "contract",
            from.as_str(),
            to.as_str(),
        )),
    }
}

/// `CT-{year}-{seq:04}` where `seq` counts contracts already numbered that year.
pub fn contract_number(year: i32, existing_in_year: u64) -> String {
    format!("CT-{year}-{:04}", existing_in_year + 1)
}

pub fn expiry_for(sent_at: OffsetDateTime, validity_days: Option<u16>) -> Result<OffsetDateTime, DomainError> {
    let days = validity_days.unwrap_or(DEFAULT_VALIDITY_DAYS);
    if days == 0 || days > MAX_VALIDITY_DAYS {
        return Err(DomainError::validation(format!(
            "validity_days must be between 1 and {MAX_VALIDITY_DAYS}"
        )));
    }
    Ok(sent_at + Duration::days(i64::from(days)))
}

/// A viewer may sign only a sent contract that has not yet lapsed.
pub fn ensure_signable(
    status: ContractStatus,
    expires_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Result<(), DomainError> {
    validate_status_change(status, ContractStatus::Signed)?;
    match expires_at {
        Some(deadline) if deadline <= now => Err(DomainError::invariant(
            "contract offer has expired",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn allowed_transitions() {
        use ContractStatus::*;
        assert!(validate_status_change(Draft, Sent).is_ok());
        assert!(validate_status_change(Sent, Signed).is_ok());
        assert!(validate_status_change(Sent, Expired).is_ok());
        assert!(validate_status_change(Draft, Cancelled).is_ok());
        assert!(validate_status_change(Sent, Cancelled).is_ok());
    }

    #[test]
    fn rejected_transitions() {
        use ContractStatus::*;
        assert!(validate_status_change(Draft, Signed).is_err());
        assert!(validate_status_change(Signed, Cancelled).is_err());
        assert!(validate_status_change(Expired, Sent).is_err());
        assert!(validate_status_change(Cancelled, Draft).is_err());
        assert!(validate_status_change(Draft, Expired).is_err());
    }

    #[test]
    fn numbers_are_zero_padded_per_year() {
        assert_eq!(contract_number(2026, 0), "CT-2026-0001");
        assert_eq!(contract_number(2026, 41), "CT-2026-0042");
        assert_eq!(contract_number(2027, 12345), "CT-2027-12346");
    }

    #[test]
    fn expiry_defaults_to_two_weeks() {
        let sent = datetime!(2026-03-01 10:00 UTC);
        assert_eq!(expiry_for(sent, None).unwrap(), datetime!(2026-03-15 10:00 UTC));
        assert_eq!(expiry_for(sent, Some(1)).unwrap(), datetime!(2026-03-02 10:00 UTC));
        assert!(expiry_for(sent, Some(0)).is_err());
    }

    #[test]
    fn signing_requires_sent_and_unexpired() {
        let now = datetime!(2026-03-10 12:00 UTC);
        let later = datetime!(2026-03-11 12:00 UTC);
        let earlier = datetime!(2026-03-09 12:00 UTC);

        assert!(ensure_signable(ContractStatus::Sent, Some(later), now).is_ok());
        assert!(ensure_signable(ContractStatus::Sent, Some(earlier), now).is_err());
        assert!(ensure_signable(ContractStatus::Draft, Some(later), now).is_err());
        assert!(ensure_signable(ContractStatus::Signed, None, now).is_err());
    }
}
