use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("`{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("invariant violated: {message}")]
    Invariant { message: String },
    #[error("cannot move {entity} from `{from}` to `{to}`")]
    Transition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    pub fn transition(entity: &'static str, from: &'static str, to: &'static str) -> Self {
        Self::Transition { entity, from, to }
    }
}
