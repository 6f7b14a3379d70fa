use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;

/// Postgres SQLSTATE for `canceling statement due to statement timeout`.
const QUERY_CANCELED: &str = "57014";
/// Postgres SQLSTATE for malformed literals such as a bad enum value.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => {
            let code = db.code();
            match db.kind() {
                ErrorKind::UniqueViolation => RepoError::Duplicate {
                    constraint: db.constraint().unwrap_or("unknown").to_string(),
                },
                ErrorKind::ForeignKeyViolation | ErrorKind::CheckViolation => {
                    RepoError::InvalidInput {
                        message: db.message().to_string(),
                    }
                }
                ErrorKind::NotNullViolation => RepoError::Integrity {
                    message: db.message().to_string(),
                },
                _ if code.as_deref() == Some(QUERY_CANCELED) => RepoError::Timeout,
                _ if code.as_deref() == Some(INVALID_TEXT_REPRESENTATION) => {
                    RepoError::InvalidInput {
                        message: db.message().to_string(),
                    }
                }
                _ => RepoError::from_persistence(db.message()),
            }
        }
        other => RepoError::from_persistence(other),
    }
}
