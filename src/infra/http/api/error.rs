use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::admin::analytics::AnalyticsError;
use crate::application::admin::articles::AdminArticleError;
use crate::application::admin::clients::AdminClientError;
use crate::application::admin::conferences::AdminConferenceError;
use crate::application::admin::contracts::ContractError;
use crate::application::admin::deals::AdminDealError;
use crate::application::admin::newsletter::NewsletterError;
use crate::application::admin::speakers::AdminSpeakerError;
use crate::application::admin::tasks::AdminTaskError;
use crate::application::admin::vendors::AdminVendorError;
use crate::application::admin::workshops::AdminWorkshopError;
use crate::application::directory::DirectoryError;
use crate::application::error::ErrorReport;
use crate::application::pagination::PaginationError;
use crate::application::portal::PortalError;
use crate::application::repos::RepoError;
use crate::application::webhooks::WebhookError;
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_CURSOR: &str = "invalid_cursor";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const VALIDATION: &str = "validation_failed";
    pub const INVALID_TRANSITION: &str = "invalid_transition";
    pub const CONFLICT: &str = "conflict";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const RENDER: &str = "render_error";
    pub const CLIENT_IN_USE: &str = "client_in_use";
    pub const DEAL_HAS_CONTRACTS: &str = "deal_has_contracts";
    pub const NO_RECIPIENTS: &str = "no_recipients";
    pub const UNSUPPORTED_EVENT: &str = "unsupported_event";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, message, None)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn invalid_cursor(err: PaginationError) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_CURSOR,
            "Invalid cursor",
            Some(err.to_string()),
        )
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: codes::RATE_LIMITED.to_string(),
                message: "Rate limit exceeded".to_string(),
                hint: Some(format!("Retry after {retry_after} seconds")),
            },
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::api::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        )
        .attach(&mut response);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, hint.as_deref().unwrap_or(self.message)),
        )
        .attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => Self::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::Pagination(p) => Self::invalid_cursor(p),
            RepoError::NotFound => Self::not_found("Resource not found"),
            RepoError::InvalidInput { message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => Self::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(msg) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(msg),
            ),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let hint = Some(err.to_string());
        match err {
            DomainError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, "Resource not found", hint)
            }
            DomainError::Validation { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::VALIDATION,
                "Validation failed",
                hint,
            ),
            DomainError::Invariant { .. } => {
                Self::new(StatusCode::CONFLICT, codes::CONFLICT, "Request conflicts with current state", hint)
            }
            DomainError::Transition { .. } => Self::new(
                StatusCode::CONFLICT,
                codes::INVALID_TRANSITION,
                "Status change not allowed",
                hint,
            ),
        }
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        Self::invalid_cursor(err)
    }
}

/// Services whose errors are only ever domain or repository failures.
macro_rules! domain_or_repo {
    ($($error:ident),+ $(,)?) => {
        $(
            impl From<$error> for ApiError {
                fn from(err: $error) -> Self {
                    match err {
                        $error::Domain(err) => err.into(),
                        $error::Repo(err) => err.into(),
                    }
                }
            }
        )+
    };
}

domain_or_repo!(
    AnalyticsError,
    AdminArticleError,
    AdminConferenceError,
    AdminSpeakerError,
    AdminTaskError,
    AdminVendorError,
    AdminWorkshopError,
    ContractError,
);

impl From<AdminClientError> for ApiError {
    fn from(err: AdminClientError) -> Self {
        match err {
            AdminClientError::InUse { count } => Self::new(
                StatusCode::CONFLICT,
                codes::CLIENT_IN_USE,
                "Client still has deals",
                Some(format!("{count} deals reference this client")),
            ),
            AdminClientError::Domain(err) => err.into(),
            AdminClientError::Repo(err) => err.into(),
        }
    }
}

impl From<AdminDealError> for ApiError {
    fn from(err: AdminDealError) -> Self {
        match err {
            AdminDealError::HasContracts { count } => Self::new(
                StatusCode::CONFLICT,
                codes::DEAL_HAS_CONTRACTS,
                "Deal still has contracts",
                Some(format!("{count} contracts reference this deal")),
            ),
            AdminDealError::Domain(err) => err.into(),
            AdminDealError::Repo(err) => err.into(),
        }
    }
}

impl From<NewsletterError> for ApiError {
    fn from(err: NewsletterError) -> Self {
        match err {
            NewsletterError::NoRecipients => Self::new(
                StatusCode::CONFLICT,
                codes::NO_RECIPIENTS,
                "Campaign has no recipients",
                Some(err.to_string()),
            ),
            NewsletterError::Template(err) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::RENDER,
                "Failed to render campaign",
                Some(err.to_string()),
            ),
            NewsletterError::Domain(err) => err.into(),
            NewsletterError::Repo(err) => err.into(),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(_) => Self::new(
                StatusCode::NOT_FOUND,
                codes::NOT_FOUND,
                "Resource not found",
                Some(err.to_string()),
            ),
            DirectoryError::Repo(err) => err.into(),
        }
    }
}

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        match err {
            PortalError::NotFound => Self::not_found("Portal not found"),
            PortalError::Domain(err) => err.into(),
            PortalError::Repo(err) => err.into(),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::UnsupportedEvent(event) => Self::new(
                StatusCode::BAD_REQUEST,
                codes::UNSUPPORTED_EVENT,
                "Unsupported event type",
                Some(event),
            ),
            WebhookError::Domain(err) => err.into(),
            WebhookError::Repo(err) => err.into(),
        }
    }
}
