use std::sync::Arc;

use crate::application::context::Services;
use crate::application::tokens::BearerSecret;

use super::rate_limit::ApiRateLimiter;

pub const ACTOR_HEADER: &str = "x-actor";
pub const DEFAULT_ACTOR: &str = "admin";

#[derive(Clone)]
pub struct ApiState {
    pub services: Arc<Services>,
    pub admin_token: BearerSecret,
    pub rate_limiter: Arc<ApiRateLimiter>,
}

/// Label recorded in the activity log for the caller of an admin request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    /// Header value trimmed and capped; blank or missing means the default.
    pub fn from_header(value: Option<&str>) -> Self {
        let label = value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.chars().take(64).collect::<String>())
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        Self(label)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
