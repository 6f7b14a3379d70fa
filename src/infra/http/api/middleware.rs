use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::error::ApiError;
use super::rate_limit::RateDecision;
use super::state::{ACTOR_HEADER, Actor, ApiState};

pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers().get(axum::http::header::AUTHORIZATION)) {
        Some(token) => token,
        None => return ApiError::unauthorized("Admin token required").into_response(),
    };
    if !state.admin_token.verify(token) {
        return ApiError::unauthorized("Admin token rejected").into_response();
    }

    let actor = Actor::from_header(
        request
            .headers()
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok()),
    );
    request.extensions_mut().insert(actor.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(actor);
    response
}

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    if request.extensions().get::<Actor>().is_none() {
        warn!(
            target = "lectern::api::ratelimit",
            "missing actor in rate limit middleware"
        );
        return ApiError::unauthorized("Admin token required").into_response();
    }

    // Keyed on the verified credential; `X-Actor` is caller-chosen.
    let caller = state.admin_token.fingerprint();
    if state.rate_limiter.check(&caller, &route) == RateDecision::Limited {
        metrics::counter!("lectern_api_rate_limited_total").increment(1);
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    next.run(request).await
}

/// `Authorization: Bearer <token>` value, if present and well formed.
pub(crate) fn bearer_token(header: Option<&axum::http::HeaderValue>) -> Option<&str> {
    let raw = header?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
