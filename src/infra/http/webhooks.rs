//! Inbound integrations authenticated by per-integration bearer secrets.
//!
//! An integration without a configured secret is not mounted at all from the
//! caller's point of view: every request answers 404.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
};
use lectern_api_types::{LeadWebhookPayload, OutrankWebhookPayload};

use crate::application::context::Services;
use crate::application::tokens::BearerSecret;

use super::api::error::ApiError;
use super::api::middleware::bearer_token;
use super::{
    RouterState,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct WebhookState {
    pub services: Arc<Services>,
    pub outrank_secret: Option<BearerSecret>,
    pub leads_secret: Option<BearerSecret>,
}

pub fn build_webhook_router(state: RouterState) -> Router<RouterState> {
    let webhooks = state.webhooks.clone();
    Router::new()
        .route(
            "/webhooks/outrank",
            post(outrank).route_layer(middleware::from_fn_with_state(
                webhooks.clone(),
                require_outrank_secret,
            )),
        )
        .route(
            "/webhooks/leads",
            post(leads).route_layer(middleware::from_fn_with_state(
                webhooks,
                require_leads_secret,
            )),
        )
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

fn authorize(secret: Option<&BearerSecret>, headers: &HeaderMap) -> Result<(), ApiError> {
    let secret = secret.ok_or_else(|| ApiError::not_found("Webhook not configured"))?;
    match bearer_token(headers.get(AUTHORIZATION)) {
        Some(token) if secret.verify(token) => Ok(()),
        Some(_) => Err(ApiError::unauthorized("Webhook token rejected")),
        None => Err(ApiError::unauthorized("Webhook token required")),
    }
}

/// Runs ahead of body extraction so unauthenticated callers never reach the
/// payload parser.
async fn require_outrank_secret(
    State(state): State<WebhookState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match authorize(state.outrank_secret.as_ref(), request.headers()) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn require_leads_secret(
    State(state): State<WebhookState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match authorize(state.leads_secret.as_ref(), request.headers()) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn outrank(
    State(state): State<WebhookState>,
    Json(payload): Json<OutrankWebhookPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.services.outrank.ingest(payload).await?;
    Ok(Json(report))
}

async fn leads(
    State(state): State<WebhookState>,
    Json(payload): Json<LeadWebhookPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state.services.leads.receive(payload).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
