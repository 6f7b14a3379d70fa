use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use lectern_api_types::{ContractSignRequest, SubscribeRequest};
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::application::context::Services;
use crate::application::directory::{ConferenceSearch, WorkshopSearch};

use super::api::error::ApiError;
use super::api::handlers::{page_request, today};
use super::api::models::{ConferenceListQuery, CursorQuery, WorkshopListQuery};
use super::{
    RouterState, db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub services: Arc<Services>,
}

pub fn build_public_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/_health/db", get(health_db))
        .route("/conferences", get(list_conferences))
        .route("/conferences/categories", get(conference_categories))
        .route("/conferences/{slug}", get(conference_detail))
        .route("/workshops", get(list_workshops))
        .route("/workshops/{slug}", get(workshop_detail))
        .route("/articles", get(list_articles))
        .route("/articles/{slug}", get(article_detail))
        .route("/newsletter/subscribe", post(subscribe))
        .route("/newsletter/unsubscribe/{token}", post(unsubscribe))
        .route("/contracts/view/{token}", get(view_contract))
        .route("/contracts/view/{token}/sign", post(sign_contract))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn health_db(State(state): State<HttpState>) -> impl IntoResponse {
    db_health_response(state.services.health.ping().await)
}

async fn list_conferences(
    State(state): State<HttpState>,
    Query(query): Query<ConferenceListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<Date>(query.limit, query.cursor.as_deref())?;
    let search = ConferenceSearch {
        search: query.search,
        category: query.category,
        country: query.country,
        include_past: query.include_past.unwrap_or(false),
    };
    let conferences = state
        .services
        .directory
        .conferences(search, today(), page)
        .await?;
    Ok(Json(conferences))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoriesQuery {
    include_past: Option<bool>,
}

async fn conference_categories(
    State(state): State<HttpState>,
    Query(query): Query<CategoriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .directory
        .conference_categories(today(), query.include_past.unwrap_or(false))
        .await?;
    Ok(Json(categories))
}

async fn conference_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.directory.conference(&slug).await?))
}

async fn list_workshops(
    State(state): State<HttpState>,
    Query(query): Query<WorkshopListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let search = WorkshopSearch {
        format: query.format,
        speaker_slug: query.speaker,
        search: query.search,
    };
    Ok(Json(state.services.directory.workshops(search, page).await?))
}

async fn workshop_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.directory.workshop(&slug).await?))
}

async fn list_articles(
    State(state): State<HttpState>,
    Query(query): Query<CursorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    Ok(Json(state.services.directory.articles(page).await?))
}

async fn article_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.directory.article(&slug).await?))
}

/// Idempotent: every accepted address answers 200 with its status.
async fn subscribe(
    State(state): State<HttpState>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.newsletter.subscribe(payload).await?))
}

async fn unsubscribe(
    State(state): State<HttpState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let subscriber = state.services.newsletter.unsubscribe(&token).await?;
    Ok(Json(serde_json::json!({
        "email": subscriber.email,
        "status": subscriber.status,
    })))
}

async fn view_contract(
    State(state): State<HttpState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.contracts.view_by_token(&token).await?))
}

async fn sign_contract(
    State(state): State<HttpState>,
    Path(token): Path<String>,
    Json(payload): Json<ContractSignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = state
        .services
        .contracts
        .sign_by_token(&token, &payload.signer_name)
        .await?;
    Ok(Json(contract))
}
