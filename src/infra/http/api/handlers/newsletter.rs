//! Newsletter subscriber and campaign handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use lectern_api_types::{CampaignCreateRequest, CampaignUpdateRequest};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::SubscriberQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{CursorQuery, SubscriberListQuery};
use crate::infra::http::api::state::{Actor, ApiState};

use super::page_request;

pub async fn list_subscribers(
    State(state): State<ApiState>,
    Query(query): Query<SubscriberListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let filter = SubscriberQueryFilter {
        status: query.status,
        search: query.search,
    };
    let subscribers = state
        .services
        .newsletter
        .list_subscribers(&filter, page)
        .await?;
    Ok(Json(subscribers))
}

pub async fn delete_subscriber(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .newsletter
        .delete_subscriber(actor.as_str(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_campaigns(
    State(state): State<ApiState>,
    Query(query): Query<CursorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    Ok(Json(state.services.newsletter.list_campaigns(page).await?))
}

pub async fn get_campaign(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.newsletter.get_campaign(id).await?))
}

pub async fn create_campaign(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CampaignCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = state
        .services
        .newsletter
        .create_campaign(actor.as_str(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn update_campaign(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CampaignUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = state
        .services
        .newsletter
        .update_campaign(actor.as_str(), id, payload)
        .await?;
    Ok(Json(campaign))
}

pub async fn delete_campaign(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .newsletter
        .delete_campaign(actor.as_str(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn preview_campaign(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let html = state.services.newsletter.preview_campaign(id).await?;
    Ok(Html(html))
}

pub async fn send_campaign(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = state
        .services
        .newsletter
        .send_campaign(actor.as_str(), id)
        .await?;
    Ok(Json(campaign))
}
