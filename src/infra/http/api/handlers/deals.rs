//! Deal pipeline handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lectern_api_types::{DealCreateRequest, DealStageRequest, DealUpdateRequest};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::DealQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::DealListQuery;
use crate::infra::http::api::state::{Actor, ApiState};

use super::page_request;

pub async fn list_deals(
    State(state): State<ApiState>,
    Query(query): Query<DealListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let filter = DealQueryFilter {
        stage: query.stage,
        client_id: query.client_id,
        speaker_id: query.speaker_id,
        search: query.search,
    };
    Ok(Json(state.services.deals.list(&filter, page).await?))
}

pub async fn get_deal(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.deals.get(id).await?))
}

pub async fn create_deal(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<DealCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deal = state.services.deals.create(actor.as_str(), payload).await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

pub async fn update_deal(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DealUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deal = state
        .services
        .deals
        .update(actor.as_str(), id, payload)
        .await?;
    Ok(Json(deal))
}

pub async fn change_deal_stage(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DealStageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deal = state
        .services
        .deals
        .change_stage(actor.as_str(), id, payload.stage)
        .await?;
    Ok(Json(deal))
}

pub async fn delete_deal(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.deals.delete(actor.as_str(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
