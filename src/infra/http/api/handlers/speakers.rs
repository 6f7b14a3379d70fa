//! Speaker handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lectern_api_types::{SpeakerCreateRequest, SpeakerUpdateRequest};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::SpeakerQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{SpeakerActiveRequest, SpeakerListQuery};
use crate::infra::http::api::state::{Actor, ApiState};

use super::page_request;

pub async fn list_speakers(
    State(state): State<ApiState>,
    Query(query): Query<SpeakerListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let filter = SpeakerQueryFilter {
        search: query.search,
        active: query.active,
    };
    Ok(Json(state.services.speakers.list(&filter, page).await?))
}

pub async fn get_speaker(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.speakers.get(id).await?))
}

pub async fn create_speaker(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<SpeakerCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let speaker = state
        .services
        .speakers
        .create(actor.as_str(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(speaker)))
}

pub async fn update_speaker(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SpeakerUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let speaker = state
        .services
        .speakers
        .update(actor.as_str(), id, payload)
        .await?;
    Ok(Json(speaker))
}

pub async fn set_speaker_active(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SpeakerActiveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let speaker = state
        .services
        .speakers
        .set_active(actor.as_str(), id, payload.active)
        .await?;
    Ok(Json(speaker))
}

pub async fn rotate_speaker_portal_token(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let speaker = state
        .services
        .speakers
        .rotate_portal_token(actor.as_str(), id)
        .await?;
    Ok(Json(speaker))
}
