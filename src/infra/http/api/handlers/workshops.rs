//! Workshop catalogue administration

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lectern_api_types::{WorkshopCreateRequest, WorkshopUpdateRequest};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::WorkshopQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::WorkshopListQuery;
use crate::infra::http::api::state::{Actor, ApiState};

use super::page_request;

pub async fn list_workshops(
    State(state): State<ApiState>,
    Query(query): Query<WorkshopListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let filter = WorkshopQueryFilter {
        published_only: false,
        format: query.format,
        speaker_slug: query.speaker,
        search: query.search,
    };
    Ok(Json(state.services.workshops.list(&filter, page).await?))
}

pub async fn get_workshop(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.workshops.get(id).await?))
}

pub async fn create_workshop(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<WorkshopCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let workshop = state
        .services
        .workshops
        .create(actor.as_str(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(workshop)))
}

pub async fn update_workshop(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<WorkshopUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let workshop = state
        .services
        .workshops
        .update(actor.as_str(), id, payload)
        .await?;
    Ok(Json(workshop))
}

pub async fn delete_workshop(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.workshops.delete(actor.as_str(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
