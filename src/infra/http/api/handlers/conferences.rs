//! Conference directory administration

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lectern_api_types::{ConferenceCreateRequest, ConferenceUpdateRequest};
use time::Date;
use uuid::Uuid;

use crate::application::repos::ConferenceQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::ConferenceListQuery;
use crate::infra::http::api::state::{Actor, ApiState};

use super::{page_request, today};

/// Admins see drafts and past events unless `include_past=false`.
pub async fn list_conferences(
    State(state): State<ApiState>,
    Query(query): Query<ConferenceListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<Date>(query.limit, query.cursor.as_deref())?;
    let filter = ConferenceQueryFilter {
        published_only: false,
        search: query.search,
        category: query.category,
        country: query.country,
        ending_from: (!query.include_past.unwrap_or(true)).then(today),
    };
    Ok(Json(state.services.conferences.list(&filter, page).await?))
}

pub async fn get_conference(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.conferences.get(id).await?))
}

pub async fn create_conference(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ConferenceCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = state
        .services
        .conferences
        .create(actor.as_str(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(conference)))
}

pub async fn update_conference(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConferenceUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conference = state
        .services
        .conferences
        .update(actor.as_str(), id, payload)
        .await?;
    Ok(Json(conference))
}

pub async fn delete_conference(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .conferences
        .delete(actor.as_str(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
