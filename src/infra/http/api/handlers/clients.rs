//! Client handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lectern_api_types::{ClientCreateRequest, ClientUpdateRequest};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::ClientQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::SearchListQuery;
use crate::infra::http::api::state::{Actor, ApiState};

use super::page_request;

pub async fn list_clients(
    State(state): State<ApiState>,
    Query(query): Query<SearchListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let filter = ClientQueryFilter {
        search: query.search,
    };
    let clients = state.services.clients.list(&filter, page).await?;
    Ok(Json(clients))
}

pub async fn get_client(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.clients.get(id).await?))
}

pub async fn create_client(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ClientCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state
        .services
        .clients
        .create(actor.as_str(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state
        .services
        .clients
        .update(actor.as_str(), id, payload)
        .await?;
    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.clients.delete(actor.as_str(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rotate_client_portal_token(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state
        .services
        .clients
        .rotate_portal_token(actor.as_str(), id)
        .await?;
    Ok(Json(client))
}
