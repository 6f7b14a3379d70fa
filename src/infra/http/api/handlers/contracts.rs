//! Contract lifecycle handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lectern_api_types::{ContractCreateRequest, ContractSendRequest, ContractUpdateRequest};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::ContractQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::ContractListQuery;
use crate::infra::http::api::state::{Actor, ApiState};

use super::page_request;

pub async fn list_contracts(
    State(state): State<ApiState>,
    Query(query): Query<ContractListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let filter = ContractQueryFilter {
        status: query.status,
        deal_id: query.deal_id,
    };
    Ok(Json(state.services.contracts.list(&filter, page).await?))
}

pub async fn get_contract(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.contracts.get(id).await?))
}

pub async fn create_contract(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ContractCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = state
        .services
        .contracts
        .create(actor.as_str(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

pub async fn update_contract(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContractUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = state
        .services
        .contracts
        .update(actor.as_str(), id, payload)
        .await?;
    Ok(Json(contract))
}

/// An empty body sends with the default validity window.
pub async fn send_contract(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ContractSendRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let contract = state
        .services
        .contracts
        .send(actor.as_str(), id, request)
        .await?;
    Ok(Json(contract))
}

pub async fn cancel_contract(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let contract = state
        .services
        .contracts
        .cancel(actor.as_str(), id)
        .await?;
    Ok(Json(contract))
}
