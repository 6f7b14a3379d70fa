//! Vendor directory handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lectern_api_types::{VendorCreateRequest, VendorUpdateRequest};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::VendorQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::VendorListQuery;
use crate::infra::http::api::state::{Actor, ApiState};

use super::page_request;

pub async fn list_vendors(
    State(state): State<ApiState>,
    Query(query): Query<VendorListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let filter = VendorQueryFilter {
        category: query.category,
        active: query.active,
        search: query.search,
    };
    Ok(Json(state.services.vendors.list(&filter, page).await?))
}

pub async fn get_vendor(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.vendors.get(id).await?))
}

pub async fn create_vendor(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<VendorCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let vendor = state
        .services
        .vendors
        .create(actor.as_str(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

pub async fn update_vendor(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VendorUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let vendor = state
        .services
        .vendors
        .update(actor.as_str(), id, payload)
        .await?;
    Ok(Json(vendor))
}

pub async fn delete_vendor(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.vendors.delete(actor.as_str(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
