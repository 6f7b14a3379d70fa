//! Task handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lectern_api_types::{TaskCreateRequest, TaskStatusRequest, TaskUpdateRequest};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::TaskQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::TaskListQuery;
use crate::infra::http::api::state::{Actor, ApiState};

use super::{page_request, today};

pub async fn list_tasks(
    State(state): State<ApiState>,
    Query(query): Query<TaskListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<(Option<Date>, OffsetDateTime)>(query.limit, query.cursor.as_deref())?;
    let filter = TaskQueryFilter {
        status: query.status,
        assignee: query.assignee,
        priority: query.priority,
        deal_id: query.deal_id,
        overdue_before: query.overdue.unwrap_or(false).then(today),
    };
    Ok(Json(state.services.tasks.list(&filter, page).await?))
}

pub async fn get_task(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.tasks.get(id).await?))
}

pub async fn create_task(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<TaskCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.services.tasks.create(actor.as_str(), payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .services
        .tasks
        .update(actor.as_str(), id, payload)
        .await?;
    Ok(Json(task))
}

pub async fn set_task_status(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaskStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .services
        .tasks
        .set_status(actor.as_str(), id, payload.status)
        .await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.tasks.delete(actor.as_str(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
