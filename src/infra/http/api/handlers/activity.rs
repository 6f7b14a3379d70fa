use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use time::OffsetDateTime;

use crate::application::repos::ActivityQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::ActivityListQuery;
use crate::infra::http::api::state::ApiState;

use super::page_request;

pub async fn list_activity(
    State(state): State<ApiState>,
    Query(query): Query<ActivityListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let filter = ActivityQueryFilter {
        actor: query.actor,
        action: query.action,
        entity_type: query.entity_type,
        search: query.search,
    };
    Ok(Json(state.services.activity.list_filtered(page, &filter).await?))
}
