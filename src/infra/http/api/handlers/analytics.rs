use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::application::admin::analytics::DateRange;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::AnalyticsQuery;
use crate::infra::http::api::state::ApiState;

use super::today;

pub async fn analytics_summary(
    State(state): State<ApiState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let today = today();
    let range = DateRange::resolve(query.from, query.to, today)?;
    Ok(Json(state.services.analytics.summary(range, today).await?))
}
