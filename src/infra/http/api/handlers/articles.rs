//! Ingested article moderation handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lectern_api_types::ArticleStatusRequest;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::ArticleQueryFilter;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::ArticleListQuery;
use crate::infra::http::api::state::{Actor, ApiState};

use super::page_request;

pub async fn list_articles(
    State(state): State<ApiState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request::<OffsetDateTime>(query.limit, query.cursor.as_deref())?;
    let filter = ArticleQueryFilter {
        status: query.status,
        search: query.search,
    };
    Ok(Json(state.services.articles.list(&filter, page).await?))
}

pub async fn get_article(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.articles.get(id).await?))
}

pub async fn set_article_status(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ArticleStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state
        .services
        .articles
        .set_status(actor.as_str(), id, payload.status)
        .await?;
    Ok(Json(article))
}

pub async fn delete_article(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.articles.delete(actor.as_str(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
