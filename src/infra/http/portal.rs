//! Token-addressed portals for clients and speakers.

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, patch},
};
use lectern_api_types::SpeakerProfilePatch;

use super::api::error::ApiError;
use super::public::HttpState;
use super::{
    RouterState,
    middleware::{log_responses, set_request_context},
};

pub fn build_portal_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/portal/client/{token}", get(client_portal))
        .route("/portal/speaker/{token}", get(speaker_portal))
        .route("/portal/speaker/{token}/profile", patch(update_speaker_profile))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn client_portal(
    State(state): State<HttpState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.portal.client_portal(&token).await?))
}

async fn speaker_portal(
    State(state): State<HttpState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.portal.speaker_portal(&token).await?))
}

async fn update_speaker_profile(
    State(state): State<HttpState>,
    Path(token): Path<String>,
    Json(patch): Json<SpeakerProfilePatch>,
) -> Result<impl IntoResponse, ApiError> {
    let speaker = state
        .services
        .portal
        .update_speaker_profile(&token, patch)
        .await?;
    Ok(Json(speaker))
}
