pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::RouterState;
use crate::infra::http::middleware::log_responses;

pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let auth_state = state.clone();
    let rate_state = state.clone();

    Router::new()
        .route(
            "/api/v1/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route(
            "/api/v1/clients/{id}",
            get(handlers::get_client)
                .patch(handlers::update_client)
                .delete(handlers::delete_client),
        )
        .route(
            "/api/v1/clients/{id}/portal-token",
            post(handlers::rotate_client_portal_token),
        )
        .route(
            "/api/v1/speakers",
            get(handlers::list_speakers).post(handlers::create_speaker),
        )
        .route(
            "/api/v1/speakers/{id}",
            get(handlers::get_speaker).patch(handlers::update_speaker),
        )
        .route(
            "/api/v1/speakers/{id}/active",
            post(handlers::set_speaker_active),
        )
        .route(
            "/api/v1/speakers/{id}/portal-token",
            post(handlers::rotate_speaker_portal_token),
        )
        .route(
            "/api/v1/deals",
            get(handlers::list_deals).post(handlers::create_deal),
        )
        .route(
            "/api/v1/deals/{id}",
            get(handlers::get_deal)
                .patch(handlers::update_deal)
                .delete(handlers::delete_deal),
        )
        .route("/api/v1/deals/{id}/stage", post(handlers::change_deal_stage))
        .route(
            "/api/v1/contracts",
            get(handlers::list_contracts).post(handlers::create_contract),
        )
        .route(
            "/api/v1/contracts/{id}",
            get(handlers::get_contract).patch(handlers::update_contract),
        )
        .route("/api/v1/contracts/{id}/send", post(handlers::send_contract))
        .route(
            "/api/v1/contracts/{id}/cancel",
            post(handlers::cancel_contract),
        )
        .route(
            "/api/v1/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/v1/tasks/{id}",
            get(handlers::get_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/api/v1/tasks/{id}/status", post(handlers::set_task_status))
        .route(
            "/api/v1/newsletter/subscribers",
            get(handlers::list_subscribers),
        )
        .route(
            "/api/v1/newsletter/subscribers/{id}",
            axum::routing::delete(handlers::delete_subscriber),
        )
        .route(
            "/api/v1/newsletter/campaigns",
            get(handlers::list_campaigns).post(handlers::create_campaign),
        )
        .route(
            "/api/v1/newsletter/campaigns/{id}",
            get(handlers::get_campaign)
                .patch(handlers::update_campaign)
                .delete(handlers::delete_campaign),
        )
        .route(
            "/api/v1/newsletter/campaigns/{id}/preview",
            get(handlers::preview_campaign),
        )
        .route(
            "/api/v1/newsletter/campaigns/{id}/send",
            post(handlers::send_campaign),
        )
        .route("/api/v1/articles", get(handlers::list_articles))
        .route(
            "/api/v1/articles/{id}",
            get(handlers::get_article).delete(handlers::delete_article),
        )
        .route(
            "/api/v1/articles/{id}/status",
            post(handlers::set_article_status),
        )
        .route(
            "/api/v1/conferences",
            get(handlers::list_conferences).post(handlers::create_conference),
        )
        .route(
            "/api/v1/conferences/{id}",
            get(handlers::get_conference)
                .patch(handlers::update_conference)
                .delete(handlers::delete_conference),
        )
        .route(
            "/api/v1/workshops",
            get(handlers::list_workshops).post(handlers::create_workshop),
        )
        .route(
            "/api/v1/workshops/{id}",
            get(handlers::get_workshop)
                .patch(handlers::update_workshop)
                .delete(handlers::delete_workshop),
        )
        .route(
            "/api/v1/vendors",
            get(handlers::list_vendors).post(handlers::create_vendor),
        )
        .route(
            "/api/v1/vendors/{id}",
            get(handlers::get_vendor)
                .patch(handlers::update_vendor)
                .delete(handlers::delete_vendor),
        )
        .route("/api/v1/analytics/summary", get(handlers::analytics_summary))
        .route("/api/v1/activity", get(handlers::list_activity))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            rate_state,
            middleware::api_rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::api_auth,
        ))
        .layer(axum_middleware::from_fn(log_responses))
}
