pub mod api;
mod middleware;
mod portal;
mod public;
mod webhooks;

pub use api::rate_limit::ApiRateLimiter;
pub use api::{ApiState, build_api_router as build_api_v1_router};
pub use public::{HttpState, build_public_router};
pub use webhooks::WebhookState;

use axum::Router;
use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

use api::error::ApiError;

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub webhooks: WebhookState,
    pub api: ApiState,
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for WebhookState {
    fn from_ref(state: &RouterState) -> Self {
        state.webhooks.clone()
    }
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// Every surface merged into one router: public, portal, webhooks and the
/// admin API.
pub fn build_router(state: RouterState) -> Router {
    Router::new()
        .merge(public::build_public_router(state.clone()))
        .merge(portal::build_portal_router(state.clone()))
        .merge(webhooks::build_webhook_router(state.clone()))
        .merge(api::build_api_router(state.clone()))
        .fallback(fallback)
        .with_state(state)
}

async fn fallback() -> ApiError {
    ApiError::not_found("Route not found")
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::application::testing::{MemoryStore, services};
    use crate::application::tokens::BearerSecret;

    const TOKEN: &str = "admin-token-0123456789abcdef";

    fn router_with(store: &Arc<MemoryStore>, max_requests: u32) -> Router {
        let services = Arc::new(services(store));
        let state = RouterState {
            http: HttpState {
                services: services.clone(),
            },
            webhooks: WebhookState {
                services: services.clone(),
                outrank_secret: None,
                leads_secret: Some(BearerSecret::new("lead-secret")),
            },
            api: ApiState {
                services,
                admin_token: BearerSecret::new(TOKEN),
                rate_limiter: Arc::new(ApiRateLimiter::new(
                    Duration::from_secs(60),
                    NonZeroU32::new(max_requests).unwrap(),
                )),
            },
        };
        build_router(state)
    }

    fn router(store: &Arc<MemoryStore>) -> Router {
        router_with(store, 100)
    }

    fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_answers_no_content() {
        let store = MemoryStore::shared();
        let response = router(&store)
            .oneshot(request(Method::GET, "/_health/db", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn admin_routes_require_the_bearer_token() {
        let store = MemoryStore::shared();
        let app = router(&store);

        let missing = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/clients", None, None))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .oneshot(request(Method::GET, "/api/v1/clients", Some("nope"), None))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(wrong).await;
        assert_eq!(body["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn create_client_records_the_actor_header() {
        let store = MemoryStore::shared();
        let mut create = request(
            Method::POST,
            "/api/v1/clients",
            Some(TOKEN),
            Some(json!({ "name": "Acme Events", "email": "Ops@Acme.test" })),
        );
        create
            .headers_mut()
            .insert("x-actor", "dana".parse().unwrap());

        let response = router(&store).oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["email"], "ops@acme.test");
        assert_eq!(store.activity.actors(), vec!["dana".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_client_email_is_a_conflict() {
        let store = MemoryStore::shared();
        store.seed_client("taken@acme.test");
        let response = router(&store)
            .oneshot(request(
                Method::POST,
                "/api/v1/clients",
                Some(TOKEN),
                Some(json!({ "name": "Again", "email": "taken@acme.test" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn malformed_cursor_is_rejected() {
        let store = MemoryStore::shared();
        let response = router(&store)
            .oneshot(request(
                Method::GET,
                "/api/v1/deals?cursor=not-a-cursor",
                Some(TOKEN),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "invalid_cursor");
    }

    #[tokio::test]
    async fn rate_limit_applies_per_route() {
        let store = MemoryStore::shared();
        let app = router_with(&store, 2);

        for _ in 0..2 {
            let ok = app
                .clone()
                .oneshot(request(Method::GET, "/api/v1/vendors", Some(TOKEN), None))
                .await
                .unwrap();
            assert_eq!(ok.status(), StatusCode::OK);
        }

        let limited = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/vendors", Some(TOKEN), None))
            .await
            .unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.headers()[header::RETRY_AFTER], "60");

        let other_route = app
            .oneshot(request(Method::GET, "/api/v1/tasks", Some(TOKEN), None))
            .await
            .unwrap();
        assert_eq!(other_route.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rotating_the_actor_header_does_not_reset_the_limit() {
        let store = MemoryStore::shared();
        let app = router_with(&store, 2);

        for (index, actor) in ["ana", "ben", "cleo"].into_iter().enumerate() {
            let mut list = request(Method::GET, "/api/v1/vendors", Some(TOKEN), None);
            list.headers_mut().insert("x-actor", actor.parse().unwrap());
            let response = app.clone().oneshot(list).await.unwrap();
            let expected = if index < 2 {
                StatusCode::OK
            } else {
                StatusCode::TOO_MANY_REQUESTS
            };
            assert_eq!(response.status(), expected, "request as {actor}");
        }
    }

    #[tokio::test]
    async fn draft_contracts_are_hidden_from_the_viewer() {
        let store = MemoryStore::shared();
        let client = store.seed_client("buyer@acme.test");
        let deal = store.seed_deal(client.id, None);
        let contract = store.seed_contract(deal.id);

        let response = router(&store)
            .oneshot(request(
                Method::GET,
                &format!("/contracts/view/{}", contract.view_token),
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn subscribe_is_idempotent() {
        let store = MemoryStore::shared();
        let app = router(&store);
        let payload = json!({ "email": "reader@example.com" });

        let first = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/newsletter/subscribe",
                None,
                Some(payload.clone()),
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first = json_body(first).await;
        assert_eq!(first["status"], "active");
        assert_eq!(first["outcome"], "created");

        let again = app
            .oneshot(request(
                Method::POST,
                "/newsletter/subscribe",
                None,
                Some(payload),
            ))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::OK);
        assert_eq!(json_body(again).await["outcome"], "already_active");
    }

    #[tokio::test]
    async fn unconfigured_webhook_is_not_found() {
        let store = MemoryStore::shared();
        let response = router(&store)
            .oneshot(request(
                Method::POST,
                "/webhooks/outrank",
                Some("anything"),
                Some(json!({ "event_type": "publish_articles" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lead_webhook_checks_its_secret() {
        let store = MemoryStore::shared();
        let app = router(&store);
        let lead = json!({ "name": "Riley", "email": "riley@corp.test" });

        let rejected = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/webhooks/leads",
                Some("wrong"),
                Some(lead.clone()),
            ))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

        let accepted = app
            .oneshot(request(
                Method::POST,
                "/webhooks/leads",
                Some("lead-secret"),
                Some(lead),
            ))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn webhook_secrets_are_checked_before_the_body() {
        let store = MemoryStore::shared();
        let app = router(&store);

        let unauthenticated = app
            .clone()
            .oneshot(request(Method::POST, "/webhooks/leads", None, Some(json!({}))))
            .await
            .unwrap();
        assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(unauthenticated).await["error"]["code"], "unauthorized");

        let unconfigured = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/webhooks/outrank",
                None,
                Some(json!({ "nope": 1 })),
            ))
            .await
            .unwrap();
        assert_eq!(unconfigured.status(), StatusCode::NOT_FOUND);

        let malformed = app
            .oneshot(request(
                Method::POST,
                "/webhooks/leads",
                Some("lead-secret"),
                Some(json!({})),
            ))
            .await
            .unwrap();
        assert_eq!(malformed.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(store.activity.actors().is_empty());
    }

    #[tokio::test]
    async fn unknown_routes_answer_json_not_found() {
        let store = MemoryStore::shared();
        let response = router(&store)
            .oneshot(request(Method::GET, "/nowhere", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "not_found");
    }
}
