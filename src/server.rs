//! HTTP application assembly: routes, WebSocket endpoint and middleware.

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the complete application: REST under `/api/v1`, `/health`,
/// `/ws` and, with the `swagger-ui` feature, `/swagger-ui`.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let router = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        )
    };

    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::TokenIssuer;
    use crate::domain::EventBus;
    use crate::persistence::Repositories;

    fn app() -> Router {
        let tokens = Arc::new(TokenIssuer::new(
            "test-secret",
            Duration::from_secs(60),
            Duration::from_secs(600),
        ));
        let state = AppState::new(&Repositories::in_memory(), EventBus::new(16), tokens);
        build_app(state, Duration::from_secs(5))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("failed to read body");
        };
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    #[tokio::test]
    async fn health_is_public() {
        let Ok(request) = Request::get("/health").body(Body::empty()) else {
            panic!("bad request");
        };
        let Ok(response) = app().oneshot(request).await else {
            panic!("router failed");
        };
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.get("status"), Some(&serde_json::json!("healthy")));
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthorized() {
        let Ok(request) = Request::get("/api/v1/auth/me").body(Body::empty()) else {
            panic!("bad request");
        };
        let Ok(response) = app().oneshot(request).await else {
            panic!("router failed");
        };
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body.get("success"), Some(&serde_json::json!(false)));
    }

    #[tokio::test]
    async fn malformed_json_uses_error_envelope() {
        let Ok(request) = Request::post("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"email\":"))
        else {
            panic!("bad request");
        };
        let Ok(response) = app().oneshot(request).await else {
            panic!("router failed");
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body.get("success"), Some(&serde_json::json!(false)));
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn invalid_path_id_is_bad_request() {
        let Ok(request) = Request::get("/api/v1/events/not-a-uuid").body(Body::empty()) else {
            panic!("bad request");
        };
        let Ok(response) = app().oneshot(request).await else {
            panic!("router failed");
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
