//! Axum router construction.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/seal", post(handlers::seal))
        .route("/unseal", post(handlers::unseal))
        .route("/roll", post(handlers::roll))
        .route("/profiles", get(handlers::profiles))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::middleware::REQUEST_TIMEOUT;
    use axum::{body::Body, http::Request};
    use axum_test::TestServer;
    use common::protocol::{HealthResponse, ProfilesResponse, SealResponse, UnsealResponse};
    use keyroll::{KeyBytes, KeyProfileRegistry, SymmetricKeyProfile};
    use serde_json::json;
    use tower::ServiceExt;

    fn configured_state() -> AppState {
        let registry = KeyProfileRegistry::new();
        registry.register(SymmetricKeyProfile::new("2024", KeyBytes::new([1; 32])).rolled(true));
        registry.set_default(SymmetricKeyProfile::new("2025", KeyBytes::new([2; 32])));
        AppState::new(registry)
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(AppState::default(), REQUEST_TIMEOUT);
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let app = build(AppState::default(), REQUEST_TIMEOUT);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        // 503 because no key profiles are configured in the test state.
        assert_eq!(resp.status(), 503);
    }

    #[tokio::test]
    async fn health_ok_with_default_profile() {
        let server = TestServer::new(build(configured_state(), REQUEST_TIMEOUT)).unwrap();
        let resp = server.get("/health").await;
        resp.assert_status_ok();
        let body: HealthResponse = resp.json();
        assert_eq!(body.status, "ok");
        assert_eq!(body.profiles_loaded, 2);
        assert_eq!(body.default_profile.as_deref(), Some("2025"));
    }

    #[tokio::test]
    async fn profiles_lists_flags_without_keys() {
        let server = TestServer::new(build(configured_state(), REQUEST_TIMEOUT)).unwrap();
        let resp = server.get("/profiles").await;
        resp.assert_status_ok();
        let body: ProfilesResponse = resp.json();
        let names: Vec<_> = body.profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["2024", "2025"]);
        assert!(body.profiles[0].rolled);
        assert!(!body.profiles[0].is_default);
        assert!(body.profiles[1].is_default);
        assert!(body.profiles.iter().all(|p| p.fingerprint.is_some()));
        assert!(!resp.text().contains("AQEB"));
    }

    #[tokio::test]
    async fn seal_and_unseal_through_router() {
        let server = TestServer::new(build(configured_state(), REQUEST_TIMEOUT)).unwrap();
        let sealed: SealResponse = server
            .post("/seal")
            .json(&json!({"value": "alice@example.com"}))
            .await
            .json();
        assert_eq!(sealed.stored.key_profile.as_deref(), Some("2025"));

        let plain: UnsealResponse = server.post("/unseal").json(&sealed).await.json();
        assert_eq!(plain.value, "alice@example.com");
    }
}
