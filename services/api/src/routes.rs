use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use placement_portal::envelope::failure_response;
use placement_portal::workflows::experiences::{experience_router, ExperienceRouterState};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::warn;

pub(crate) fn with_experience_routes(state: ExperienceRouterState) -> Router {
    experience_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .fallback(route_not_found)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if !state.readiness.load(Ordering::Acquire) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        );
    }

    match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(err) => {
            warn!(error = %err, "readiness probe could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "store_unavailable" })),
            )
        }
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn route_not_found() -> Response {
    failure_response(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use placement_portal::auth::TokenVerifier;
    use placement_portal::store::Store;
    use placement_portal::workflows::experiences::{ExperienceRepository, ExperienceService};
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app(ready: bool) -> (Router, Store) {
        let store = Store::in_memory().await.expect("store opens");
        store.migrate().await.expect("migrations apply");

        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            store: store.clone(),
        };
        let router = with_experience_routes(ExperienceRouterState {
            service: Arc::new(ExperienceService::new(ExperienceRepository::new(
                store.pool().clone(),
            ))),
            tokens: Arc::new(TokenVerifier::new("routes-test-secret")),
        })
        .layer(Extension(state));
        (router, store)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&body).expect("json payload"))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _store) = app(true).await;
        let (status, body) = get_json(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_follows_flag_and_store() {
        let (router, _store) = app(false).await;
        let (status, body) = get_json(router, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], json!("initializing"));

        let (router, store) = app(true).await;
        let (status, _) = get_json(router.clone(), "/ready").await;
        assert_eq!(status, StatusCode::OK);

        store.close().await;
        let (status, body) = get_json(router, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], json!("store_unavailable"));
    }

    #[tokio::test]
    async fn unknown_routes_use_the_error_envelope() {
        let (router, _store) = app(true).await;
        let (status, body) = get_json(router, "/api/student/nothing-here").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("NOT_FOUND"));
    }
}
