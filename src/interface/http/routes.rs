use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::application::Monitor;

use super::handlers::{
    create_device_handler, delete_device_handler, device_tasks_handler, get_device_handler,
    health_handler, list_categories_handler, list_devices_handler, pause_handler, resume_handler,
    run_now_handler, set_interval_handler, stats_handler, AppState,
};

pub fn create_router(monitor: Arc<Monitor>) -> Router {
    let state = AppState { monitor };

    Router::new()
        // API routes
        .route("/api/health", get(health_handler))
        .route("/api/devices", get(list_devices_handler).post(create_device_handler))
        .route(
            "/api/devices/{id}",
            get(get_device_handler).delete(delete_device_handler),
        )
        .route("/api/devices/{id}/tasks", get(device_tasks_handler))
        .route("/api/devices/{id}/run/{category}", post(run_now_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/categories", get(list_categories_handler))
        .route("/api/categories/{category}/interval", put(set_interval_handler))
        .route("/api/categories/{category}/pause", post(pause_handler))
        .route("/api/categories/{category}/resume", post(resume_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::application::test_support::MockSource;
    use crate::application::MonitorConfig;
    use crate::domain::ConnectionKind;
    use crate::ports::DeviceSource;

    fn router() -> Router {
        let mut sources: HashMap<ConnectionKind, Arc<dyn DeviceSource>> = HashMap::new();
        sources.insert(ConnectionKind::Api, Arc::new(MockSource::new()));
        let monitor = Monitor::new(MonitorConfig::default(), sources, None);
        create_router(monitor)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = router()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_then_get_device() {
        let app = router();

        let body = serde_json::json!({
            "id": "r1",
            "name": "router-1",
            "host": "10.0.0.1",
            "connection": "api"
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/devices")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/devices/r1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/api/devices/r1/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_device_is_404() {
        let response = router()
            .oneshot(Request::builder().uri("/api/devices/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/categories/resource/interval")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"seconds":0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pause_rejects_unknown_category() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/categories/bogus/pause")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
