use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use nbn_ordering::workflows::ordering::{order_router, ApplicationRegistry, OrderFulfillmentService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_order_routes<R>(service: Arc<OrderFulfillmentService<R>>) -> axum::Router
where
    R: ApplicationRegistry + 'static,
{
    order_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use nbn_ordering::workflows::ordering::{
        FulfillmentSettings, HttpOrderGateway, InMemoryApplicationRegistry,
    };
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    fn build_router(ready: bool) -> (axum::Router, Arc<AtomicBool>) {
        let registry = Arc::new(InMemoryApplicationRegistry::new());
        let gateway = Arc::new(HttpOrderGateway::new(Duration::from_secs(1)).expect("client"));
        let service = Arc::new(OrderFulfillmentService::start(
            registry,
            gateway,
            FulfillmentSettings::default(),
        ));

        let readiness = Arc::new(AtomicBool::new(ready));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        (with_order_routes(service).layer(Extension(state)), readiness)
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _) = build_router(false);
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let (router, readiness) = build_router(false);
        let response = router
            .clone()
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        readiness.store(true, Ordering::Release);
        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({ "status": "ready" }));
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let (router, _) = build_router(true);
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("router dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("text/plain; version=0.0.4")
        );
    }

    #[tokio::test]
    async fn order_routes_are_mounted() {
        let (router, _) = build_router(true);
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/orders/sweeps")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(read_json(response).await["dispatched"], json!(0));

        let response = router
            .oneshot(Request::get("/api/v1/orders/stats").body(Body::empty()).expect("request"))
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["processed"], json!(0));
    }
}
