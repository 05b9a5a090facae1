use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::dispatcher::DispatchSummary;
use super::repository::ApplicationRegistry;
use super::service::OrderFulfillmentService;
use crate::error::AppError;

/// Router exposing on-demand sweeps and worker pool statistics.
pub fn order_router<R>(service: Arc<OrderFulfillmentService<R>>) -> Router
where
    R: ApplicationRegistry + 'static,
{
    Router::new()
        .route("/api/v1/orders/sweeps", post(sweep_handler::<R>))
        .route("/api/v1/orders/stats", get(stats_handler::<R>))
        .with_state(service)
}

/// 202 with the dispatch summary; a sweep already running is a 409.
pub(crate) async fn sweep_handler<R>(
    State(service): State<Arc<OrderFulfillmentService<R>>>,
) -> Result<(StatusCode, Json<DispatchSummary>), AppError>
where
    R: ApplicationRegistry + 'static,
{
    let summary = service.sweep().await?;
    Ok((StatusCode::ACCEPTED, Json(summary)))
}

pub(crate) async fn stats_handler<R>(
    State(service): State<Arc<OrderFulfillmentService<R>>>,
) -> Response
where
    R: ApplicationRegistry + 'static,
{
    (StatusCode::OK, Json(service.stats())).into_response()
}
