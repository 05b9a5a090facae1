use metrics_exporter_prometheus::PrometheusHandle;
use nbn_ordering::config::AppConfig;
use nbn_ordering::error::AppError;
use nbn_ordering::workflows::ordering::{
    HttpOrderGateway, JsonFileApplicationRegistry, OrderFulfillmentService,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type FileBackedService = OrderFulfillmentService<JsonFileApplicationRegistry>;

/// Opens the registry document and starts the worker pool against the HTTP gateway.
pub(crate) fn start_fulfillment(
    config: &AppConfig,
    registry_path: &Path,
) -> Result<FileBackedService, AppError> {
    let registry = Arc::new(JsonFileApplicationRegistry::open(registry_path)?);
    let gateway = Arc::new(HttpOrderGateway::new(config.gateway.timeout)?);
    let settings = config.fulfillment_settings();

    if settings.worker.endpoint().is_none() {
        warn!("NBN_ORDER_ENDPOINT is not set; every order attempt will fail");
    }
    info!(
        registry = %registry_path.display(),
        plan_type = %settings.qualifying_plan,
        concurrency = settings.pool.concurrency,
        "order fulfillment started"
    );

    Ok(OrderFulfillmentService::start(registry, gateway, settings))
}
