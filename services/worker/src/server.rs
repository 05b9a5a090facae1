use crate::cli::ServeArgs;
use crate::infra::{start_fulfillment, AppState, FileBackedService};
use crate::routes::with_order_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use nbn_ordering::config::AppConfig;
use nbn_ordering::error::AppError;
use nbn_ordering::telemetry;
use nbn_ordering::workflows::ordering::DispatchError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(start_fulfillment(&config, &config.registry.path)?);
    let sweeper = config
        .workers
        .sweep_interval
        .map(|every| spawn_periodic_sweep(Arc::clone(&service), every));

    let app = with_order_routes(Arc::clone(&service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "nbn order worker ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    if let Some(sweeper) = sweeper {
        sweeper.abort();
        let _ = sweeper.await;
    }
    match Arc::try_unwrap(service) {
        Ok(service) => {
            let stats = service.shutdown().await;
            info!(processed = stats.processed, "order workers stopped");
        }
        Err(_) => warn!("order service still shared at shutdown; workers left running"),
    }
    Ok(())
}

fn spawn_periodic_sweep(service: Arc<FileBackedService>, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "periodic order sweep enabled");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match service.sweep().await {
                Ok(_) => {}
                Err(DispatchError::SweepInProgress) => {
                    debug!("order sweep already running, skipping tick");
                }
                Err(err) => error!(error = %err, "periodic order sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
