use crate::infra::start_fulfillment;
use clap::Args;
use nbn_ordering::config::AppConfig;
use nbn_ordering::error::AppError;
use nbn_ordering::telemetry;
use nbn_ordering::workflows::ordering::{
    ApplicationId, DispatchSummary, PoolStats, RegistryError,
};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Args, Debug, Default)]
pub(crate) struct ProcessNbnArgs {
    /// Registry document to sweep (defaults to APPLICATION_REGISTRY_PATH)
    #[arg(long)]
    pub(crate) registry: Option<PathBuf>,
    /// Number of concurrent order workers (defaults to ORDER_WORKER_CONCURRENCY)
    #[arg(long, value_parser = parse_concurrency)]
    pub(crate) concurrency: Option<usize>,
}

fn parse_concurrency(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(format!("'{raw}' is not a positive worker count")),
    }
}

/// Printed to stdout once the sweep has drained.
#[derive(Debug, Serialize)]
pub(crate) struct ProcessReport {
    pub(crate) registry: PathBuf,
    pub(crate) dispatched: usize,
    pub(crate) application_ids: Vec<ApplicationId>,
    pub(crate) outcomes: PoolStats,
}

impl ProcessReport {
    fn new(registry: PathBuf, summary: DispatchSummary, outcomes: PoolStats) -> Self {
        Self {
            registry,
            dispatched: summary.dispatched,
            application_ids: summary.application_ids,
            outcomes,
        }
    }
}

/// Writes the report as the only content of `out`; logs go to stderr.
fn write_report<W: Write>(out: &mut W, report: &ProcessReport) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report).map_err(io::Error::other)?;
    writeln!(out)?;
    out.flush()
}

pub(crate) async fn run_process_nbn(args: ProcessNbnArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(concurrency) = args.concurrency {
        config.workers.concurrency = concurrency;
    }
    let registry_path = args
        .registry
        .unwrap_or_else(|| config.registry.path.clone());

    telemetry::init(&config.telemetry)?;

    let service = start_fulfillment(&config, &registry_path)?;
    let summary = match service.sweep().await {
        Ok(summary) => summary,
        Err(err) => {
            service.shutdown().await;
            return Err(err.into());
        }
    };
    let outcomes = service.drain().await;

    info!(
        dispatched = summary.dispatched,
        completed = outcomes.completed,
        failed = outcomes.failed,
        "nbn order sweep finished"
    );

    let abandoned = outcomes.abandoned;
    let report = ProcessReport::new(registry_path, summary, outcomes);
    write_report(&mut std::io::stdout().lock(), &report)?;

    if abandoned > 0 {
        error!(abandoned, "order outcomes could not be recorded");
        return Err(RegistryError::Unavailable(format!(
            "{abandoned} order outcome(s) could not be recorded"
        ))
        .into());
    }
    Ok(())
}
