use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::gateway::OrderGateway;
use super::queue::QueueConsumer;
use super::repository::ApplicationRegistry;
use super::worker::{OrderWorker, ProcessOutcome};

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of concurrent consumers.
    pub concurrency: usize,
    /// Name for logging.
    pub name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            name: "order-worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Counters across every consumer in the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub processed: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub stale: u64,
    pub abandoned: u64,
}

impl PoolStats {
    fn record(&mut self, outcome: &ProcessOutcome) {
        self.processed += 1;
        match outcome {
            ProcessOutcome::Completed { .. } => self.completed += 1,
            ProcessOutcome::Failed { .. } => self.failed += 1,
            ProcessOutcome::Skipped { .. } => self.skipped += 1,
            ProcessOutcome::Stale { .. } => self.stale += 1,
            ProcessOutcome::Abandoned { .. } => self.abandoned += 1,
        }
    }
}

/// Handle to a running pool of order workers.
#[derive(Debug)]
pub struct WorkerPoolHandle {
    shutdown: watch::Sender<bool>,
    consumers: Vec<JoinHandle<()>>,
    stats: Arc<Mutex<PoolStats>>,
}

/// Spawns `config.concurrency` consumers draining `consumer` through `worker`.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_worker_pool<R, G>(
    worker: Arc<OrderWorker<R, G>>,
    consumer: QueueConsumer,
    config: WorkerPoolConfig,
) -> WorkerPoolHandle
where
    R: ApplicationRegistry + 'static,
    G: OrderGateway + 'static,
{
    let (shutdown, shutdown_rx) = watch::channel(false);
    let stats = Arc::new(Mutex::new(PoolStats::default()));
    let concurrency = config.concurrency.max(1);

    let consumers = (0..concurrency)
        .map(|slot| {
            tokio::spawn(consume_loop(
                Arc::clone(&worker),
                consumer.clone(),
                shutdown_rx.clone(),
                Arc::clone(&stats),
                format!("{}-{slot}", config.name),
            ))
        })
        .collect();

    info!(pool = %config.name, concurrency, "order worker pool started");

    WorkerPoolHandle {
        shutdown,
        consumers,
        stats,
    }
}

impl WorkerPoolHandle {
    pub fn stats(&self) -> PoolStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Waits for every consumer to finish. Consumers finish once the queue is
    /// closed and empty, or after `shutdown` is signalled.
    pub async fn join(self) -> PoolStats {
        for consumer in self.consumers {
            if let Err(err) = consumer.await {
                error!(error = %err, "order worker task ended abnormally");
            }
        }
        let stats = self
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        info!(processed = stats.processed, "order worker pool stopped");
        stats
    }

    /// Stops consumers after their in-flight item, leaving queued items unprocessed.
    pub async fn shutdown(self) -> PoolStats {
        let _ = self.shutdown.send(true);
        self.join().await
    }
}

async fn consume_loop<R, G>(
    worker: Arc<OrderWorker<R, G>>,
    consumer: QueueConsumer,
    mut shutdown: watch::Receiver<bool>,
    stats: Arc<Mutex<PoolStats>>,
    name: String,
) where
    R: ApplicationRegistry + 'static,
    G: OrderGateway,
{
    loop {
        if *shutdown.borrow() {
            break;
        }

        let item = tokio::select! {
            item = consumer.consume() => item,
            _ = shutdown.changed() => break,
        };
        let Some(item) = item else {
            break;
        };

        debug!(worker = %name, work_item = %item.id, application_id = %item.application_id, "processing work item");
        let outcome = worker.process(&item.application_id).await;

        stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(&outcome);
    }

    debug!(worker = %name, "order worker stopped");
}
