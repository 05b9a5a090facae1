use std::sync::Arc;

use tokio::sync::Mutex;

use super::dispatcher::{DispatchError, DispatchSummary, OrderDispatcher};
use super::domain::PlanType;
use super::gateway::OrderGateway;
use super::pool::{spawn_worker_pool, PoolStats, WorkerPoolConfig, WorkerPoolHandle};
use super::queue::{order_queue, OrderQueue};
use super::repository::ApplicationRegistry;
use super::selector::EligibilitySelector;
use super::worker::{OrderWorker, OrderWorkerConfig};

/// Settings for wiring the fulfillment pipeline.
#[derive(Debug, Clone)]
pub struct FulfillmentSettings {
    pub qualifying_plan: PlanType,
    pub worker: OrderWorkerConfig,
    pub pool: WorkerPoolConfig,
}

impl Default for FulfillmentSettings {
    fn default() -> Self {
        Self {
            qualifying_plan: PlanType::Nbn,
            worker: OrderWorkerConfig::default(),
            pool: WorkerPoolConfig::default(),
        }
    }
}

/// Service composing selector, dispatcher, queue, and worker pool.
pub struct OrderFulfillmentService<R> {
    dispatcher: Arc<OrderDispatcher<R, OrderQueue>>,
    pool: WorkerPoolHandle,
    sweep_lock: Arc<Mutex<()>>,
}

impl<R> OrderFulfillmentService<R>
where
    R: ApplicationRegistry + 'static,
{
    /// Starts the worker pool. Must be called from within a Tokio runtime.
    pub fn start<G>(registry: Arc<R>, gateway: Arc<G>, settings: FulfillmentSettings) -> Self
    where
        G: OrderGateway + 'static,
    {
        let (queue, consumer) = order_queue();
        let selector = EligibilitySelector::new(Arc::clone(&registry), settings.qualifying_plan);
        let dispatcher = Arc::new(OrderDispatcher::new(selector, Arc::new(queue)));
        let worker = Arc::new(OrderWorker::new(registry, gateway, settings.worker));
        let pool = spawn_worker_pool(worker, consumer, settings.pool);

        Self {
            dispatcher,
            pool,
            sweep_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Runs one selector and dispatcher pass on the blocking pool. Refuses to
    /// overlap a running sweep, including one whose caller has gone away.
    pub async fn sweep(&self) -> Result<DispatchSummary, DispatchError> {
        let guard = Arc::clone(&self.sweep_lock)
            .try_lock_owned()
            .map_err(|_| DispatchError::SweepInProgress)?;
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            dispatcher.dispatch_all()
        })
        .await?
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Closes the queue and waits until every queued item has been processed.
    ///
    /// Any sweep still running holds the queue open until it finishes.
    pub async fn drain(self) -> PoolStats {
        let Self { dispatcher, pool, .. } = self;
        drop(dispatcher);
        pool.join().await
    }

    /// Stops the workers after their in-flight items.
    pub async fn shutdown(self) -> PoolStats {
        self.pool.shutdown().await
    }
}
