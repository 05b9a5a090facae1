//! NBN order fulfillment: eligibility sweep, work dispatch, and the order worker.
//!
//! A sweep selects applications awaiting an order on a qualifying plan, oldest
//! first, and queues one [`WorkItem`] each. A pool of [`OrderWorker`]s drains the
//! queue; each worker re-checks the application, posts the order to the gateway,
//! and records exactly one terminal status through a single registry write.

pub mod dispatcher;
pub mod domain;
pub mod file;
pub mod gateway;
pub mod memory;
pub mod pool;
pub mod queue;
pub mod repository;
pub mod router;
pub mod selector;
pub mod service;
pub mod worker;

#[cfg(test)]
mod tests;

pub use dispatcher::{DispatchError, DispatchSummary, OrderDispatcher};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, IllegalTransition, Plan, PlanId, PlanType,
    ServiceAddress, StatusUpdate, UnknownPlanType,
};
pub use file::JsonFileApplicationRegistry;
pub use gateway::{
    GatewayError, GatewayResponse, HttpOrderGateway, OrderGateway, OrderRejection, OrderRequest,
};
pub use memory::InMemoryApplicationRegistry;
pub use pool::{spawn_worker_pool, PoolStats, WorkerPoolConfig, WorkerPoolHandle};
pub use queue::{order_queue, OrderQueue, QueueConsumer, QueueError, WorkItem, WorkItemId, WorkQueue};
pub use repository::{ApplicationRegistry, RegistryError};
pub use router::order_router;
pub use selector::EligibilitySelector;
pub use service::{FulfillmentSettings, OrderFulfillmentService};
pub use worker::{FailureReason, OrderWorker, OrderWorkerConfig, ProcessOutcome};
