use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::domain::ApplicationId;
use super::queue::{QueueError, WorkItem, WorkQueue};
use super::repository::{ApplicationRegistry, RegistryError};
use super::selector::EligibilitySelector;

/// Result of one sweep: the applications a work item was queued for, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub application_ids: Vec<ApplicationId>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("an order sweep is already running")]
    SweepInProgress,
    #[error("order sweep task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Queues one work item per eligible application. Never changes a status itself.
#[derive(Debug)]
pub struct OrderDispatcher<R, Q> {
    selector: EligibilitySelector<R>,
    queue: Arc<Q>,
}

impl<R, Q> OrderDispatcher<R, Q>
where
    R: ApplicationRegistry,
    Q: WorkQueue,
{
    pub fn new(selector: EligibilitySelector<R>, queue: Arc<Q>) -> Self {
        Self { selector, queue }
    }

    pub fn dispatch_all(&self) -> Result<DispatchSummary, DispatchError> {
        let eligible = self.selector.select_eligible()?;

        let mut summary = DispatchSummary::default();
        for application in eligible {
            debug!(application_id = %application.id, "queueing order work item");
            self.queue.enqueue(WorkItem::new(application.id.clone()))?;
            summary.application_ids.push(application.id);
        }
        summary.dispatched = summary.application_ids.len();

        info!(
            dispatched = summary.dispatched,
            plan_type = %self.selector.qualifying_type(),
            "order sweep dispatched work items"
        );
        Ok(summary)
    }
}
