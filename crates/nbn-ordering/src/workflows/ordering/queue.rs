use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use super::domain::ApplicationId;

/// Unique work item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub Uuid);

impl WorkItemId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for WorkItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Envelope asking a worker to attempt the order for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub application_id: ApplicationId,
    pub enqueued_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(application_id: ApplicationId) -> Self {
        Self {
            id: WorkItemId::new(),
            application_id,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("order queue is closed")]
    Closed,
}

/// Producer side of the order queue.
pub trait WorkQueue: Send + Sync {
    fn enqueue(&self, item: WorkItem) -> Result<(), QueueError>;
}

/// Creates the in-process order queue: a cloneable producer and a shared consumer.
pub fn order_queue() -> (OrderQueue, QueueConsumer) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        OrderQueue { sender },
        QueueConsumer {
            receiver: Arc::new(Mutex::new(receiver)),
        },
    )
}

#[derive(Debug, Clone)]
pub struct OrderQueue {
    sender: mpsc::UnboundedSender<WorkItem>,
}

impl WorkQueue for OrderQueue {
    fn enqueue(&self, item: WorkItem) -> Result<(), QueueError> {
        self.sender.send(item).map_err(|_| QueueError::Closed)
    }
}

/// Consumer side shared by every worker in the pool.
///
/// The queue closes once every [`OrderQueue`] handle is dropped; consumers then
/// drain what is left and receive `None`.
#[derive(Debug, Clone)]
pub struct QueueConsumer {
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>,
}

impl QueueConsumer {
    pub async fn consume(&self) -> Option<WorkItem> {
        self.receiver.lock().await.recv().await
    }
}
