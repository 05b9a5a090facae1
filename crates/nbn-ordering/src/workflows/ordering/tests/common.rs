use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use crate::workflows::ordering::domain::{
    Application, ApplicationId, ApplicationStatus, Plan, PlanId, PlanType, ServiceAddress,
    StatusUpdate,
};
use crate::workflows::ordering::gateway::{
    GatewayError, GatewayResponse, OrderGateway, OrderRequest,
};
use crate::workflows::ordering::memory::InMemoryApplicationRegistry;
use crate::workflows::ordering::queue::{QueueError, WorkItem, WorkQueue};
use crate::workflows::ordering::repository::{ApplicationRegistry, RegistryError};
use crate::workflows::ordering::worker::{OrderWorker, OrderWorkerConfig};

pub(super) const ENDPOINT: &str = "https://nbn-b2b.test/orders";

pub(super) fn created(minutes_after_open: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap() + Duration::minutes(minutes_after_open)
}

pub(super) fn nbn_plan() -> Plan {
    Plan {
        id: PlanId("plan-nbn-fast".to_string()),
        plan_type: PlanType::Nbn,
        name: Some("NBN Fast".to_string()),
        monthly_cost: 8999,
    }
}

pub(super) fn mobile_plan() -> Plan {
    Plan {
        id: PlanId("plan-mobile".to_string()),
        plan_type: PlanType::Mobile,
        name: Some("Mobile 40GB".to_string()),
        monthly_cost: 3500,
    }
}

pub(super) fn application(
    id: &str,
    status: ApplicationStatus,
    plan: Option<Plan>,
    created_at: DateTime<Utc>,
) -> Application {
    Application {
        id: ApplicationId::from(id),
        status,
        plan,
        address: ServiceAddress {
            address_1: "12 Harbour St".to_string(),
            address_2: Some("Level 3".to_string()),
            city: "Sydney".to_string(),
            state: "NSW".to_string(),
            postcode: "2000".to_string(),
        },
        order_id: None,
        created_at,
    }
}

pub(super) fn awaiting_nbn(id: &str) -> Application {
    application(
        id,
        ApplicationStatus::AwaitingOrder,
        Some(nbn_plan()),
        created(0),
    )
}

pub(super) fn registry_with(applications: Vec<Application>) -> Arc<InMemoryApplicationRegistry> {
    Arc::new(InMemoryApplicationRegistry::with_applications(applications))
}

pub(super) fn worker_for<R: ApplicationRegistry + 'static>(
    registry: Arc<R>,
    gateway: Arc<ScriptedGateway>,
    endpoint: Option<&str>,
) -> OrderWorker<R, ScriptedGateway> {
    let config = OrderWorkerConfig {
        endpoint: endpoint.map(str::to_string),
    };
    OrderWorker::new(registry, gateway, config)
}

pub(super) fn stored(registry: &InMemoryApplicationRegistry, id: &str) -> Application {
    registry
        .fetch(&ApplicationId::from(id))
        .expect("fetch succeeds")
        .expect("record present")
}

pub(super) fn successful_reply(order_id: &str) -> GatewayResponse {
    GatewayResponse::new(200, Some(json!({ "id": order_id, "status": "Successful" })))
}

/// Gateway double replaying scripted replies and recording every request.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<GatewayResponse, GatewayError>>>,
    requests: Mutex<Vec<(String, OrderRequest)>>,
}

impl ScriptedGateway {
    pub(super) fn replying(reply: Result<GatewayResponse, GatewayError>) -> Arc<Self> {
        let gateway = Self::default();
        gateway.push(reply);
        Arc::new(gateway)
    }

    pub(super) fn push(&self, reply: Result<GatewayResponse, GatewayError>) {
        self.replies.lock().expect("replies mutex").push_back(reply);
    }

    pub(super) fn requests(&self) -> Vec<(String, OrderRequest)> {
        self.requests.lock().expect("requests mutex").clone()
    }

    pub(super) fn request_count(&self) -> usize {
        self.requests.lock().expect("requests mutex").len()
    }
}

#[async_trait]
impl OrderGateway for ScriptedGateway {
    async fn place_order(
        &self,
        endpoint: &str,
        request: &OrderRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        self.requests
            .lock()
            .expect("requests mutex")
            .push((endpoint.to_string(), request.clone()));
        self.replies
            .lock()
            .expect("replies mutex")
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("no scripted reply".to_string())))
    }
}

/// Queue double capturing enqueued items in order.
#[derive(Default)]
pub(super) struct RecordingQueue {
    items: Mutex<Vec<WorkItem>>,
    closed: bool,
}

impl RecordingQueue {
    pub(super) fn closed() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            closed: true,
        }
    }

    pub(super) fn application_ids(&self) -> Vec<String> {
        self.items
            .lock()
            .expect("queue mutex")
            .iter()
            .map(|item| item.application_id.0.clone())
            .collect()
    }
}

impl WorkQueue for RecordingQueue {
    fn enqueue(&self, item: WorkItem) -> Result<(), QueueError> {
        if self.closed {
            return Err(QueueError::Closed);
        }
        self.items.lock().expect("queue mutex").push(item);
        Ok(())
    }
}

/// Registry whose writes always fail, for exercising abandoned outcomes.
pub(super) struct ReadOnlyRegistry {
    pub(super) inner: InMemoryApplicationRegistry,
}

impl ApplicationRegistry for ReadOnlyRegistry {
    fn find_eligible(
        &self,
        status: ApplicationStatus,
        plan_type: PlanType,
    ) -> Result<Vec<Application>, RegistryError> {
        self.inner.find_eligible(status, plan_type)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RegistryError> {
        self.inner.fetch(id)
    }

    fn update(
        &self,
        _id: &ApplicationId,
        _update: StatusUpdate,
    ) -> Result<Application, RegistryError> {
        Err(RegistryError::Unavailable("registry is read-only".to_string()))
    }
}

/// Registry whose every read fails.
pub(super) struct FailingQueryRegistry;

impl ApplicationRegistry for FailingQueryRegistry {
    fn find_eligible(
        &self,
        _status: ApplicationStatus,
        _plan_type: PlanType,
    ) -> Result<Vec<Application>, RegistryError> {
        Err(RegistryError::Unavailable("connection reset".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, RegistryError> {
        Err(RegistryError::Unavailable("connection reset".to_string()))
    }

    fn update(
        &self,
        _id: &ApplicationId,
        _update: StatusUpdate,
    ) -> Result<Application, RegistryError> {
        Err(RegistryError::Unavailable("connection reset".to_string()))
    }
}

/// Registry whose every call blocks the calling thread for `delay` first.
pub(super) struct SlowRegistry {
    pub(super) inner: InMemoryApplicationRegistry,
    pub(super) delay: std::time::Duration,
}

impl ApplicationRegistry for SlowRegistry {
    fn find_eligible(
        &self,
        status: ApplicationStatus,
        plan_type: PlanType,
    ) -> Result<Vec<Application>, RegistryError> {
        thread::sleep(self.delay);
        self.inner.find_eligible(status, plan_type)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RegistryError> {
        thread::sleep(self.delay);
        self.inner.fetch(id)
    }

    fn update(
        &self,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Application, RegistryError> {
        thread::sleep(self.delay);
        self.inner.update(id, update)
    }
}

/// Registry whose selection query parks until the test releases it.
pub(super) struct GatedRegistry {
    inner: InMemoryApplicationRegistry,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedRegistry {
    /// Returns the registry, a receiver signalled when a query starts, and
    /// the sender that lets it finish.
    pub(super) fn new(
        applications: Vec<Application>,
    ) -> (Self, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let registry = Self {
            inner: InMemoryApplicationRegistry::with_applications(applications),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        (registry, entered_rx, release_tx)
    }
}

impl ApplicationRegistry for GatedRegistry {
    fn find_eligible(
        &self,
        status: ApplicationStatus,
        plan_type: PlanType,
    ) -> Result<Vec<Application>, RegistryError> {
        let _ = self.entered.lock().expect("entered").send(());
        let _ = self.release.lock().expect("release").recv();
        self.inner.find_eligible(status, plan_type)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RegistryError> {
        self.inner.fetch(id)
    }

    fn update(
        &self,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Application, RegistryError> {
        self.inner.update(id, update)
    }
}
