use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::domain::{ApplicationId, ApplicationStatus, StatusUpdate};
use super::gateway::{GatewayError, OrderGateway, OrderRejection, OrderRequest};
use super::repository::{ApplicationRegistry, RegistryError};

/// Settings handed to each worker at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderWorkerConfig {
    pub endpoint: Option<String>,
}

impl OrderWorkerConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
        }
    }

    /// The gateway endpoint, if configured and not blank.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }
}

/// Why an order attempt ended in `OrderFailed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("order gateway endpoint is not configured")]
    MissingEndpoint,
    #[error("plan has no display name")]
    MissingPlanName,
    #[error(transparent)]
    Rejected(#[from] OrderRejection),
    #[error(transparent)]
    Transport(#[from] GatewayError),
}

/// What a single `process` call did. Every path ends in one of these; none is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The application was not awaiting an order (or no longer exists); nothing happened.
    Skipped { status: Option<ApplicationStatus> },
    Completed { order_id: String },
    Failed { reason: FailureReason },
    /// Another invocation resolved the application before this one could write.
    Stale { status: ApplicationStatus },
    /// The registry could not be read or written; the application keeps its previous state.
    Abandoned { error: String },
}

/// Places the order for one application and records the outcome.
pub struct OrderWorker<R, G> {
    registry: Arc<R>,
    gateway: Arc<G>,
    config: OrderWorkerConfig,
}

impl<R, G> OrderWorker<R, G>
where
    R: ApplicationRegistry + 'static,
    G: OrderGateway,
{
    pub fn new(registry: Arc<R>, gateway: Arc<G>, config: OrderWorkerConfig) -> Self {
        Self {
            registry,
            gateway,
            config,
        }
    }

    pub async fn process(&self, application_id: &ApplicationId) -> ProcessOutcome {
        let id = application_id.clone();
        let fetched = self.on_registry(move |registry| registry.fetch(&id)).await;
        let application = match fetched {
            Ok(Some(application)) if application.status == ApplicationStatus::AwaitingOrder => {
                application
            }
            Ok(Some(application)) => {
                debug!(%application_id, status = %application.status, "application not awaiting order, skipping");
                return ProcessOutcome::Skipped {
                    status: Some(application.status),
                };
            }
            Ok(None) => {
                warn!(%application_id, "application no longer exists, skipping");
                return ProcessOutcome::Skipped { status: None };
            }
            Err(err) => {
                error!(%application_id, error = %err, "unable to load application");
                return ProcessOutcome::Abandoned {
                    error: err.to_string(),
                };
            }
        };

        let Some(endpoint) = self.config.endpoint() else {
            return self.fail(application_id, FailureReason::MissingEndpoint).await;
        };
        let Some(plan_name) = application.plan_name() else {
            return self.fail(application_id, FailureReason::MissingPlanName).await;
        };

        let request = OrderRequest::for_application(&application, plan_name);
        let confirmation = match self.gateway.place_order(endpoint, &request).await {
            Ok(response) => response.confirmation().map_err(FailureReason::from),
            Err(err) => Err(FailureReason::from(err)),
        };

        match confirmation {
            Ok(order_id) => self.complete(application_id, order_id).await,
            Err(reason) => self.fail(application_id, reason).await,
        }
    }

    async fn complete(&self, application_id: &ApplicationId, order_id: String) -> ProcessOutcome {
        let update = StatusUpdate::Completed {
            order_id: order_id.clone(),
        };
        match self.persist(application_id, update).await {
            Ok(()) => {
                info!(%application_id, %order_id, "order placed");
                ProcessOutcome::Completed { order_id }
            }
            Err(outcome) => outcome,
        }
    }

    async fn fail(&self, application_id: &ApplicationId, reason: FailureReason) -> ProcessOutcome {
        match self.persist(application_id, StatusUpdate::OrderFailed).await {
            Ok(()) => {
                warn!(%application_id, %reason, "order failed");
                ProcessOutcome::Failed { reason }
            }
            Err(outcome) => outcome,
        }
    }

    async fn persist(
        &self,
        application_id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<(), ProcessOutcome> {
        let id = application_id.clone();
        let written = self
            .on_registry(move |registry| registry.update(&id, update))
            .await;
        match written {
            Ok(_) => Ok(()),
            Err(RegistryError::Transition(transition)) => {
                info!(%application_id, status = %transition.from, "application resolved concurrently, dropping outcome");
                Err(ProcessOutcome::Stale {
                    status: transition.from,
                })
            }
            Err(err) => {
                error!(%application_id, error = %err, "unable to record order outcome");
                Err(ProcessOutcome::Abandoned {
                    error: err.to_string(),
                })
            }
        }
    }

    /// Registry adapters may block on disk or network, so calls run on the
    /// blocking pool rather than on a runtime worker thread.
    async fn on_registry<T, F>(&self, call: F) -> Result<T, RegistryError>
    where
        T: Send + 'static,
        F: FnOnce(&R) -> Result<T, RegistryError> + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || call(&registry))
            .await
            .map_err(|err| RegistryError::Unavailable(format!("registry task failed: {err}")))?
    }
}
