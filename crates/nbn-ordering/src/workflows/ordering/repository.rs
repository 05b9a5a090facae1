use super::domain::{
    Application, ApplicationId, ApplicationStatus, IllegalTransition, PlanType, StatusUpdate,
};

/// Narrow contract the ordering pipeline needs from the application store.
pub trait ApplicationRegistry: Send + Sync {
    /// Applications in `status` whose plan has `plan_type`, plan loaded, oldest first.
    fn find_eligible(
        &self,
        status: ApplicationStatus,
        plan_type: PlanType,
    ) -> Result<Vec<Application>, RegistryError>;

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RegistryError>;

    fn status_of(&self, id: &ApplicationId) -> Result<Option<ApplicationStatus>, RegistryError> {
        Ok(self.fetch(id)?.map(|application| application.status))
    }

    /// Atomically applies `update` against the currently stored status.
    ///
    /// Fails with [`RegistryError::Transition`] when the stored status no longer
    /// permits the change; the stored record is left as it was.
    fn update(&self, id: &ApplicationId, update: StatusUpdate)
        -> Result<Application, RegistryError>;
}

/// Error enumeration for registry failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error(transparent)]
    Transition(#[from] IllegalTransition),
    #[error("registry unavailable: {0}")]
    Unavailable(String),
    #[error("registry document is malformed: {0}")]
    Malformed(String),
}

/// Oldest first, falling back to id so equal timestamps still order deterministically.
pub(crate) fn sort_oldest_first(applications: &mut [Application]) {
    applications.sort_by(|left, right| {
        left.created_at
            .cmp(&right.created_at)
            .then_with(|| left.id.cmp(&right.id))
    });
}
