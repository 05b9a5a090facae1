use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::domain::{Application, ApplicationId, ApplicationStatus, PlanType, StatusUpdate};
use super::repository::{sort_oldest_first, ApplicationRegistry, RegistryError};

/// Process-local registry backed by a mutex-guarded map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryApplicationRegistry {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
}

impl InMemoryApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_applications(applications: impl IntoIterator<Item = Application>) -> Self {
        let registry = Self::new();
        for application in applications {
            registry.insert(application);
        }
        registry
    }

    /// Inserts or replaces an application record.
    pub fn insert(&self, application: Application) {
        self.lock().insert(application.id.clone(), application);
    }

    /// All records, oldest first.
    pub fn snapshot(&self) -> Vec<Application> {
        let mut records: Vec<Application> = self.lock().values().cloned().collect();
        sort_oldest_first(&mut records);
        records
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ApplicationId, Application>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ApplicationRegistry for InMemoryApplicationRegistry {
    fn find_eligible(
        &self,
        status: ApplicationStatus,
        plan_type: PlanType,
    ) -> Result<Vec<Application>, RegistryError> {
        let mut matches: Vec<Application> = self
            .lock()
            .values()
            .filter(|record| record.status == status && record.plan_type() == Some(plan_type))
            .cloned()
            .collect();
        sort_oldest_first(&mut matches);
        Ok(matches)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RegistryError> {
        Ok(self.lock().get(id).cloned())
    }

    fn update(
        &self,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Application, RegistryError> {
        let mut guard = self.lock();
        let stored = guard
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        let mut next = stored.clone();
        next.apply(&update)?;
        *stored = next.clone();
        Ok(next)
    }
}
