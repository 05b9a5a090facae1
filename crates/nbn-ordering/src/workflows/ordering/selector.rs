use std::sync::Arc;

use super::domain::{Application, ApplicationStatus, PlanType};
use super::repository::{sort_oldest_first, ApplicationRegistry, RegistryError};

/// Finds applications ready to be ordered for the qualifying plan type.
#[derive(Debug)]
pub struct EligibilitySelector<R> {
    registry: Arc<R>,
    qualifying_type: PlanType,
}

impl<R> Clone for EligibilitySelector<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            qualifying_type: self.qualifying_type,
        }
    }
}

impl<R> EligibilitySelector<R>
where
    R: ApplicationRegistry,
{
    pub fn new(registry: Arc<R>, qualifying_type: PlanType) -> Self {
        Self {
            registry,
            qualifying_type,
        }
    }

    pub fn qualifying_type(&self) -> PlanType {
        self.qualifying_type
    }

    /// Re-queries the registry on every call; never mutates anything.
    pub fn select_eligible(&self) -> Result<Vec<Application>, RegistryError> {
        let mut eligible = self
            .registry
            .find_eligible(ApplicationStatus::AwaitingOrder, self.qualifying_type)?;

        eligible.retain(|application| application.is_eligible(self.qualifying_type));
        sort_oldest_first(&mut eligible);
        Ok(eligible)
    }
}
