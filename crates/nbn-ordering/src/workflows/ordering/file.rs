use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Plan, PlanId, PlanType, ServiceAddress,
    StatusUpdate,
};
use super::repository::{sort_oldest_first, ApplicationRegistry, RegistryError};

/// Registry adapter over a JSON document holding plans and application rows.
///
/// Every read re-loads the document so sweeps always see current state. Updates
/// are read-modify-write under a process lock and land through a rename of a
/// uniquely named sibling temp file, so readers observe either the old or the
/// new document. Tables and row fields the pipeline does not model are carried
/// through writes untouched.
#[derive(Debug)]
pub struct JsonFileApplicationRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    plans: Vec<Plan>,
    #[serde(default)]
    applications: Vec<ApplicationRow>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApplicationRow {
    id: ApplicationId,
    status: ApplicationStatus,
    #[serde(default)]
    plan_id: Option<PlanId>,
    #[serde(flatten)]
    address: ServiceAddress,
    #[serde(default)]
    order_id: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ApplicationRow {
    fn hydrate(&self, plans: &HashMap<&PlanId, &Plan>) -> Application {
        let plan = self
            .plan_id
            .as_ref()
            .and_then(|plan_id| plans.get(plan_id))
            .map(|plan| (*plan).clone());

        Application {
            id: self.id.clone(),
            status: self.status,
            plan,
            address: self.address.clone(),
            order_id: self.order_id.clone(),
            created_at: self.created_at,
        }
    }
}

impl RegistryDocument {
    fn plan_index(&self) -> HashMap<&PlanId, &Plan> {
        self.plans.iter().map(|plan| (&plan.id, plan)).collect()
    }

    fn applications(&self) -> Vec<Application> {
        let plans = self.plan_index();
        self.applications
            .iter()
            .map(|row| row.hydrate(&plans))
            .collect()
    }
}

impl JsonFileApplicationRegistry {
    /// Opens an existing registry document, validating that it parses.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let registry = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        registry.load()?;
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RegistryDocument, RegistryError> {
        let raw = fs::read(&self.path).map_err(|err| {
            RegistryError::Unavailable(format!("{}: {err}", self.path.display()))
        })?;
        serde_json::from_slice(&raw).map_err(|err| {
            RegistryError::Malformed(format!("{}: {err}", self.path.display()))
        })
    }

    fn store(&self, document: &RegistryDocument) -> Result<(), RegistryError> {
        let encoded = serde_json::to_vec_pretty(document)
            .map_err(|err| RegistryError::Malformed(err.to_string()))?;

        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut staging = NamedTempFile::new_in(parent).map_err(|err| {
            RegistryError::Unavailable(format!("{}: {err}", parent.display()))
        })?;
        staging.write_all(&encoded).map_err(|err| {
            RegistryError::Unavailable(format!("{}: {err}", staging.path().display()))
        })?;
        staging.persist(&self.path).map_err(|err| {
            RegistryError::Unavailable(format!("{}: {}", self.path.display(), err.error))
        })?;
        Ok(())
    }
}

impl ApplicationRegistry for JsonFileApplicationRegistry {
    fn find_eligible(
        &self,
        status: ApplicationStatus,
        plan_type: PlanType,
    ) -> Result<Vec<Application>, RegistryError> {
        let mut matches: Vec<Application> = self
            .load()?
            .applications()
            .into_iter()
            .filter(|application| {
                application.status == status && application.plan_type() == Some(plan_type)
            })
            .collect();
        sort_oldest_first(&mut matches);
        Ok(matches)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RegistryError> {
        let document = self.load()?;
        let plans = document.plan_index();
        Ok(document
            .applications
            .iter()
            .find(|row| &row.id == id)
            .map(|row| row.hydrate(&plans)))
    }

    fn update(
        &self,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<Application, RegistryError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.load()?;
        let index = document
            .applications
            .iter()
            .position(|row| &row.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        let mut application = {
            let plans = document.plan_index();
            document.applications[index].hydrate(&plans)
        };
        application.apply(&update)?;

        let row = &mut document.applications[index];
        row.status = application.status;
        row.order_id = application.order_id.clone();

        self.store(&document)?;
        Ok(application)
    }
}
