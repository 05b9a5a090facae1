use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for service applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApplicationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier wrapper for service plans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of plan families offered to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Nbn,
    Opticomm,
    Mobile,
}

impl PlanType {
    pub const fn label(self) -> &'static str {
        match self {
            PlanType::Nbn => "nbn",
            PlanType::Opticomm => "opticomm",
            PlanType::Mobile => "mobile",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan type '{0}' (expected nbn, opticomm or mobile)")]
pub struct UnknownPlanType(pub String);

impl FromStr for PlanType {
    type Err = UnknownPlanType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nbn" => Ok(PlanType::Nbn),
            "opticomm" => Ok(PlanType::Opticomm),
            "mobile" => Ok(PlanType::Mobile),
            _ => Err(UnknownPlanType(value.to_string())),
        }
    }
}

/// Service offering referenced by an application. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    #[serde(default)]
    pub name: Option<String>,
    /// Monthly cost in cents.
    pub monthly_cost: u32,
}

impl Plan {
    /// Display name sent to the gateway, if the plan carries a usable one.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Service address captured on the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub address_1: String,
    #[serde(default)]
    pub address_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
}

/// Lifecycle of an application as far as ordering is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "prelim")]
    Preliminary,
    #[serde(rename = "order")]
    AwaitingOrder,
    #[serde(rename = "complete")]
    Completed,
    #[serde(rename = "order_failed")]
    OrderFailed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Preliminary => "prelim",
            ApplicationStatus::AwaitingOrder => "order",
            ApplicationStatus::Completed => "complete",
            ApplicationStatus::OrderFailed => "order_failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Completed | ApplicationStatus::OrderFailed
        )
    }

    /// Only an application awaiting its order may move, and only to a terminal status.
    pub fn transition_to(self, next: ApplicationStatus) -> Result<ApplicationStatus, IllegalTransition> {
        match (self, next) {
            (ApplicationStatus::AwaitingOrder, ApplicationStatus::Completed)
            | (ApplicationStatus::AwaitingOrder, ApplicationStatus::OrderFailed) => Ok(next),
            (from, to) => Err(IllegalTransition { from, to }),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition from '{from}' to '{to}'")]
pub struct IllegalTransition {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

/// The single write a worker performs once an order attempt resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Completed { order_id: String },
    OrderFailed,
}

impl StatusUpdate {
    pub fn status(&self) -> ApplicationStatus {
        match self {
            StatusUpdate::Completed { .. } => ApplicationStatus::Completed,
            StatusUpdate::OrderFailed => ApplicationStatus::OrderFailed,
        }
    }

    pub fn order_id(&self) -> Option<&str> {
        match self {
            StatusUpdate::Completed { order_id } => Some(order_id),
            StatusUpdate::OrderFailed => None,
        }
    }
}

/// Application as read from the registry, with its plan eagerly loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
    pub plan: Option<Plan>,
    #[serde(flatten)]
    pub address: ServiceAddress,
    #[serde(default)]
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Application {
    pub fn plan_type(&self) -> Option<PlanType> {
        self.plan.as_ref().map(|plan| plan.plan_type)
    }

    pub fn plan_name(&self) -> Option<&str> {
        self.plan.as_ref().and_then(Plan::display_name)
    }

    pub fn is_eligible(&self, qualifying: PlanType) -> bool {
        self.status == ApplicationStatus::AwaitingOrder && self.plan_type() == Some(qualifying)
    }

    /// Applies an order outcome, keeping `order_id` set exactly when the status is `Completed`.
    pub fn apply(&mut self, update: &StatusUpdate) -> Result<(), IllegalTransition> {
        self.status = self.status.transition_to(update.status())?;
        self.order_id = update.order_id().map(str::to_string);
        Ok(())
    }
}
