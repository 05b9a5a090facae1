use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::Application;

/// Status token the gateway returns for an accepted order.
pub const SUCCESSFUL_STATUS: &str = "Successful";

/// JSON body posted to the order gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub plan_name: String,
}

impl OrderRequest {
    pub fn for_application(application: &Application, plan_name: &str) -> Self {
        let address = &application.address;
        Self {
            address_1: address.address_1.clone(),
            address_2: address.address_2.clone().unwrap_or_default(),
            city: address.city.clone(),
            state: address.state.clone(),
            postcode: address.postcode.clone(),
            plan_name: plan_name.to_string(),
        }
    }
}

/// Raw gateway reply. `body` is `None` when it was absent or not valid JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl GatewayResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Order id under `order_id`, else `id`, coerced to a non-blank string.
    pub fn order_id(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        let value = match body.get("order_id") {
            Some(value) if !value.is_null() => value,
            _ => body.get("id")?,
        };

        let coerced = match value {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            _ => return None,
        };
        (!coerced.trim().is_empty()).then_some(coerced)
    }

    pub fn status_token(&self) -> Option<&str> {
        self.body.as_ref()?.get("status")?.as_str()
    }

    /// Accepts the reply only when it is 2xx, carries an order id, and reports `Successful`.
    pub fn confirmation(&self) -> Result<String, OrderRejection> {
        if !self.is_success() {
            return Err(OrderRejection::HttpStatus(self.status));
        }
        let order_id = self.order_id().ok_or(OrderRejection::MissingOrderId)?;
        match self.status_token() {
            Some(token) if token.eq_ignore_ascii_case(SUCCESSFUL_STATUS) => Ok(order_id),
            other => Err(OrderRejection::UnexpectedStatus(other.map(str::to_string))),
        }
    }
}

/// Why a gateway reply did not confirm an order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderRejection {
    #[error("gateway responded with HTTP {0}")]
    HttpStatus(u16),
    #[error("gateway response carried no order id")]
    MissingOrderId,
    #[error("gateway reported order status {0:?}")]
    UnexpectedStatus(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("order gateway request timed out")]
    Timeout,
    #[error("order gateway transport failure: {0}")]
    Transport(String),
    #[error("order gateway client could not be built: {0}")]
    Client(String),
}

/// Outbound order placement. One call is one attempt; implementations never retry.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn place_order(
        &self,
        endpoint: &str,
        request: &OrderRequest,
    ) -> Result<GatewayResponse, GatewayError>;
}

/// reqwest-backed gateway client. The timeout bounds each call end to end.
#[derive(Debug, Clone)]
pub struct HttpOrderGateway {
    client: reqwest::Client,
}

impl HttpOrderGateway {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Client(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn place_order(
        &self,
        endpoint: &str,
        request: &OrderRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice::<Value>(&bytes).ok(),
            Err(err) if err.is_timeout() => return Err(GatewayError::Timeout),
            Err(_) => None,
        };

        Ok(GatewayResponse::new(status, body))
    }
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}
