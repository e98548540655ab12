// storefront/src/services/gateway.rs

//! Payment gateway client.
//!
//! The gateway hosts the actual checkout page. We initiate or retry a payment
//! session, receive a reference (and usually a hosted `checkoutUrl`), and once
//! the order exists we link that reference to it.

use crate::errors::GatewayError;
use crate::models::PaymentMethod;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCartLine {
  pub name: String,
  pub quantity: i64,
  pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
  pub amount: i64,
  pub customer_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_email: Option<String>,
  pub customer_phone: String,
  pub payment_method: PaymentMethod,
  pub redirect_url: String,
  pub cart: Vec<GatewayCartLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPaymentRequest {
  pub order_id: Uuid,
  pub amount: i64,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub payment_method: PaymentMethod,
  pub redirect_url: String,
}

fn check_shape(amount: i64, customer_name: &str, customer_phone: &str) -> Result<(), GatewayError> {
  if amount <= 0 {
    return Err(GatewayError::InvalidRequest(format!("amount must be positive, got {amount}")));
  }
  if customer_name.trim().is_empty() {
    return Err(GatewayError::InvalidRequest("customer name is required".to_string()));
  }
  if customer_phone.trim().is_empty() {
    return Err(GatewayError::InvalidRequest("customer phone is required".to_string()));
  }
  Ok(())
}

impl InitiatePaymentRequest {
  pub fn validate(&self) -> Result<(), GatewayError> {
    check_shape(self.amount, &self.customer_name, &self.customer_phone)
  }
}

impl RetryPaymentRequest {
  pub fn validate(&self) -> Result<(), GatewayError> {
    check_shape(self.amount, &self.customer_name, &self.customer_phone)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayResponse {
  pub success: bool,
  pub reference: Option<String>,
  pub checkout_url: Option<String>,
  pub session_id: Option<String>,
  pub payment_id: Option<String>,
  pub error: Option<String>,
}

impl GatewayResponse {
  /// Turns a `success: false` body into an error carrying the gateway's own text.
  pub fn into_result(self) -> Result<Self, GatewayError> {
    if self.success {
      Ok(self)
    } else {
      Err(GatewayError::Rejected(
        self.error.unwrap_or_else(|| "payment was not accepted".to_string()),
      ))
    }
  }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn initiate(&self, request: &InitiatePaymentRequest) -> Result<GatewayResponse, GatewayError>;

  async fn retry(&self, request: &RetryPaymentRequest) -> Result<GatewayResponse, GatewayError>;

  /// Associates `reference` with an order.
  async fn link(&self, order_id: Uuid, reference: &str) -> Result<(), GatewayError>;

  /// Resolves a reference to the gateway's payment id.
  async fn lookup_status(&self, reference: &str) -> Result<String, GatewayError>;

  async fn attach_order(&self, payment_id: &str, order_id: Uuid) -> Result<(), GatewayError>;
}

/// `reqwest` implementation against the payments API.
pub struct HttpPaymentGateway {
  client: Client,
  base_url: String,
  api_key: Option<String>,
}

impl HttpPaymentGateway {
  pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, GatewayError> {
    let client = Client::builder().timeout(Duration::from_secs(20)).build()?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      api_key,
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path.trim_start_matches('/'))
  }

  /// `{base}/payments/{payment_id}` with the id escaped as one path segment.
  fn payment_url(&self, payment_id: &str) -> Result<Url, GatewayError> {
    let mut url = Url::parse(&self.base_url)
      .map_err(|e| GatewayError::InvalidRequest(format!("invalid gateway base url: {e}")))?;
    url
      .path_segments_mut()
      .map_err(|()| GatewayError::InvalidRequest("gateway base url cannot take a path".to_string()))?
      .pop_if_empty()
      .extend(["payments", payment_id]);
    Ok(url)
  }

  async fn send(&self, request: reqwest::RequestBuilder) -> Result<GatewayResponse, GatewayError> {
    let request = match &self.api_key {
      Some(key) => request.bearer_auth(key),
      None => request,
    };
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    // Error statuses are accepted only when they carry a gateway error message.
    let parsed = serde_json::from_str::<GatewayResponse>(&body);
    match parsed {
      Ok(parsed) if status.is_success() || parsed.error.is_some() => Ok(parsed),
      Ok(_) => Err(GatewayError::UnexpectedResponse {
        status: status.as_u16(),
        body,
      }),
      Err(e) => Err(GatewayError::UnexpectedResponse {
        status: status.as_u16(),
        body: format!("{e}: {body}"),
      }),
    }
  }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
  #[instrument(name = "gateway::initiate", skip_all, fields(amount = request.amount, method = %request.payment_method))]
  async fn initiate(&self, request: &InitiatePaymentRequest) -> Result<GatewayResponse, GatewayError> {
    request.validate()?;
    let response = self.send(self.client.post(self.url("initiate")).json(request)).await?;
    debug!(reference = ?response.reference, success = response.success, "Initiation answered.");
    Ok(response)
  }

  #[instrument(name = "gateway::retry", skip_all, fields(order_id = %request.order_id))]
  async fn retry(&self, request: &RetryPaymentRequest) -> Result<GatewayResponse, GatewayError> {
    request.validate()?;
    self.send(self.client.post(self.url("retry")).json(request)).await
  }

  #[instrument(name = "gateway::link", skip(self))]
  async fn link(&self, order_id: Uuid, reference: &str) -> Result<(), GatewayError> {
    let body = json!({ "orderId": order_id, "reference": reference });
    self.send(self.client.post(self.url("link")).json(&body)).await?.into_result()?;
    Ok(())
  }

  #[instrument(name = "gateway::lookup_status", skip(self))]
  async fn lookup_status(&self, reference: &str) -> Result<String, GatewayError> {
    let body = json!({ "reference": reference });
    let response = self.send(self.client.post(self.url("status")).json(&body)).await?;
    response.payment_id.ok_or_else(|| {
      warn!(reference, "Status lookup returned no payment id.");
      GatewayError::Rejected(response.error.unwrap_or_else(|| format!("no payment found for {reference}")))
    })
  }

  #[instrument(name = "gateway::attach_order", skip(self))]
  async fn attach_order(&self, payment_id: &str, order_id: Uuid) -> Result<(), GatewayError> {
    let body = json!({ "order_id": order_id });
    let url = self.payment_url(payment_id)?;
    let response = self.send(self.client.patch(url).json(&body)).await?;
    if let Some(error) = response.error {
      return Err(GatewayError::Rejected(error));
    }
    Ok(())
  }
}
