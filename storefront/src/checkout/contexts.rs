// storefront/src/checkout/contexts.rs

//! Data the checkout flow and its payment branches operate on.
//! Handlers receive these wrapped in `iduka_flow::ContextData`.

use crate::acceptance::CachedAcceptance;
use crate::checkout::validation::FieldErrors;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::models::{CartLine, NewOrder, Order, PaymentMethod};
use crate::notifications::NotificationService;
use crate::services::gateway::GatewayCartLine;
use crate::services::{CartStore, Mailer, OrderStore, PaymentGateway, PaymentHandoff};
use iduka_flow::ContextData;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Submitted checkout form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
  #[serde(default)]
  pub cart: Vec<CartLine>,
  #[serde(default)]
  pub customer_name: String,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub city: String,
  pub payment_method: PaymentMethod,
  #[serde(default)]
  pub delivery_notes: Option<String>,
  /// Shopper accepted delivery in the next business window.
  #[serde(default)]
  pub acknowledge_schedule: bool,
  /// Set when returning from the hosted payment page with a completed payment.
  #[serde(default)]
  pub payment_verified: bool,
  /// Existing order whose failed payment is being retried.
  #[serde(default)]
  pub retry_order_id: Option<Uuid>,
}

/// Everything the checkout handlers call out to.
pub struct CheckoutDeps {
  pub config: Arc<AppConfig>,
  pub acceptance: Arc<CachedAcceptance>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub handoff: Arc<PaymentHandoff>,
  pub orders: Arc<dyn OrderStore>,
  pub carts: Arc<dyn CartStore>,
  pub mailer: Arc<dyn Mailer>,
  pub notifications: Arc<NotificationService>,
  pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
  DisabledByAdmin,
  NeedsScheduleAcknowledgment,
}

/// Sub-context of the `dispatch_payment` branches.
pub struct PaymentAttempt {
  pub deps: Arc<CheckoutDeps>,
  pub session_id: String,
  pub user_id: Option<Uuid>,
  pub amount: i64,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub payment_method: PaymentMethod,
  pub redirect_url: String,
  pub cart: Vec<GatewayCartLine>,
  pub retry_order_id: Option<Uuid>,

  pub reference: Option<String>,
  pub redirect_to: Option<String>,
  pub failure: Option<String>,
  pub verified: bool,
}

impl PaymentAttempt {
  pub fn new(deps: Arc<CheckoutDeps>, session_id: impl Into<String>, user_id: Option<Uuid>) -> Self {
    Self {
      deps,
      session_id: session_id.into(),
      user_id,
      amount: 0,
      customer_name: String::new(),
      customer_email: String::new(),
      customer_phone: String::new(),
      payment_method: PaymentMethod::CashOnDelivery,
      redirect_url: String::new(),
      cart: Vec::new(),
      retry_order_id: None,
      reference: None,
      redirect_to: None,
      failure: None,
      verified: false,
    }
  }
}

/// Main checkout context.
pub struct CheckoutContext {
  pub deps: Arc<CheckoutDeps>,
  pub session_id: String,
  pub user_id: Option<Uuid>,
  pub form: CheckoutForm,

  pub field_errors: FieldErrors,
  pub blocked: Option<(BlockReason, String)>,
  pub schedule_note: Option<String>,
  pub new_order: Option<NewOrder>,
  pub payment: ContextData<PaymentAttempt>,
  pub order: Option<Order>,

  pub warnings: Vec<String>,
  pub navigate_to: Option<String>,
  pub message: Option<String>,
}

impl CheckoutContext {
  pub fn new(deps: Arc<CheckoutDeps>, session_id: &str, user_id: Option<Uuid>, form: CheckoutForm) -> Self {
    let payment = ContextData::new(PaymentAttempt::new(Arc::clone(&deps), session_id, user_id));
    Self {
      deps,
      session_id: session_id.to_string(),
      user_id,
      form,
      field_errors: FieldErrors::default(),
      blocked: None,
      schedule_note: None,
      new_order: None,
      payment,
      order: None,
      warnings: Vec::new(),
      navigate_to: None,
      message: None,
    }
  }
}
