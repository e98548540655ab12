// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use iduka_storefront::checkout::CheckoutForm;
use iduka_storefront::clock::{Clock, FixedClock};
use iduka_storefront::config::AppConfig;
use iduka_storefront::errors::GatewayError;
use iduka_storefront::models::{CartLine, PaymentMethod, ProductRef};
use iduka_storefront::services::{
  GatewayResponse, InMemoryCartStore, InMemoryNotificationStore, InMemoryOrderStore, InMemorySettingsStore,
  InitiatePaymentRequest, LogMailer, PaymentGateway, RetryPaymentRequest,
};
use iduka_storefront::state::{AppState, Backends};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub const SESSION: &str = "session-1";

/// 14:00 in Kigali: inside the default 09:00-21:30 window.
pub fn open_hours() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
}

/// 22:00 in Kigali: after closing.
pub fn closed_hours() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 5, 20, 20, 0, 0).unwrap()
}

/// Gateway calls seen by [`FakeGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
  Initiate { amount: i64 },
  Retry { order_id: Uuid, amount: i64 },
  Link { order_id: Uuid, reference: String },
  Lookup { reference: String },
  Attach { payment_id: String, order_id: Uuid },
}

/// Scripted payment gateway.
#[derive(Debug)]
pub struct FakeGateway {
  pub response: Mutex<Result<GatewayResponse, GatewayError>>,
  pub link_fails: Mutex<bool>,
  pub lookup_fails: Mutex<bool>,
  pub delay: Mutex<Option<Duration>>,
  pub calls: Mutex<Vec<GatewayCall>>,
}

impl Default for FakeGateway {
  fn default() -> Self {
    Self {
      response: Mutex::new(Ok(hosted_checkout("PAY-1"))),
      link_fails: Mutex::new(false),
      lookup_fails: Mutex::new(false),
      delay: Mutex::new(None),
      calls: Mutex::new(Vec::new()),
    }
  }
}

pub fn hosted_checkout(reference: &str) -> GatewayResponse {
  GatewayResponse {
    success: true,
    reference: Some(reference.to_string()),
    checkout_url: Some(format!("https://pay.example/checkout/{reference}")),
    ..Default::default()
  }
}

impl FakeGateway {
  pub fn respond_with(&self, response: Result<GatewayResponse, GatewayError>) {
    *self.response.lock() = response;
  }

  pub fn fail_linking(&self, link: bool, lookup: bool) {
    *self.link_fails.lock() = link;
    *self.lookup_fails.lock() = lookup;
  }

  pub fn hold_for(&self, delay: Duration) {
    *self.delay.lock() = Some(delay);
  }

  pub fn calls(&self) -> Vec<GatewayCall> {
    self.calls.lock().clone()
  }

  async fn answer(&self) -> Result<GatewayResponse, GatewayError> {
    let delay = *self.delay.lock();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    self.response.lock().clone()
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn initiate(&self, request: &InitiatePaymentRequest) -> Result<GatewayResponse, GatewayError> {
    self.calls.lock().push(GatewayCall::Initiate { amount: request.amount });
    self.answer().await
  }

  async fn retry(&self, request: &RetryPaymentRequest) -> Result<GatewayResponse, GatewayError> {
    self.calls.lock().push(GatewayCall::Retry {
      order_id: request.order_id,
      amount: request.amount,
    });
    self.answer().await
  }

  async fn link(&self, order_id: Uuid, reference: &str) -> Result<(), GatewayError> {
    self.calls.lock().push(GatewayCall::Link {
      order_id,
      reference: reference.to_string(),
    });
    if *self.link_fails.lock() {
      return Err(GatewayError::Transport("link endpoint down".into()));
    }
    Ok(())
  }

  async fn lookup_status(&self, reference: &str) -> Result<String, GatewayError> {
    self.calls.lock().push(GatewayCall::Lookup {
      reference: reference.to_string(),
    });
    if *self.lookup_fails.lock() {
      return Err(GatewayError::Rejected(format!("no payment found for {reference}")));
    }
    Ok(format!("pmt_{reference}"))
  }

  async fn attach_order(&self, payment_id: &str, order_id: Uuid) -> Result<(), GatewayError> {
    self.calls.lock().push(GatewayCall::Attach {
      payment_id: payment_id.to_string(),
      order_id,
    });
    Ok(())
  }
}

/// An [`AppState`] over in-memory stores, with handles to inspect them.
pub struct Harness {
  pub state: AppState,
  pub clock: Arc<FixedClock>,
  pub gateway: Arc<FakeGateway>,
  pub orders: Arc<InMemoryOrderStore>,
  pub carts: Arc<InMemoryCartStore>,
  pub notifications: Arc<InMemoryNotificationStore>,
}

impl Harness {
  pub fn at(now: DateTime<Utc>) -> Self {
    setup_tracing();
    let clock = Arc::new(FixedClock::new(now));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let gateway = Arc::new(FakeGateway::default());
    let orders = Arc::new(InMemoryOrderStore::new(Arc::clone(&dyn_clock)));
    let carts = Arc::new(InMemoryCartStore::default());
    let notifications = Arc::new(InMemoryNotificationStore::default());

    let config = AppConfig {
      acceptance_cache_ttl: Duration::from_millis(50),
      ..AppConfig::default()
    };
    let backends = Backends {
      settings: Arc::new(InMemorySettingsStore::default()),
      orders: orders.clone(),
      carts: carts.clone(),
      notifications: notifications.clone(),
      gateway: gateway.clone(),
      mailer: Arc::new(LogMailer::new(config.mail_sender.clone())),
      clock: dyn_clock,
    };
    let state = AppState::build(Arc::new(config), backends);

    Self {
      state,
      clock,
      gateway,
      orders,
      carts,
      notifications,
    }
  }

  pub fn open() -> Self {
    Self::at(open_hours())
  }
}

pub fn line(name: &str, unit_price: i64, quantity: i64) -> CartLine {
  CartLine {
    product: ProductRef::new(Uuid::new_v4(), None),
    product_name: name.to_string(),
    unit_price,
    quantity,
  }
}

pub fn form(payment_method: PaymentMethod, cart: Vec<CartLine>) -> CheckoutForm {
  CheckoutForm {
    cart,
    customer_name: "Aline Uwase".to_string(),
    email: None,
    phone: "0788123456".to_string(),
    address: "KG 11 Ave 23".to_string(),
    city: "Kigali".to_string(),
    payment_method,
    delivery_notes: None,
    acknowledge_schedule: false,
    payment_verified: false,
    retry_order_id: None,
  }
}

pub fn cash_form() -> CheckoutForm {
  form(PaymentMethod::CashOnDelivery, vec![line("Isombe", 2_000, 2)])
}

pub fn momo_form() -> CheckoutForm {
  form(PaymentMethod::MobileMoney, vec![line("Isombe", 2_000, 2)])
}

/// Lets spawned confirmation tasks run.
pub async fn settle() {
  for _ in 0..10 {
    tokio::task::yield_now().await;
  }
}
