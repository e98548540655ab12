// storefront/src/state.rs

use crate::acceptance::{AcceptanceSchedule, CachedAcceptance, OrderAcceptanceService};
use crate::checkout::{CheckoutDeps, CheckoutService};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use crate::notifications::{NotificationService, NotifyDeps};
use crate::services::{
  CartStore, HttpPaymentGateway, InMemoryCartStore, InMemoryNotificationStore, InMemoryOrderStore,
  InMemorySettingsStore, LogMailer, Mailer, NotificationStore, OrderStore, PaymentGateway, PaymentHandoff,
  PgNotificationStore, PgOrderStore, PgSettingsStore, SettingsStore,
};
use iduka_flow::FlowRegistry;
use sqlx::PgPool;
use std::sync::Arc;

/// Storage and outbound integrations the services are built on.
pub struct Backends {
  pub settings: Arc<dyn SettingsStore>,
  pub orders: Arc<dyn OrderStore>,
  pub carts: Arc<dyn CartStore>,
  pub notifications: Arc<dyn NotificationStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub mailer: Arc<dyn Mailer>,
  pub clock: Arc<dyn Clock>,
}

fn http_gateway(config: &AppConfig) -> AppResult<Arc<dyn PaymentGateway>> {
  let gateway = HttpPaymentGateway::new(config.payment_api_base_url.clone(), config.payment_api_key.clone())?;
  Ok(Arc::new(gateway))
}

impl Backends {
  pub fn in_memory(config: &AppConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
    Ok(Self {
      settings: Arc::new(InMemorySettingsStore::default()),
      orders: Arc::new(InMemoryOrderStore::new(Arc::clone(&clock))),
      carts: Arc::new(InMemoryCartStore::default()),
      notifications: Arc::new(InMemoryNotificationStore::default()),
      gateway: http_gateway(config)?,
      mailer: Arc::new(LogMailer::new(config.mail_sender.clone())),
      clock,
    })
  }

  /// Postgres-backed stores. Carts stay in memory; they are per-session drafts.
  pub fn postgres(pool: PgPool, config: &AppConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
    Ok(Self {
      settings: Arc::new(PgSettingsStore::new(pool.clone())),
      orders: Arc::new(PgOrderStore::new(pool.clone(), Arc::clone(&clock))),
      carts: Arc::new(InMemoryCartStore::default()),
      notifications: Arc::new(PgNotificationStore::new(pool)),
      gateway: http_gateway(config)?,
      mailer: Arc::new(LogMailer::new(config.mail_sender.clone())),
      clock,
    })
  }
}

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub acceptance: Arc<CachedAcceptance>,
  pub checkout: Arc<CheckoutService>,
  pub orders: Arc<dyn OrderStore>,
  pub carts: Arc<dyn CartStore>,
  pub notifications: Arc<NotificationService>,
  pub clock: Arc<dyn Clock>,
}

impl AppState {
  /// Wires the services and registers their pipelines.
  pub fn build(config: Arc<AppConfig>, backends: Backends) -> Self {
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    let clock = backends.clock;

    let schedule = AcceptanceSchedule::new(
      config.ordering_opens_at,
      config.ordering_closes_at,
      config.store_utc_offset,
    );
    let acceptance = Arc::new(CachedAcceptance::new(
      Arc::new(OrderAcceptanceService::new(backends.settings, schedule, Arc::clone(&clock))),
      config.acceptance_cache_ttl,
    ));

    let notifications = Arc::new(NotificationService::new(
      Arc::clone(&flows),
      NotifyDeps {
        store: backends.notifications,
        clock: Arc::clone(&clock),
        dedupe_window: config.notification_dedupe_window,
      },
    ));

    let checkout_deps = Arc::new(CheckoutDeps {
      config: Arc::clone(&config),
      acceptance: Arc::clone(&acceptance),
      gateway: backends.gateway,
      handoff: Arc::new(PaymentHandoff::new(config.payment_handoff_ttl)),
      orders: Arc::clone(&backends.orders),
      carts: Arc::clone(&backends.carts),
      mailer: backends.mailer,
      notifications: Arc::clone(&notifications),
      clock: Arc::clone(&clock),
    });
    let checkout = Arc::new(CheckoutService::new(Arc::clone(&flows), checkout_deps));

    Self {
      config,
      flows,
      acceptance,
      checkout,
      orders: backends.orders,
      carts: backends.carts,
      notifications,
      clock,
    }
  }
}
