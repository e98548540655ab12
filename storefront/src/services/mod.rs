// storefront/src/services/mod.rs

pub mod carts;
pub mod gateway;
pub mod handoff;
pub mod mailer;
pub mod notification_store;
pub mod orders;
pub mod settings;

pub use carts::{CartStore, InMemoryCartStore};
pub use gateway::{GatewayResponse, HttpPaymentGateway, InitiatePaymentRequest, PaymentGateway, RetryPaymentRequest};
pub use handoff::PaymentHandoff;
pub use mailer::{LogMailer, Mailer};
pub use notification_store::{InMemoryNotificationStore, NotificationStore, PgNotificationStore};
pub use orders::{InMemoryOrderStore, OrderStore, PgOrderStore};
pub use settings::{InMemorySettingsStore, PgSettingsStore, SettingsStore};
