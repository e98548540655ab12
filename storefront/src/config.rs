// storefront/src/config.rs

use crate::errors::{AppError, Result};
use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Absent means the in-memory stores are used.
  pub database_url: Option<String>,
  pub app_base_url: String,

  pub payment_api_base_url: String,
  pub payment_api_key: Option<String>,
  /// How long an initiated payment's reference waits for the shopper to return.
  pub payment_handoff_ttl: Duration,

  pub ordering_opens_at: NaiveTime,
  pub ordering_closes_at: NaiveTime,
  pub store_utc_offset: FixedOffset,
  pub acceptance_cache_ttl: Duration,

  pub notification_dedupe_window: Duration,

  pub delivery_fee_rwf: i64,
  pub guest_email_domain: String,
  pub mail_sender: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: None,
      app_base_url: "http://127.0.0.1:8080".to_string(),
      payment_api_base_url: "http://127.0.0.1:8090/api/payments".to_string(),
      payment_api_key: None,
      payment_handoff_ttl: Duration::from_secs(60 * 60),
      ordering_opens_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
      ordering_closes_at: NaiveTime::from_hms_opt(21, 30, 0).unwrap_or_default(),
      store_utc_offset: FixedOffset::east_opt(2 * 3600).unwrap_or_else(|| Utc.fix()),
      acceptance_cache_ttl: Duration::from_secs(15),
      notification_dedupe_window: Duration::from_secs(30),
      delivery_fee_rwf: 1_500,
      guest_email_domain: "iduka.rw".to_string(),
      mail_sender: "orders@iduka.rw".to_string(),
    }
  }
}

fn parse_time(var_name: &str, raw: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(raw, "%H:%M")
    .map_err(|e| AppError::Config(format!("Invalid {} '{}' (expected HH:MM): {}", var_name, raw, e)))
}

fn parse_secs(var_name: &str, raw: &str) -> Result<Duration> {
  raw
    .parse::<u64>()
    .map(Duration::from_secs)
    .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    let defaults = Self::default();

    let get_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or(defaults.server_host);
    let server_port = match get_env("SERVER_PORT") {
      Some(raw) => raw
        .parse::<u16>()
        .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?,
      None => defaults.server_port,
    };
    let database_url = get_env("DATABASE_URL");
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

    let payment_api_base_url = get_env("PAYMENT_API_BASE_URL").unwrap_or(defaults.payment_api_base_url);
    let payment_api_key = get_env("PAYMENT_API_KEY");
    let payment_handoff_ttl = match get_env("PAYMENT_HANDOFF_TTL_SECS") {
      Some(raw) => parse_secs("PAYMENT_HANDOFF_TTL_SECS", &raw)?,
      None => defaults.payment_handoff_ttl,
    };

    let ordering_opens_at = match get_env("ORDERING_OPENS_AT") {
      Some(raw) => parse_time("ORDERING_OPENS_AT", &raw)?,
      None => defaults.ordering_opens_at,
    };
    let ordering_closes_at = match get_env("ORDERING_CLOSES_AT") {
      Some(raw) => parse_time("ORDERING_CLOSES_AT", &raw)?,
      None => defaults.ordering_closes_at,
    };
    let store_utc_offset = match get_env("STORE_UTC_OFFSET_HOURS") {
      Some(raw) => {
        let hours = raw
          .parse::<i32>()
          .map_err(|e| AppError::Config(format!("Invalid STORE_UTC_OFFSET_HOURS: {}", e)))?;
        FixedOffset::east_opt(hours * 3600)
          .ok_or_else(|| AppError::Config(format!("STORE_UTC_OFFSET_HOURS out of range: {}", hours)))?
      }
      None => defaults.store_utc_offset,
    };
    let acceptance_cache_ttl = match get_env("ACCEPTANCE_CACHE_TTL_SECS") {
      Some(raw) => parse_secs("ACCEPTANCE_CACHE_TTL_SECS", &raw)?,
      None => defaults.acceptance_cache_ttl,
    };
    let notification_dedupe_window = match get_env("NOTIFICATION_DEDUPE_SECS") {
      Some(raw) => parse_secs("NOTIFICATION_DEDUPE_SECS", &raw)?,
      None => defaults.notification_dedupe_window,
    };
    let delivery_fee_rwf = match get_env("DELIVERY_FEE_RWF") {
      Some(raw) => raw
        .parse::<i64>()
        .ok()
        .filter(|fee| *fee >= 0)
        .ok_or_else(|| AppError::Config(format!("Invalid DELIVERY_FEE_RWF: {}", raw)))?,
      None => defaults.delivery_fee_rwf,
    };
    let guest_email_domain = get_env("GUEST_EMAIL_DOMAIN").unwrap_or(defaults.guest_email_domain);
    let mail_sender = get_env("MAIL_SENDER").unwrap_or(defaults.mail_sender);

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      payment_api_base_url,
      payment_api_key,
      payment_handoff_ttl,
      ordering_opens_at,
      ordering_closes_at,
      store_utc_offset,
      acceptance_cache_ttl,
      notification_dedupe_window,
      delivery_fee_rwf,
      guest_email_domain,
      mail_sender,
    })
  }
}
