// storefront/src/acceptance/mod.rs

//! Whether the store is taking orders right now.
//!
//! The effective setting combines an optional admin override with the daily
//! schedule. Pages read it through [`CachedAcceptance`]; checkout always asks
//! for a fresh value because the window can close between page load and submit.

pub mod schedule;

pub use schedule::AcceptanceSchedule;

use crate::clock::Clock;
use crate::errors::Result as AppResult;
use crate::services::SettingsStore;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const ADMIN_DISABLED_MESSAGE: &str = "Ordering is temporarily disabled by the store. Please check back later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingSource {
  Admin,
  Schedule,
}

/// Wire shape of `GET /settings/order-acceptance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSetting {
  pub enabled: bool,
  pub source: SettingSource,
  pub schedule_disabled: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_toggle_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceState {
  Enabled,
  DisabledByAdmin,
  DisabledBySchedule,
}

impl EffectiveSetting {
  /// An explicit admin "off" wins; otherwise being outside the window
  /// disables ordering, even when an admin has switched it on.
  pub fn state(&self) -> AcceptanceState {
    if self.source == SettingSource::Admin && !self.enabled {
      AcceptanceState::DisabledByAdmin
    } else if self.schedule_disabled {
      AcceptanceState::DisabledBySchedule
    } else {
      AcceptanceState::Enabled
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptanceDecision {
  Proceed { schedule_note: Option<String> },
  BlockAdmin(String),
  BlockScheduleNeedsAck(String),
}

fn schedule_message(setting: &EffectiveSetting) -> String {
  match setting.next_toggle_at {
    Some(at) => format!(
      "We are closed for new orders right now. Orders placed now will be delivered after we reopen at {}.",
      at.format("%Y-%m-%d %H:%M UTC")
    ),
    None => "We are closed for new orders right now. Orders placed now will be delivered in the next business window."
      .to_string(),
  }
}

/// The checkout gate.
pub fn decide(setting: &EffectiveSetting, acknowledged: bool) -> AcceptanceDecision {
  match setting.state() {
    AcceptanceState::DisabledByAdmin => AcceptanceDecision::BlockAdmin(
      setting.message.clone().unwrap_or_else(|| ADMIN_DISABLED_MESSAGE.to_string()),
    ),
    AcceptanceState::DisabledBySchedule if !acknowledged => {
      AcceptanceDecision::BlockScheduleNeedsAck(schedule_message(setting))
    }
    AcceptanceState::DisabledBySchedule => AcceptanceDecision::Proceed {
      schedule_note: Some(match setting.next_toggle_at {
        Some(at) => format!("Placed outside ordering hours; deliver after {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => "Placed outside ordering hours; deliver in the next business window".to_string(),
      }),
    },
    AcceptanceState::Enabled => AcceptanceDecision::Proceed { schedule_note: None },
  }
}

pub struct OrderAcceptanceService {
  store: Arc<dyn SettingsStore>,
  schedule: AcceptanceSchedule,
  clock: Arc<dyn Clock>,
}

impl OrderAcceptanceService {
  pub fn new(store: Arc<dyn SettingsStore>, schedule: AcceptanceSchedule, clock: Arc<dyn Clock>) -> Self {
    Self { store, schedule, clock }
  }

  pub async fn get(&self) -> AppResult<EffectiveSetting> {
    let now = self.clock.now();
    let admin_override = self.store.acceptance_override().await?;
    let schedule_open = self.schedule.is_open(now);
    let next_toggle_at = self.schedule.next_toggle_at(now);

    let setting = match admin_override {
      Some(enabled) => EffectiveSetting {
        enabled,
        source: SettingSource::Admin,
        schedule_disabled: !schedule_open,
        message: (!enabled).then(|| ADMIN_DISABLED_MESSAGE.to_string()),
        next_toggle_at,
      },
      None => EffectiveSetting {
        enabled: schedule_open,
        source: SettingSource::Schedule,
        schedule_disabled: !schedule_open,
        message: None,
        next_toggle_at,
      },
    };
    let setting = if setting.schedule_disabled && setting.message.is_none() {
      EffectiveSetting {
        message: Some(schedule_message(&setting)),
        ..setting
      }
    } else {
      setting
    };
    Ok(setting)
  }

  pub async fn set_override(&self, enabled: bool) -> AppResult<EffectiveSetting> {
    info!(enabled, "Admin override for order acceptance set.");
    self.store.set_acceptance_override(Some(enabled)).await?;
    self.get().await
  }

  pub async fn clear_override(&self) -> AppResult<EffectiveSetting> {
    info!("Admin override for order acceptance cleared.");
    self.store.set_acceptance_override(None).await?;
    self.get().await
  }
}

/// Short-TTL read-through cache in front of [`OrderAcceptanceService`].
pub struct CachedAcceptance {
  service: Arc<OrderAcceptanceService>,
  cache: Cache<(), EffectiveSetting>,
  /// Bumped by every override write; a refresh that started under an older
  /// generation must not leave its value in the cache.
  generation: AtomicU64,
}

impl CachedAcceptance {
  pub fn new(service: Arc<OrderAcceptanceService>, ttl: Duration) -> Self {
    let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
    Self {
      service,
      cache,
      generation: AtomicU64::new(0),
    }
  }

  pub async fn get(&self) -> AppResult<EffectiveSetting> {
    if let Some(hit) = self.cache.get(&()).await {
      return Ok(hit);
    }
    self.get_fresh().await
  }

  /// Reads past the cache and refreshes it.
  #[instrument(name = "acceptance::get_fresh", skip(self))]
  pub async fn get_fresh(&self) -> AppResult<EffectiveSetting> {
    let started = self.generation.load(Ordering::Acquire);
    let setting = self.service.get().await?;
    debug!(enabled = setting.enabled, source = ?setting.source, "Acceptance setting evaluated.");
    if self.generation.load(Ordering::Acquire) == started {
      self.cache.insert((), setting.clone()).await;
      if self.generation.load(Ordering::Acquire) != started {
        self.cache.invalidate(&()).await;
      }
    }
    Ok(setting)
  }

  pub async fn set_override(&self, enabled: bool) -> AppResult<EffectiveSetting> {
    let setting = self.service.set_override(enabled).await;
    self.invalidate().await;
    setting
  }

  pub async fn clear_override(&self) -> AppResult<EffectiveSetting> {
    let setting = self.service.clear_override().await;
    self.invalidate().await;
    setting
  }

  async fn invalidate(&self) {
    self.generation.fetch_add(1, Ordering::AcqRel);
    self.cache.invalidate(&()).await;
  }
}
