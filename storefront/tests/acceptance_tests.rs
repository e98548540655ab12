// tests/acceptance_tests.rs

mod common;

use chrono::{Duration, TimeZone, Utc};
use common::*;
use iduka_storefront::acceptance::{AcceptanceState, SettingSource};

#[tokio::test]
async fn schedule_drives_the_setting_without_an_override() {
  let h = Harness::open();

  let open = h.state.acceptance.get_fresh().await.unwrap();
  assert!(open.enabled);
  assert_eq!(open.source, SettingSource::Schedule);
  assert_eq!(open.state(), AcceptanceState::Enabled);
  assert_eq!(open.message, None);
  // Closes at 21:30 Kigali time.
  assert_eq!(open.next_toggle_at, Some(Utc.with_ymd_and_hms(2026, 5, 20, 19, 30, 0).unwrap()));

  h.clock.set(closed_hours());
  let closed = h.state.acceptance.get_fresh().await.unwrap();
  assert!(!closed.enabled);
  assert!(closed.schedule_disabled);
  assert_eq!(closed.state(), AcceptanceState::DisabledBySchedule);
  assert!(closed.message.unwrap().contains("2026-05-21 07:00 UTC"));
}

#[tokio::test]
async fn admin_override_wins_until_cleared() {
  let h = Harness::open();

  let off = h.state.acceptance.set_override(false).await.unwrap();
  assert_eq!(off.source, SettingSource::Admin);
  assert_eq!(off.state(), AcceptanceState::DisabledByAdmin);
  assert!(off.message.is_some());

  // The cache is invalidated on write, so the next read sees the override.
  let cached = h.state.acceptance.get().await.unwrap();
  assert_eq!(cached.state(), AcceptanceState::DisabledByAdmin);

  let cleared = h.state.acceptance.clear_override().await.unwrap();
  assert_eq!(cleared.source, SettingSource::Schedule);
  assert_eq!(h.state.acceptance.get().await.unwrap().state(), AcceptanceState::Enabled);
}

#[tokio::test]
async fn admin_enabled_does_not_hide_closed_hours() {
  let h = Harness::at(closed_hours());

  let setting = h.state.acceptance.set_override(true).await.unwrap();

  assert!(setting.enabled);
  assert_eq!(setting.source, SettingSource::Admin);
  assert_eq!(setting.state(), AcceptanceState::DisabledBySchedule);
}

#[tokio::test]
async fn cached_reads_expire() {
  let h = Harness::open();
  assert!(h.state.acceptance.get().await.unwrap().enabled);

  h.clock.advance(Duration::hours(8));
  tokio::time::sleep(std::time::Duration::from_millis(120)).await;

  let after = h.state.acceptance.get().await.unwrap();
  assert_eq!(after.state(), AcceptanceState::DisabledBySchedule);
}
