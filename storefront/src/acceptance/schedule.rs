// storefront/src/acceptance/schedule.rs

use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeZone, Utc};

/// Daily ordering window in store-local time. Open on `[opens_at, closes_at)`;
/// a window whose close is before its open wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptanceSchedule {
  pub opens_at: NaiveTime,
  pub closes_at: NaiveTime,
  pub utc_offset: FixedOffset,
}

impl AcceptanceSchedule {
  pub fn new(opens_at: NaiveTime, closes_at: NaiveTime, utc_offset: FixedOffset) -> Self {
    Self {
      opens_at,
      closes_at,
      utc_offset,
    }
  }

  fn open_at_local_time(&self, t: NaiveTime) -> bool {
    if self.opens_at <= self.closes_at {
      self.opens_at <= t && t < self.closes_at
    } else {
      t >= self.opens_at || t < self.closes_at
    }
  }

  pub fn is_open(&self, now: DateTime<Utc>) -> bool {
    self.open_at_local_time(now.with_timezone(&self.utc_offset).time())
  }

  /// The next instant the window opens (when closed) or closes (when open).
  pub fn next_toggle_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if self.opens_at == self.closes_at {
      return None;
    }
    let boundary = if self.is_open(now) { self.closes_at } else { self.opens_at };
    let today = now.with_timezone(&self.utc_offset).date_naive();

    [0u64, 1]
      .into_iter()
      .filter_map(|d| today.checked_add_days(Days::new(d)))
      .filter_map(|date| self.utc_offset.from_local_datetime(&date.and_time(boundary)).single())
      .map(|at| at.with_timezone(&Utc))
      .find(|at| *at > now)
  }
}
