// storefront/src/clock.rs

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::fmt;

/// Wall-clock source. Injected so the schedule window, refund window and
/// notification dedupe window can be driven deterministically in tests.
pub trait Clock: Send + Sync + fmt::Debug {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Settable clock for tests and local runs.
#[derive(Debug)]
pub struct FixedClock(RwLock<DateTime<Utc>>);

impl FixedClock {
  pub fn new(at: DateTime<Utc>) -> Self {
    FixedClock(RwLock::new(at))
  }

  pub fn set(&self, at: DateTime<Utc>) {
    *self.0.write() = at;
  }

  pub fn advance(&self, by: Duration) {
    let mut guard = self.0.write();
    *guard += by;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    *self.0.read()
  }
}
