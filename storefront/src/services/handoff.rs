// storefront/src/services/handoff.rs

use moka::sync::Cache;
use std::time::Duration;
use tracing::debug;

/// Holds the gateway reference of a payment started before its order exists.
///
/// One slot per checkout session. Written once after a successful initiation,
/// consumed once when the order is linked; `consume` clears the slot. Slots of
/// shoppers who never come back expire after the configured TTL.
pub struct PaymentHandoff {
  slots: Cache<String, String>,
}

impl PaymentHandoff {
  pub fn new(ttl: Duration) -> Self {
    Self {
      slots: Cache::builder().time_to_live(ttl).build(),
    }
  }

  pub fn set(&self, session_id: &str, reference: impl Into<String>) {
    let reference = reference.into();
    debug!(session_id, %reference, "Payment reference handed off.");
    self.slots.insert(session_id.to_string(), reference);
  }

  pub fn peek(&self, session_id: &str) -> Option<String> {
    self.slots.get(session_id)
  }

  pub fn consume(&self, session_id: &str) -> Option<String> {
    self.slots.remove(session_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn consume_empties_the_slot() {
    let handoff = PaymentHandoff::new(Duration::from_secs(60));
    handoff.set("s1", "PAY-77");
    assert_eq!(handoff.peek("s1").as_deref(), Some("PAY-77"));
    assert_eq!(handoff.consume("s1").as_deref(), Some("PAY-77"));
    assert_eq!(handoff.consume("s1"), None);
    assert_eq!(handoff.peek("s2"), None);
  }

  #[test]
  fn abandoned_slot_expires() {
    let handoff = PaymentHandoff::new(Duration::from_millis(50));
    handoff.set("s1", "PAY-78");
    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(handoff.peek("s1"), None);
    assert_eq!(handoff.consume("s1"), None);
  }
}
