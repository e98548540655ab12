// storefront/src/notifications/events.rs

//! Typed notification events.
//!
//! The wire carries a `type` string and a free-form `meta` object. Each known
//! type has its own meta shape; anything that doesn't fit becomes
//! [`NotificationEvent::Other`], which still keeps whatever order context the
//! meta carried.

use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemLine {
  #[serde(alias = "product_name")]
  pub name: String,
  #[serde(default = "one")]
  pub quantity: i64,
  #[serde(default)]
  pub price: i64,
}

fn one() -> i64 {
  1
}

/// Order details a notification can mention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrderContext {
  pub order_id: Option<Uuid>,
  pub order_number: Option<String>,
  pub items: Vec<ItemLine>,
  pub total: Option<i64>,
  pub delivery_address: Option<String>,
}

impl OrderContext {
  /// Whatever order context `meta` holds; empty when it holds none.
  pub fn from_meta(meta: &Value) -> Self {
    serde_json::from_value(meta.clone()).unwrap_or_default()
  }

  /// Explicit total, or the sum over the items.
  pub fn total(&self) -> Option<i64> {
    self.total.or_else(|| {
      (!self.items.is_empty()).then(|| self.items.iter().map(|i| i.price * i.quantity).sum())
    })
  }

  /// `ORD-...` when known, otherwise the first eight characters of the id.
  pub fn label(&self) -> Option<String> {
    self.order_number.clone().or_else(|| {
      self.order_id.map(|id| {
        let simple = id.simple().to_string();
        format!("#{}", &simple[..8])
      })
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusChange {
  #[serde(flatten)]
  pub order: OrderContext,
  pub status: String,
  #[serde(default)]
  pub previous_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Assignment {
  #[serde(flatten)]
  pub order: OrderContext,
  #[serde(default)]
  pub rider_name: Option<String>,
  #[serde(default)]
  pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderPlaced {
  #[serde(flatten)]
  pub order: OrderContext,
  #[serde(default)]
  pub customer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Refund {
  #[serde(flatten)]
  pub order: OrderContext,
  #[serde(default)]
  pub reason: Option<String>,
  #[serde(default)]
  pub amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Promotion {
  pub message: String,
  #[serde(default)]
  pub headline: Option<String>,
  #[serde(default)]
  pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SystemNotice {
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "meta", rename_all = "snake_case")]
pub enum NotificationEvent {
  OrderStatusChange(StatusChange),
  AssignmentCreated(Assignment),
  AssignmentAccepted(Assignment),
  AssignmentRejected(Assignment),
  OrderCreated(OrderPlaced),
  OrderDelivered(OrderContext),
  RefundRequested(Refund),
  RefundApproved(Refund),
  Promotion(Promotion),
  System(SystemNotice),
  OrderAssigned(Assignment),
  #[serde(skip)]
  Other { kind: String, order: OrderContext },
}

impl NotificationEvent {
  pub fn from_parts(kind: &str, meta: &Value) -> Self {
    let meta = if meta.is_null() { json!({}) } else { meta.clone() };
    serde_json::from_value(json!({ "type": kind, "meta": meta })).unwrap_or_else(|_| NotificationEvent::Other {
      kind: kind.to_string(),
      order: OrderContext::from_meta(&meta),
    })
  }

  pub fn order(&self) -> Option<&OrderContext> {
    match self {
      NotificationEvent::OrderStatusChange(e) => Some(&e.order),
      NotificationEvent::AssignmentCreated(e)
      | NotificationEvent::AssignmentAccepted(e)
      | NotificationEvent::AssignmentRejected(e)
      | NotificationEvent::OrderAssigned(e) => Some(&e.order),
      NotificationEvent::OrderCreated(e) => Some(&e.order),
      NotificationEvent::OrderDelivered(order) => Some(order),
      NotificationEvent::RefundRequested(e) | NotificationEvent::RefundApproved(e) => Some(&e.order),
      NotificationEvent::Other { order, .. } => Some(order),
      NotificationEvent::Promotion(_) | NotificationEvent::System(_) => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_type_with_matching_meta() {
    let event = NotificationEvent::from_parts(
      "order_status_change",
      &json!({ "order_number": "ORD-20260520-0A1B2C", "status": "shipped" }),
    );
    match event {
      NotificationEvent::OrderStatusChange(e) => {
        assert_eq!(e.status, "shipped");
        assert_eq!(e.order.order_number.as_deref(), Some("ORD-20260520-0A1B2C"));
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn misshapen_meta_falls_back_but_keeps_order_context() {
    let event = NotificationEvent::from_parts(
      "order_status_change",
      &json!({ "order_number": "ORD-1", "items": [{ "product_name": "Ibirayi", "quantity": 3, "price": 500 }] }),
    );
    match event {
      NotificationEvent::Other { kind, order } => {
        assert_eq!(kind, "order_status_change");
        assert_eq!(order.total(), Some(1_500));
        assert_eq!(order.items[0].name, "Ibirayi");
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn unknown_type_and_null_meta() {
    assert_eq!(
      NotificationEvent::from_parts("weekly_digest", &Value::Null),
      NotificationEvent::Other {
        kind: "weekly_digest".into(),
        order: OrderContext::default()
      }
    );
  }
}
