// storefront/src/models/order.rs

use crate::errors::AppError;
use crate::models::order_item::{NewOrderItem, OrderLineItem};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How long after delivery the owner may still ask for a refund.
pub const REFUND_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
  None,
  Requested,
  Approved,
  Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
  #[serde(rename = "cash_on_delivery")]
  CashOnDelivery,
  #[serde(rename = "momo")]
  MobileMoney,
  #[serde(rename = "card")]
  Card,
}

macro_rules! text_enum {
  ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
    impl $ty {
      pub fn as_str(&self) -> &'static str {
        match self {
          $($ty::$variant => $text),+
        }
      }
    }

    impl fmt::Display for $ty {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl FromStr for $ty {
      type Err = AppError;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $($text => Ok($ty::$variant),)+
          other => Err(AppError::Internal(format!("unknown {} '{}'", stringify!($ty), other))),
        }
      }
    }
  };
}

text_enum!(OrderStatus {
  Pending => "pending",
  Processing => "processing",
  Shipped => "shipped",
  Delivered => "delivered",
  Cancelled => "cancelled",
});

text_enum!(RefundStatus {
  None => "none",
  Requested => "requested",
  Approved => "approved",
  Rejected => "rejected",
});

text_enum!(PaymentMethod {
  CashOnDelivery => "cash_on_delivery",
  MobileMoney => "momo",
  Card => "card",
});

impl PaymentMethod {
  pub fn is_cash(&self) -> bool {
    matches!(self, PaymentMethod::CashOnDelivery)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Customer,
  Rider,
  Admin,
}

impl Role {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "customer" => Some(Role::Customer),
      "rider" => Some(Role::Rider),
      "admin" => Some(Role::Admin),
      _ => None,
    }
  }
}

/// Who is acting on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub user_id: Option<Uuid>,
  pub role: Role,
}

impl Actor {
  pub fn admin(user_id: Option<Uuid>) -> Self {
    Self { user_id, role: Role::Admin }
  }

  pub fn customer(user_id: Uuid) -> Self {
    Self {
      user_id: Some(user_id),
      role: Role::Customer,
    }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn owns(&self, order: &Order) -> bool {
    matches!((self.user_id, order.user_id), (Some(actor), Some(owner)) if actor == owner)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
  StartProcessing,
  Ship,
  MarkDelivered,
  Cancel,
  RequestRefund,
  ApproveRefund,
  RejectRefund,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub user_id: Option<Uuid>,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub address: String,
  pub city: String,
  pub subtotal: i64,
  pub delivery_fee: i64,
  pub total: i64,
  pub status: OrderStatus,
  pub refund_status: RefundStatus,
  pub payment_method: PaymentMethod,
  pub payment_reference: Option<String>,
  pub delivery_notes: Option<String>,
  pub schedule_note: Option<String>,
  pub created_at: DateTime<Utc>,
  pub delivered_at: Option<DateTime<Utc>>,
}

/// `ORD-YYYYMMDD-XXXXXX`, the suffix being the first six hex digits of the id.
pub fn order_number_for(id: Uuid, created_at: DateTime<Utc>) -> String {
  let hex = id.simple().to_string().to_uppercase();
  format!("ORD-{}-{}", created_at.format("%Y%m%d"), &hex[..6])
}

impl Order {
  /// Applies one lifecycle action in place.
  ///
  /// `status` and `refund_status` move independently: a delivered order can be
  /// refund-requested without its status changing.
  pub fn apply(&mut self, action: OrderAction, actor: &Actor, now: DateTime<Utc>) -> Result<(), AppError> {
    let admin = actor.is_admin();
    let owner = actor.owns(self);

    match action {
      OrderAction::StartProcessing | OrderAction::Ship | OrderAction::MarkDelivered if !admin => {
        Err(self.forbidden(action))
      }
      OrderAction::StartProcessing => self.advance(action, OrderStatus::Pending, OrderStatus::Processing),
      OrderAction::Ship => self.advance(action, OrderStatus::Processing, OrderStatus::Shipped),
      OrderAction::MarkDelivered => {
        self.advance(action, OrderStatus::Shipped, OrderStatus::Delivered)?;
        self.delivered_at = Some(now);
        Ok(())
      }
      OrderAction::Cancel => {
        if !(admin || owner) {
          return Err(self.forbidden(action));
        }
        match self.status {
          OrderStatus::Pending | OrderStatus::Processing => {
            self.status = OrderStatus::Cancelled;
            Ok(())
          }
          other => Err(self.invalid(action, format!("status is {}", other))),
        }
      }
      OrderAction::RequestRefund => {
        if !owner {
          return Err(self.forbidden(action));
        }
        if self.status != OrderStatus::Delivered {
          return Err(self.invalid(action, format!("status is {}", self.status)));
        }
        if self.refund_status != RefundStatus::None {
          return Err(self.invalid(action, format!("refund is already {}", self.refund_status)));
        }
        let delivered_at = self
          .delivered_at
          .ok_or_else(|| self.invalid(action, "delivery time is unknown".to_string()))?;
        if now - delivered_at > Duration::hours(REFUND_WINDOW_HOURS) {
          return Err(self.invalid(
            action,
            format!("refunds close {} hours after delivery", REFUND_WINDOW_HOURS),
          ));
        }
        self.refund_status = RefundStatus::Requested;
        Ok(())
      }
      OrderAction::ApproveRefund | OrderAction::RejectRefund => {
        if !admin {
          return Err(self.forbidden(action));
        }
        if self.refund_status != RefundStatus::Requested {
          return Err(self.invalid(action, format!("refund is {}", self.refund_status)));
        }
        self.refund_status = if action == OrderAction::ApproveRefund {
          RefundStatus::Approved
        } else {
          RefundStatus::Rejected
        };
        Ok(())
      }
    }
  }

  fn advance(&mut self, action: OrderAction, from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
    if self.status != from {
      return Err(self.invalid(action, format!("status is {}, expected {}", self.status, from)));
    }
    self.status = to;
    Ok(())
  }

  fn forbidden(&self, action: OrderAction) -> AppError {
    AppError::Forbidden(format!("not allowed to {:?} order {}", action, self.order_number))
  }

  fn invalid(&self, action: OrderAction, why: String) -> AppError {
    AppError::InvalidTransition(format!("cannot {:?} order {}: {}", action, self.order_number, why))
  }
}

/// Header plus line items, written as one unit by the order store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
  pub user_id: Option<Uuid>,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub address: String,
  pub city: String,
  pub subtotal: i64,
  pub delivery_fee: i64,
  pub total: i64,
  pub payment_method: PaymentMethod,
  pub payment_reference: Option<String>,
  pub delivery_notes: Option<String>,
  pub schedule_note: Option<String>,
  pub items: Vec<NewOrderItem>,
}

impl NewOrder {
  /// Checks the header sums before anything is written.
  pub fn check_totals(&self) -> Result<(), String> {
    if self.items.is_empty() {
      return Err("an order needs at least one item".to_string());
    }
    let items_total = self
      .items
      .iter()
      .try_fold(0i64, |acc, item| acc.checked_add(item.checked_total()?))
      .ok_or_else(|| "items total does not fit in an amount".to_string())?;
    if items_total != self.subtotal {
      return Err(format!("subtotal {} does not match items total {}", self.subtotal, items_total));
    }
    if self.subtotal.checked_add(self.delivery_fee) != Some(self.total) {
      return Err(format!(
        "total {} is not subtotal {} plus delivery fee {}",
        self.total, self.subtotal, self.delivery_fee
      ));
    }
    Ok(())
  }

  /// Materialises the header for a freshly assigned id.
  pub fn to_order(&self, id: Uuid, created_at: DateTime<Utc>) -> Order {
    Order {
      id,
      order_number: order_number_for(id, created_at),
      user_id: self.user_id,
      customer_name: self.customer_name.clone(),
      customer_email: self.customer_email.clone(),
      customer_phone: self.customer_phone.clone(),
      address: self.address.clone(),
      city: self.city.clone(),
      subtotal: self.subtotal,
      delivery_fee: self.delivery_fee,
      total: self.total,
      status: OrderStatus::Pending,
      refund_status: RefundStatus::None,
      payment_method: self.payment_method,
      payment_reference: self.payment_reference.clone(),
      delivery_notes: self.delivery_notes.clone(),
      schedule_note: self.schedule_note.clone(),
      created_at,
      delivered_at: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderLineItem>,
}
