// storefront/src/models/order_item.rs

use crate::models::product_ref::ProductRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of the shopper's cart as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  #[serde(alias = "id")]
  pub product: ProductRef,
  pub product_name: String,
  pub unit_price: i64,
  pub quantity: i64,
}

impl CartLine {
  /// `None` when the product does not fit in an `i64`.
  pub fn line_total(&self) -> Option<i64> {
    self.unit_price.checked_mul(self.quantity)
  }
}

/// Sum of all line totals, `None` on overflow.
pub fn cart_total(lines: &[CartLine]) -> Option<i64> {
  lines.iter().try_fold(0i64, |acc, line| acc.checked_add(line.line_total()?))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
  pub product: ProductRef,
  pub product_name: String,
  pub price: i64,
  pub quantity: i64,
}

impl NewOrderItem {
  /// Saturates instead of wrapping; validated carts never get near the limit.
  pub fn total(&self) -> i64 {
    self.price.saturating_mul(self.quantity)
  }

  pub fn checked_total(&self) -> Option<i64> {
    self.price.checked_mul(self.quantity)
  }
}

impl From<&CartLine> for NewOrderItem {
  fn from(line: &CartLine) -> Self {
    Self {
      product: line.product.clone(),
      product_name: line.product_name.clone(),
      price: line.unit_price,
      quantity: line.quantity,
    }
  }
}

/// A persisted line item. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub product_variation_id: Option<String>,
  pub product_name: String,
  pub price: i64,
  pub quantity: i64,
  pub total: i64,
}

impl OrderLineItem {
  pub fn from_new(order_id: Uuid, item: &NewOrderItem) -> Self {
    Self {
      id: Uuid::new_v4(),
      order_id,
      product_id: item.product.product_id,
      product_variation_id: item.product.variation_id.clone(),
      product_name: item.product_name.clone(),
      price: item.price,
      quantity: item.quantity,
      total: item.total(),
    }
  }
}
