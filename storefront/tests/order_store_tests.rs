// tests/order_store_tests.rs

mod common;

use chrono::Duration;
use common::*;
use iduka_storefront::clock::Clock;
use iduka_storefront::errors::AppError;
use iduka_storefront::models::{
  Actor, NewOrder, NewOrderItem, OrderAction, OrderStatus, PaymentMethod, ProductRef, RefundStatus,
};
use iduka_storefront::services::OrderStore;
use uuid::Uuid;

fn new_order(user_id: Option<Uuid>, items: Vec<NewOrderItem>, delivery_fee: i64) -> NewOrder {
  let subtotal = items.iter().map(NewOrderItem::total).sum();
  NewOrder {
    user_id,
    customer_name: "Aline Uwase".into(),
    customer_email: "aline@example.rw".into(),
    customer_phone: "0788123456".into(),
    address: "KG 11 Ave 23".into(),
    city: "Kigali".into(),
    subtotal,
    delivery_fee,
    total: subtotal + delivery_fee,
    payment_method: PaymentMethod::CashOnDelivery,
    payment_reference: None,
    delivery_notes: Some("Blue gate".into()),
    schedule_note: None,
    items,
  }
}

fn item(name: &str, price: i64, quantity: i64, variation: Option<&str>) -> NewOrderItem {
  NewOrderItem {
    product: ProductRef::new(Uuid::new_v4(), variation.map(str::to_string)),
    product_name: name.into(),
    price,
    quantity,
  }
}

#[tokio::test]
async fn header_and_every_item_are_stored_together() {
  let h = Harness::open();
  let items: Vec<NewOrderItem> = (1..=5)
    .map(|i| item(&format!("Item {i}"), 1_000 * i, i, (i % 2 == 0).then_some("large")))
    .collect();

  let order = h.orders.create_order(new_order(None, items.clone(), 1_500)).await.unwrap();
  let stored = h.orders.get_order(order.id).await.unwrap().unwrap();

  assert_eq!(stored.order, order);
  assert_eq!(stored.items.len(), 5);
  for (written, sent) in stored.items.iter().zip(&items) {
    assert_eq!(written.order_id, order.id);
    assert_eq!(written.product_id, sent.product.product_id);
    assert_eq!(written.product_variation_id, sent.product.variation_id);
    assert_eq!(written.total, sent.price * sent.quantity);
  }
  let items_total: i64 = stored.items.iter().map(|i| i.total).sum();
  assert_eq!(items_total, order.subtotal);
  assert_eq!(order.total, order.subtotal + 1_500);
  assert_eq!(order.status, OrderStatus::Pending);
  assert_eq!(order.refund_status, RefundStatus::None);
}

#[tokio::test]
async fn mismatched_totals_are_refused() {
  let h = Harness::open();
  let mut order = new_order(None, vec![item("Isombe", 2_000, 2, None)], 1_500);
  order.total += 1;

  let err = h.orders.create_order(order).await.unwrap_err();

  assert!(matches!(err, AppError::Write(_)), "got {err:?}");
  assert!(h.orders.is_empty());
}

#[tokio::test]
async fn order_without_items_is_refused() {
  let h = Harness::open();

  let err = h.orders.create_order(new_order(None, vec![], 1_500)).await.unwrap_err();

  assert!(matches!(err, AppError::Write(_)), "got {err:?}");
}

#[tokio::test]
async fn fulfilment_then_refund_through_the_store() {
  let h = Harness::open();
  let owner = Uuid::new_v4();
  let order = h
    .orders
    .create_order(new_order(Some(owner), vec![item("Brochettes", 1_200, 3, None)], 1_500))
    .await
    .unwrap();
  let admin = Actor::admin(None);
  let now = h.clock.now();

  for action in [OrderAction::StartProcessing, OrderAction::Ship, OrderAction::MarkDelivered] {
    h.orders.apply_action(order.id, action, &admin, now).await.unwrap();
  }
  let delivered = h.orders.get_order(order.id).await.unwrap().unwrap().order;
  assert_eq!(delivered.status, OrderStatus::Delivered);
  assert_eq!(delivered.delivered_at, Some(now));

  let late = now + Duration::hours(30);
  let err = h
    .orders
    .apply_action(order.id, OrderAction::RequestRefund, &Actor::customer(owner), late)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::InvalidTransition(_)));

  let requested = h
    .orders
    .apply_action(order.id, OrderAction::RequestRefund, &Actor::customer(owner), now + Duration::hours(2))
    .await
    .unwrap();
  assert_eq!(requested.refund_status, RefundStatus::Requested);
  assert_eq!(requested.status, OrderStatus::Delivered);

  let approved = h
    .orders
    .apply_action(order.id, OrderAction::ApproveRefund, &admin, late)
    .await
    .unwrap();
  assert_eq!(approved.refund_status, RefundStatus::Approved);
}

#[tokio::test]
async fn failed_transition_leaves_the_order_untouched() {
  let h = Harness::open();
  let order = h
    .orders
    .create_order(new_order(None, vec![item("Ubuki", 3_000, 1, None)], 0))
    .await
    .unwrap();

  let err = h
    .orders
    .apply_action(order.id, OrderAction::Ship, &Actor::admin(None), open_hours())
    .await
    .unwrap_err();

  assert!(matches!(err, AppError::InvalidTransition(_)));
  let stored = h.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
  let h = Harness::open();

  let err = h
    .orders
    .apply_action(Uuid::new_v4(), OrderAction::Cancel, &Actor::admin(None), open_hours())
    .await
    .unwrap_err();

  assert!(matches!(err, AppError::NotFound(_)));
}
