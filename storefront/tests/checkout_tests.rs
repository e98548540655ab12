// tests/checkout_tests.rs

mod common;

use common::*;
use iduka_storefront::checkout::payment::{NO_PENDING_PAYMENT, RETRY_ORDER_NOT_FOUND};
use iduka_storefront::checkout::{BlockReason, CheckoutForm, CheckoutOutcome};
use iduka_storefront::errors::GatewayError;
use iduka_storefront::models::{PaymentMethod, ProductRef};
use iduka_storefront::services::{CartStore, OrderStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn guest_cash_order_is_placed_with_placeholder_email() {
  let h = Harness::open();

  let outcome = h.state.checkout.submit(SESSION, None, cash_form()).await.unwrap();

  let CheckoutOutcome::Placed {
    order,
    navigate_to,
    message,
    warnings,
  } = outcome
  else {
    panic!("expected a placed order, got {outcome:?}");
  };
  assert_eq!(navigate_to, "/thank-you");
  assert_eq!(order.customer_email, "guest-0788123456@guest.iduka.rw");
  assert_eq!(order.subtotal, 4_000);
  assert_eq!(order.delivery_fee, 1_500);
  assert_eq!(order.total, 5_500);
  assert_eq!(order.payment_reference, None);
  assert!(order.order_number.starts_with("ORD-20260520-"));
  assert!(message.contains(&order.order_number));
  assert!(warnings.is_empty());
  assert_eq!(h.orders.len(), 1);
  assert!(h.gateway.calls().is_empty(), "cash orders never reach the gateway");
}

#[tokio::test]
async fn signed_in_shopper_is_sent_to_the_order_page() {
  let h = Harness::open();
  let user = Uuid::new_v4();
  let mut form = cash_form();
  form.email = Some("aline@example.rw".into());

  let outcome = h.state.checkout.submit(SESSION, Some(user), form).await.unwrap();

  let CheckoutOutcome::Placed { order, navigate_to, .. } = outcome else {
    panic!("expected a placed order, got {outcome:?}");
  };
  assert_eq!(navigate_to, format!("/orders/{}", order.id));
  assert_eq!(order.user_id, Some(user));
  assert_eq!(order.customer_email, "aline@example.rw");

  settle().await;
  let mine = h.state.notifications.list_for(Some(user), None).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].kind, "order_created");
  let admin = h.state.notifications.list_for(None, Some("admin")).await.unwrap();
  assert_eq!(admin.len(), 1);
}

#[tokio::test]
async fn placing_an_order_clears_the_session_cart() {
  let h = Harness::open();
  h.carts.save(SESSION, vec![line("Isombe", 2_000, 2)]).await.unwrap();

  let outcome = h.state.checkout.submit(SESSION, None, cash_form()).await.unwrap();

  assert!(matches!(outcome, CheckoutOutcome::Placed { .. }));
  assert!(h.carts.get(SESSION).await.unwrap().is_empty());
}

#[tokio::test]
async fn online_payment_redirects_without_writing_an_order() {
  let h = Harness::open();

  let outcome = h.state.checkout.submit(SESSION, None, momo_form()).await.unwrap();

  match outcome {
    CheckoutOutcome::Redirect { url, reference } => {
      assert_eq!(url, "https://pay.example/checkout/PAY-1");
      assert_eq!(reference.as_deref(), Some("PAY-1"));
    }
    other => panic!("expected a redirect, got {other:?}"),
  }
  assert!(h.orders.is_empty());
  assert_eq!(h.state.checkout.deps().handoff.peek(SESSION).as_deref(), Some("PAY-1"));
  assert_eq!(h.gateway.calls(), vec![GatewayCall::Initiate { amount: 5_500 }]);
}

#[tokio::test]
async fn reference_without_checkout_url_points_at_the_status_page() {
  let h = Harness::open();
  h.gateway.respond_with(Ok(iduka_storefront::services::GatewayResponse {
    success: true,
    session_id: Some("SESS-4".into()),
    ..Default::default()
  }));

  let outcome = h.state.checkout.submit(SESSION, None, momo_form()).await.unwrap();

  match outcome {
    CheckoutOutcome::Redirect { url, reference } => {
      assert_eq!(url, "/payment/status?reference=SESS-4");
      assert_eq!(reference.as_deref(), Some("SESS-4"));
    }
    other => panic!("expected a redirect, got {other:?}"),
  }
}

#[tokio::test]
async fn declined_payment_fails_without_an_order() {
  let h = Harness::open();
  h.gateway
    .respond_with(Err(GatewayError::Rejected("insufficient funds".into())));

  let outcome = h.state.checkout.submit(SESSION, None, momo_form()).await.unwrap();

  match outcome {
    CheckoutOutcome::PaymentFailed { reason } => assert_eq!(reason, "insufficient funds"),
    other => panic!("expected a payment failure, got {other:?}"),
  }
  assert!(h.orders.is_empty());
  assert_eq!(h.state.checkout.deps().handoff.peek(SESSION), None);
}

#[tokio::test]
async fn verified_payment_places_order_even_when_linking_fails() {
  let h = Harness::open();
  let user = Uuid::new_v4();
  h.state.checkout.deps().handoff.set(SESSION, "PAY-9");
  h.gateway.fail_linking(true, true);
  let mut form = momo_form();
  form.payment_verified = true;

  let outcome = h.state.checkout.submit(SESSION, Some(user), form).await.unwrap();

  let CheckoutOutcome::Placed {
    order,
    navigate_to,
    warnings,
    ..
  } = outcome
  else {
    panic!("expected a placed order, got {outcome:?}");
  };
  assert_eq!(navigate_to, format!("/orders/{}", order.id));
  assert_eq!(
    warnings,
    vec![format!(
      "Payment recorded but could not be linked to order {}",
      order.order_number
    )]
  );
  assert_eq!(order.payment_reference.as_deref(), Some("PAY-9"));

  let stored = h.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.order.payment_reference.as_deref(), Some("PAY-9"));
  assert_eq!(h.state.checkout.deps().handoff.peek(SESSION), None);
  assert!(!h
    .gateway
    .calls()
    .iter()
    .any(|c| matches!(c, GatewayCall::Initiate { .. })));
}

#[tokio::test]
async fn link_falls_back_to_status_lookup() {
  let h = Harness::open();
  h.state.checkout.deps().handoff.set(SESSION, "PAY-3");
  h.gateway.fail_linking(true, false);
  let mut form = momo_form();
  form.payment_verified = true;

  let outcome = h.state.checkout.submit(SESSION, None, form).await.unwrap();

  let CheckoutOutcome::Placed { order, warnings, .. } = outcome else {
    panic!("expected a placed order, got {outcome:?}");
  };
  assert!(warnings.is_empty());
  assert_eq!(
    h.gateway.calls(),
    vec![
      GatewayCall::Link {
        order_id: order.id,
        reference: "PAY-3".into()
      },
      GatewayCall::Lookup {
        reference: "PAY-3".into()
      },
      GatewayCall::Attach {
        payment_id: "pmt_PAY-3".into(),
        order_id: order.id
      },
    ]
  );
}

#[tokio::test]
async fn cash_order_discards_a_stale_payment_reference() {
  let h = Harness::open();
  h.state.checkout.deps().handoff.set(SESSION, "STALE-1");

  let outcome = h.state.checkout.submit(SESSION, None, cash_form()).await.unwrap();

  let CheckoutOutcome::Placed { order, .. } = outcome else {
    panic!("expected a placed order, got {outcome:?}");
  };
  assert_eq!(order.payment_reference, None);
  assert_eq!(h.state.checkout.deps().handoff.peek(SESSION), None);
  assert!(h.gateway.calls().is_empty());
}

/// Places a mobile-money order for `user` through the verified path.
async fn paid_order(h: &Harness, user: Option<Uuid>) -> iduka_storefront::models::Order {
  h.state.checkout.deps().handoff.set("first", "PAY-0");
  let mut form = momo_form();
  form.payment_verified = true;
  let CheckoutOutcome::Placed { order, .. } = h.state.checkout.submit("first", user, form).await.unwrap() else {
    panic!("setup order was not placed");
  };
  order
}

#[tokio::test]
async fn retry_attaches_the_new_reference_to_the_existing_order() {
  let h = Harness::open();
  let order = paid_order(&h, None).await;
  h.gateway.respond_with(Ok(hosted_checkout("PAY-R")));
  let mut form = form(PaymentMethod::MobileMoney, vec![line("Ubuki", 9_000, 3)]);
  form.retry_order_id = Some(order.id);

  let outcome = h.state.checkout.submit(SESSION, None, form).await.unwrap();

  assert!(matches!(outcome, CheckoutOutcome::Redirect { .. }), "got {outcome:?}");
  assert_eq!(h.orders.len(), 1);
  let stored = h.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.order.payment_reference.as_deref(), Some("PAY-R"));
  assert_eq!(h.state.checkout.deps().handoff.peek(SESSION), None);
  assert_eq!(
    h.gateway.calls().last(),
    Some(&GatewayCall::Retry {
      order_id: order.id,
      amount: 5_500
    })
  );
}

#[tokio::test]
async fn retry_of_an_unknown_order_never_reaches_the_gateway() {
  let h = Harness::open();
  let mut form = momo_form();
  form.retry_order_id = Some(Uuid::new_v4());

  let outcome = h.state.checkout.submit(SESSION, None, form).await.unwrap();

  match outcome {
    CheckoutOutcome::PaymentFailed { reason } => assert_eq!(reason, RETRY_ORDER_NOT_FOUND),
    other => panic!("expected a payment failure, got {other:?}"),
  }
  assert!(h.gateway.calls().is_empty());
  assert!(h.orders.is_empty());
}

#[tokio::test]
async fn retry_of_someone_elses_order_is_refused() {
  let h = Harness::open();
  let order = paid_order(&h, Some(Uuid::new_v4())).await;
  let calls_before = h.gateway.calls().len();
  let mut form = momo_form();
  form.retry_order_id = Some(order.id);

  let stranger = h.state.checkout.submit(SESSION, Some(Uuid::new_v4()), form.clone()).await.unwrap();
  let anonymous = h.state.checkout.submit(SESSION, None, form).await.unwrap();

  for outcome in [stranger, anonymous] {
    assert!(matches!(outcome, CheckoutOutcome::PaymentFailed { .. }), "got {outcome:?}");
  }
  assert_eq!(h.gateway.calls().len(), calls_before);
  let stored = h.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.order.payment_reference.as_deref(), Some("PAY-0"));
}

#[tokio::test]
async fn verified_flag_without_a_started_payment_places_nothing() {
  let h = Harness::open();
  let mut form = momo_form();
  form.payment_verified = true;

  let outcome = h.state.checkout.submit(SESSION, None, form).await.unwrap();

  match outcome {
    CheckoutOutcome::PaymentFailed { reason } => assert_eq!(reason, NO_PENDING_PAYMENT),
    other => panic!("expected a payment failure, got {other:?}"),
  }
  assert!(h.orders.is_empty());
  assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn oversized_cart_line_is_a_cart_error() {
  let h = Harness::open();
  let form = form(PaymentMethod::CashOnDelivery, vec![line("Isombe", i64::MAX / 2 + 1, 2)]);

  let outcome = h.state.checkout.submit(SESSION, None, form).await.unwrap();

  match outcome {
    CheckoutOutcome::Rejected { errors, .. } => assert!(errors.get("cart").is_some()),
    other => panic!("expected a rejection, got {other:?}"),
  }
  assert!(h.orders.is_empty());
}

#[tokio::test]
async fn empty_cart_is_rejected_before_anything_is_written() {
  let h = Harness::open();
  let form = form(PaymentMethod::CashOnDelivery, vec![]);

  let outcome = h.state.checkout.submit(SESSION, None, form).await.unwrap();

  match outcome {
    CheckoutOutcome::Rejected { errors, message } => {
      assert_eq!(message, "Your cart is empty.");
      assert_eq!(errors.fields().next(), Some("cart"));
    }
    other => panic!("expected a rejection, got {other:?}"),
  }
  assert!(h.orders.is_empty());
}

#[tokio::test]
async fn every_invalid_field_is_reported() {
  let h = Harness::open();
  let mut form = cash_form();
  form.customer_name = "  ".into();
  form.phone = "12345".into();

  let outcome = h.state.checkout.submit(SESSION, None, form).await.unwrap();

  let CheckoutOutcome::Rejected { errors, .. } = outcome else {
    panic!("expected a rejection, got {outcome:?}");
  };
  assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["customer_name", "phone"]);
}

#[tokio::test]
async fn admin_switch_blocks_checkout() {
  let h = Harness::open();
  h.state.acceptance.set_override(false).await.unwrap();

  let outcome = h.state.checkout.submit(SESSION, None, cash_form()).await.unwrap();

  match outcome {
    CheckoutOutcome::Blocked { reason, .. } => assert_eq!(reason, BlockReason::DisabledByAdmin),
    other => panic!("expected a block, got {other:?}"),
  }
  assert!(h.orders.is_empty());

  h.state.acceptance.clear_override().await.unwrap();
  let outcome = h.state.checkout.submit(SESSION, None, cash_form()).await.unwrap();
  assert!(matches!(outcome, CheckoutOutcome::Placed { .. }), "got {outcome:?}");
}

#[tokio::test]
async fn after_hours_needs_acknowledgment_then_carries_a_note() {
  let h = Harness::at(closed_hours());

  let outcome = h.state.checkout.submit(SESSION, None, cash_form()).await.unwrap();
  match outcome {
    CheckoutOutcome::Blocked { reason, message } => {
      assert_eq!(reason, BlockReason::NeedsScheduleAcknowledgment);
      assert!(message.contains("2026-05-21 07:00 UTC"), "message was {message}");
    }
    other => panic!("expected a block, got {other:?}"),
  }

  let mut form = cash_form();
  form.acknowledge_schedule = true;
  let outcome = h.state.checkout.submit(SESSION, None, form).await.unwrap();
  let CheckoutOutcome::Placed { order, .. } = outcome else {
    panic!("expected a placed order, got {outcome:?}");
  };
  let note = order.schedule_note.expect("after-hours order carries a note");
  assert!(note.starts_with("Placed outside ordering hours"));
}

#[tokio::test]
async fn composite_product_id_is_split_into_product_and_variation() {
  let h = Harness::open();
  let product = Uuid::new_v4();
  let form: CheckoutForm = serde_json::from_value(json!({
    "cart": [
      { "id": format!("{product}-red-large"), "productName": "Kitenge shirt", "unitPrice": 12000, "quantity": 1 },
      { "product": { "product_id": product }, "productName": "Kitenge shirt", "unitPrice": 11000, "quantity": 2 }
    ],
    "customerName": "Eric",
    "phone": "+250788000111",
    "address": "KN 5 Rd",
    "city": "Kigali",
    "paymentMethod": "cash_on_delivery"
  }))
  .unwrap();

  let outcome = h.state.checkout.submit(SESSION, None, form).await.unwrap();

  let CheckoutOutcome::Placed { order, .. } = outcome else {
    panic!("expected a placed order, got {outcome:?}");
  };
  let stored = h.orders.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.items.len(), 2);
  let refs: Vec<ProductRef> = stored
    .items
    .iter()
    .map(|i| ProductRef::new(i.product_id, i.product_variation_id.clone()))
    .collect();
  assert!(refs.contains(&ProductRef::new(product, Some("red-large".into()))));
  assert!(refs.contains(&ProductRef::new(product, None)));
  assert_eq!(stored.order.subtotal, 34_000);
}

#[tokio::test]
async fn second_submission_while_one_is_running_is_ignored() {
  let h = Harness::open();
  h.gateway.hold_for(Duration::from_millis(200));
  let checkout = Arc::clone(&h.state.checkout);

  let (first, second) = tokio::join!(checkout.submit(SESSION, None, momo_form()), async {
    tokio::time::sleep(Duration::from_millis(20)).await;
    checkout.submit(SESSION, None, momo_form()).await
  });

  assert!(matches!(first.unwrap(), CheckoutOutcome::Redirect { .. }));
  assert!(matches!(second.unwrap(), CheckoutOutcome::AlreadySubmitting));
  assert_eq!(h.gateway.calls().len(), 1);

  // The guard is released once the first run ends.
  let third = h.state.checkout.submit(SESSION, None, momo_form()).await.unwrap();
  assert!(matches!(third, CheckoutOutcome::Redirect { .. }));
}
