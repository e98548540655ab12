// storefront/src/checkout/reconcile.rs

//! Post-commit reconciliation.
//!
//! Runs once the order exists, for cash and verified-payment checkouts alike.
//! The first three steps are best-effort; whatever goes wrong in them ends up
//! as a warning on the placed outcome. Navigation and the acknowledgment are
//! required and always happen once the order is written.

use crate::checkout::contexts::CheckoutContext;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{CreateNotification, Order};
use crate::notifications::NotificationService;
use crate::services::{Mailer, OrderStore, PaymentGateway};
use iduka_flow::{ContextData, Pipeline, PipelineControl};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub const CLEAR_CHECKOUT_STATE: &str = "clear_checkout_state";
pub const LINK_PAYMENT_REFERENCE: &str = "link_payment_reference";
pub const DISPATCH_CONFIRMATION: &str = "dispatch_confirmation";
pub const RESOLVE_NAVIGATION: &str = "resolve_navigation";
pub const ACKNOWLEDGE: &str = "acknowledge";

fn placed_order(ctx: &ContextData<CheckoutContext>) -> AppResult<Order> {
  ctx
    .read()
    .order
    .clone()
    .ok_or_else(|| AppError::Internal("reconciliation ran without an order".to_string()))
}

async fn clear_checkout_state(ctx: ContextData<CheckoutContext>) -> AppResult<PipelineControl> {
  let (carts, handoff, session_id, is_cash) = {
    let c = ctx.read();
    (
      Arc::clone(&c.deps.carts),
      Arc::clone(&c.deps.handoff),
      c.session_id.clone(),
      c.form.payment_method.is_cash(),
    )
  };
  // A reference left over from an abandoned gateway attempt must not be
  // linked to a cash order.
  if is_cash {
    if let Some(stale) = handoff.consume(&session_id) {
      debug!(%stale, "Discarded stale payment reference.");
    }
  }
  carts
    .clear(&session_id)
    .await
    .map_err(|e| AppError::Reconciliation(format!("Your cart could not be cleared: {e}")))?;
  Ok(PipelineControl::Continue)
}

/// Links `reference` to `order`: primary link call first, then status lookup
/// and patch. The reference is kept on the order either way so an operator
/// can match it by hand.
pub async fn link_reference(
  gateway: &dyn PaymentGateway,
  orders: &dyn OrderStore,
  order: &Order,
  reference: &str,
) -> AppResult<()> {
  if let Err(e) = orders.set_payment_reference(order.id, reference).await {
    warn!(order_id = %order.id, error = %e, "Could not store payment reference on order.");
  }

  let primary = gateway.link(order.id, reference).await;
  let Err(primary_err) = primary else {
    info!(order_number = %order.order_number, %reference, "Payment linked to order.");
    return Ok(());
  };
  warn!(error = %primary_err, "Payment link failed, trying status lookup.");

  let fallback = match gateway.lookup_status(reference).await {
    Ok(payment_id) => gateway.attach_order(&payment_id, order.id).await,
    Err(e) => Err(e),
  };
  match fallback {
    Ok(()) => {
      info!(order_number = %order.order_number, %reference, "Payment linked to order via status lookup.");
      Ok(())
    }
    Err(fallback_err) => {
      warn!(error = %fallback_err, "Payment link fallback failed.");
      Err(AppError::Reconciliation(format!(
        "Payment recorded but could not be linked to order {}",
        order.order_number
      )))
    }
  }
}

#[instrument(name = "checkout::link_payment_reference", skip_all)]
async fn link_payment_reference(ctx: ContextData<CheckoutContext>) -> AppResult<PipelineControl> {
  let order = placed_order(&ctx)?;
  let (gateway, orders, handoff, session_id) = {
    let c = ctx.read();
    (
      Arc::clone(&c.deps.gateway),
      Arc::clone(&c.deps.orders),
      Arc::clone(&c.deps.handoff),
      c.session_id.clone(),
    )
  };
  let Some(reference) = handoff.consume(&session_id) else {
    debug!("No pending payment reference.");
    return Ok(PipelineControl::Continue);
  };
  ctx.update(|c| {
    if let Some(order) = c.order.as_mut() {
      order.payment_reference = Some(reference.clone());
    }
  });
  link_reference(gateway.as_ref(), orders.as_ref(), &order, &reference).await?;
  Ok(PipelineControl::Continue)
}

fn spawn_confirmation(mailer: Arc<dyn Mailer>, notifications: Arc<NotificationService>, order: Order) {
  tokio::spawn(async move {
    if let Err(e) = mailer.send_order_confirmation(&order).await {
      warn!(order_number = %order.order_number, error = %e, "Confirmation email failed.");
    }

    let meta = json!({
      "order_id": order.id,
      "order_number": order.order_number,
      "customer_name": order.customer_name,
      "total": order.total,
      "delivery_address": format!("{}, {}", order.address, order.city),
    });
    let mut requests = vec![CreateNotification {
      recipient_role: Some("admin".to_string()),
      kind: "order_created".to_string(),
      meta: meta.clone(),
      ..Default::default()
    }];
    if let Some(user_id) = order.user_id {
      requests.push(CreateNotification {
        recipient_user_id: Some(user_id),
        kind: "order_created".to_string(),
        meta,
        ..Default::default()
      });
    }
    for request in requests {
      if let Err(e) = notifications.create(request).await {
        warn!(order_number = %order.order_number, error = %e, "Order notification failed.");
      }
    }
  });
}

/// Hands the confirmation email and notifications to a background task.
async fn dispatch_confirmation(ctx: ContextData<CheckoutContext>) -> AppResult<PipelineControl> {
  let order = placed_order(&ctx)?;
  let (mailer, notifications) = {
    let c = ctx.read();
    (Arc::clone(&c.deps.mailer), Arc::clone(&c.deps.notifications))
  };
  spawn_confirmation(mailer, notifications, order);
  Ok(PipelineControl::Continue)
}

pub fn navigation_target(order_id: Uuid, signed_in: bool) -> String {
  if signed_in {
    format!("/orders/{order_id}")
  } else {
    "/thank-you".to_string()
  }
}

async fn resolve_navigation(ctx: ContextData<CheckoutContext>) -> AppResult<PipelineControl> {
  let order = placed_order(&ctx)?;
  ctx.update(|c| c.navigate_to = Some(navigation_target(order.id, c.user_id.is_some())));
  Ok(PipelineControl::Continue)
}

async fn acknowledge(ctx: ContextData<CheckoutContext>) -> AppResult<PipelineControl> {
  let order = placed_order(&ctx)?;
  ctx.update(|c| {
    c.message = Some(if c.warnings.is_empty() {
      format!("Thank you! Your order {} has been placed.", order.order_number)
    } else {
      format!(
        "Thank you! Your order {} has been placed, but some follow-up steps need attention.",
        order.order_number
      )
    });
  });
  Ok(PipelineControl::Continue)
}

/// Registers the reconciliation handlers and the fault observer that turns
/// best-effort failures into warnings.
pub fn install_reconciliation(pipeline: &mut Pipeline<CheckoutContext, AppError>) {
  pipeline.on(CLEAR_CHECKOUT_STATE, clear_checkout_state);
  pipeline.on(LINK_PAYMENT_REFERENCE, link_payment_reference);
  pipeline.on(DISPATCH_CONFIRMATION, dispatch_confirmation);
  pipeline.on(RESOLVE_NAVIGATION, resolve_navigation);
  pipeline.on(ACKNOWLEDGE, acknowledge);

  pipeline.on_fault(|ctx, step_name, err| {
    warn!(step = step_name, error = %err, "Checkout follow-up step failed.");
    ctx.update(|c| c.warnings.push(err.to_string()));
  });
}
