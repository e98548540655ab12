// storefront/src/checkout/pipeline.rs

use crate::acceptance::{decide, AcceptanceDecision};
use crate::checkout::contexts::{BlockReason, CheckoutContext};
use crate::checkout::payment::{install_payment_branches, PAYMENT_STATUS_PATH};
use crate::checkout::reconcile::{
  install_reconciliation, ACKNOWLEDGE, CLEAR_CHECKOUT_STATE, DISPATCH_CONFIRMATION, LINK_PAYMENT_REFERENCE,
  RESOLVE_NAVIGATION,
};
use crate::checkout::validation::validate;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{cart_total, NewOrder, NewOrderItem};
use crate::services::gateway::GatewayCartLine;
use iduka_flow::{ContextData, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const VALIDATE_FORM: &str = "validate_form";
pub const EVALUATE_ACCEPTANCE: &str = "evaluate_acceptance";
pub const PREPARE_ORDER: &str = "prepare_order";
pub const DISPATCH_PAYMENT: &str = "dispatch_payment";
pub const WRITE_ORDER: &str = "write_order";

async fn validate_form(ctx: ContextData<CheckoutContext>) -> AppResult<PipelineControl> {
  let errors = validate(&ctx.read().form);
  if errors.is_empty() {
    return Ok(PipelineControl::Continue);
  }
  info!(fields = ?errors.fields().collect::<Vec<_>>(), "Checkout form rejected.");
  ctx.update(|c| c.field_errors = errors);
  Ok(PipelineControl::Stop)
}

/// Asks for a fresh acceptance setting; the window may have closed since the
/// page was loaded.
#[instrument(name = "checkout::evaluate_acceptance", skip_all)]
async fn evaluate_acceptance(ctx: ContextData<CheckoutContext>) -> AppResult<PipelineControl> {
  let (acceptance, acknowledged) = {
    let c = ctx.read();
    (Arc::clone(&c.deps.acceptance), c.form.acknowledge_schedule)
  };
  let setting = acceptance.get_fresh().await?;

  match decide(&setting, acknowledged) {
    AcceptanceDecision::Proceed { schedule_note } => {
      ctx.update(|c| c.schedule_note = schedule_note);
      Ok(PipelineControl::Continue)
    }
    AcceptanceDecision::BlockAdmin(message) => {
      ctx.update(|c| c.blocked = Some((BlockReason::DisabledByAdmin, message)));
      Ok(PipelineControl::Stop)
    }
    AcceptanceDecision::BlockScheduleNeedsAck(message) => {
      ctx.update(|c| c.blocked = Some((BlockReason::NeedsScheduleAcknowledgment, message)));
      Ok(PipelineControl::Stop)
    }
  }
}

pub fn placeholder_email(phone: &str, domain: &str) -> String {
  let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
  format!("guest-{}@guest.{}", digits, domain)
}

/// Builds the order header and items and fills in the payment attempt.
async fn prepare_order(ctx: ContextData<CheckoutContext>) -> AppResult<PipelineControl> {
  let (new_order, payment, config) = {
    let c = ctx.read();
    let config = Arc::clone(&c.deps.config);
    let form = &c.form;
    let items: Vec<NewOrderItem> = form.cart.iter().map(NewOrderItem::from).collect();
    let delivery_fee = config.delivery_fee_rwf;
    let (subtotal, total) = cart_total(&form.cart)
      .and_then(|subtotal| Some((subtotal, subtotal.checked_add(delivery_fee)?)))
      .ok_or_else(|| AppError::Internal("cart total does not fit in an amount".to_string()))?;
    let customer_email = form
      .email
      .as_deref()
      .map(str::trim)
      .filter(|e| !e.is_empty())
      .map(str::to_string)
      .unwrap_or_else(|| placeholder_email(&form.phone, &config.guest_email_domain));

    let new_order = NewOrder {
      user_id: c.user_id,
      customer_name: form.customer_name.trim().to_string(),
      customer_email,
      customer_phone: form.phone.trim().to_string(),
      address: form.address.trim().to_string(),
      city: form.city.trim().to_string(),
      subtotal,
      delivery_fee,
      total,
      payment_method: form.payment_method,
      payment_reference: None,
      delivery_notes: form.delivery_notes.clone().filter(|n| !n.trim().is_empty()),
      schedule_note: c.schedule_note.clone(),
      items,
    };
    (new_order, c.payment.clone(), config)
  };

  let cart: Vec<GatewayCartLine> = new_order
    .items
    .iter()
    .map(|item| GatewayCartLine {
      name: item.product_name.clone(),
      quantity: item.quantity,
      price: item.price,
    })
    .collect();
  let retry_order_id = ctx.read().form.retry_order_id;
  payment.update(|a| {
    a.amount = new_order.total;
    a.customer_name = new_order.customer_name.clone();
    a.customer_email = new_order.customer_email.clone();
    a.customer_phone = new_order.customer_phone.clone();
    a.payment_method = new_order.payment_method;
    a.redirect_url = format!("{}{}", config.app_base_url.trim_end_matches('/'), PAYMENT_STATUS_PATH);
    a.cart = cart;
    a.retry_order_id = retry_order_id;
  });
  ctx.update(|c| c.new_order = Some(new_order));
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::write_order", skip_all)]
async fn write_order(ctx: ContextData<CheckoutContext>) -> AppResult<PipelineControl> {
  let (orders, new_order) = {
    let c = ctx.read();
    (Arc::clone(&c.deps.orders), c.new_order.clone())
  };
  let new_order = new_order.ok_or_else(|| AppError::Internal("order was not prepared".to_string()))?;
  let order = orders.create_order(new_order).await.map_err(|e| {
    warn!(error = %e, "Order write failed.");
    e
  })?;
  info!(order_id = %order.id, order_number = %order.order_number, total = order.total, "Order written.");
  ctx.update(|c| c.order = Some(order));
  Ok(PipelineControl::Continue)
}

fn paid_in_cash() -> SkipCondition<CheckoutContext> {
  Arc::new(|ctx: ContextData<CheckoutContext>| ctx.read().form.payment_method.is_cash())
}

/// The `checkout` pipeline.
pub fn build_checkout_pipeline() -> Pipeline<CheckoutContext, AppError> {
  let mut p = Pipeline::new(
    "checkout",
    &[
      (VALIDATE_FORM, false, None),
      (EVALUATE_ACCEPTANCE, false, None),
      (PREPARE_ORDER, false, None),
      (DISPATCH_PAYMENT, false, Some(paid_in_cash())),
      (WRITE_ORDER, false, None),
      (CLEAR_CHECKOUT_STATE, true, None),
      (LINK_PAYMENT_REFERENCE, true, None),
      (DISPATCH_CONFIRMATION, true, None),
      (RESOLVE_NAVIGATION, false, None),
      (ACKNOWLEDGE, false, None),
    ],
  );

  p.on(VALIDATE_FORM, validate_form);
  p.on(EVALUATE_ACCEPTANCE, evaluate_acceptance);
  p.on(PREPARE_ORDER, prepare_order);
  install_payment_branches(&mut p, DISPATCH_PAYMENT);
  p.on(WRITE_ORDER, write_order);
  install_reconciliation(&mut p);
  p
}
