// storefront/src/checkout/payment.rs

//! The `dispatch_payment` step and its three branches.
//!
//! * `payment_verified`: the shopper is back from the hosted page with a paid
//!   session. The flow continues into the order write, provided the session
//!   holds the reference of the payment it started.
//! * `payment_retry`: a failed payment of an existing order, owned by the
//!   caller, is retried for that order's amount.
//! * `payment_initiate`: a new gateway session is opened.
//!
//! The last two end the checkout run: they either produce a redirect target or
//! a failure reason on the [`PaymentAttempt`]. No order is written on those paths.

use crate::checkout::contexts::{CheckoutContext, PaymentAttempt};
use crate::errors::{AppError, GatewayError};
use crate::models::Order;
use crate::services::gateway::{GatewayResponse, InitiatePaymentRequest, RetryPaymentRequest};
use iduka_flow::{ContextData, FlowError, NoMatch, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const PAYMENT_STATUS_PATH: &str = "/payment/status";

fn shared_attempt(ctx: ContextData<CheckoutContext>) -> Result<ContextData<PaymentAttempt>, FlowError> {
  Ok(ctx.read().payment.clone())
}

fn fail_attempt(attempt: &ContextData<PaymentAttempt>, err: &GatewayError) -> PipelineControl {
  let reason = match err {
    GatewayError::Rejected(text) | GatewayError::InvalidRequest(text) => text.clone(),
    other => other.to_string(),
  };
  warn!(%reason, "Payment could not be started.");
  attempt.update(|a| a.failure = Some(reason));
  PipelineControl::Stop
}

pub const NO_PENDING_PAYMENT: &str = "No payment is pending for this checkout. Please start the payment again.";
pub const RETRY_ORDER_NOT_FOUND: &str = "The order whose payment you are retrying could not be found.";

/// Continues only when this session has a reference from an earlier
/// initiation; the client's `payment_verified` flag alone is not enough.
async fn confirm_verified(attempt: ContextData<PaymentAttempt>) -> Result<PipelineControl, AppError> {
  let (handoff, session_id) = {
    let a = attempt.read();
    (Arc::clone(&a.deps.handoff), a.session_id.clone())
  };
  let Some(reference) = handoff.peek(&session_id) else {
    warn!(%session_id, "Verified payment claimed without a pending reference.");
    attempt.update(|a| a.failure = Some(NO_PENDING_PAYMENT.to_string()));
    return Ok(PipelineControl::Stop);
  };
  attempt.update(|a| {
    a.verified = true;
    a.reference = Some(reference);
  });
  Ok(PipelineControl::Continue)
}

fn initiate_request(a: &PaymentAttempt) -> InitiatePaymentRequest {
  InitiatePaymentRequest {
    amount: a.amount,
    customer_name: a.customer_name.clone(),
    customer_email: Some(a.customer_email.clone()).filter(|e| !e.is_empty()),
    customer_phone: a.customer_phone.clone(),
    payment_method: a.payment_method,
    redirect_url: a.redirect_url.clone(),
    cart: a.cart.clone(),
  }
}

fn retry_request(a: &PaymentAttempt) -> Option<RetryPaymentRequest> {
  Some(RetryPaymentRequest {
    order_id: a.retry_order_id?,
    amount: a.amount,
    customer_name: a.customer_name.clone(),
    customer_email: a.customer_email.clone(),
    customer_phone: a.customer_phone.clone(),
    payment_method: a.payment_method,
    redirect_url: a.redirect_url.clone(),
  })
}

async fn check_initiate_request(attempt: ContextData<PaymentAttempt>) -> Result<PipelineControl, AppError> {
  let request = initiate_request(&attempt.read());
  match request.validate() {
    Ok(()) => Ok(PipelineControl::Continue),
    Err(e) => Ok(fail_attempt(&attempt, &e)),
  }
}

fn owns(order: &Order, user_id: Option<Uuid>, phone: &str) -> bool {
  match order.user_id {
    Some(owner) => user_id == Some(owner),
    None => order.customer_phone == phone,
  }
}

/// Loads the order being retried and carries its amount and contact details
/// into the attempt. The resubmitted cart plays no part in a retry.
async fn load_retry_order(attempt: ContextData<PaymentAttempt>) -> Result<PipelineControl, AppError> {
  let (orders, order_id, user_id, phone) = {
    let a = attempt.read();
    (Arc::clone(&a.deps.orders), a.retry_order_id, a.user_id, a.customer_phone.clone())
  };
  let Some(order_id) = order_id else {
    return Ok(fail_attempt(&attempt, &GatewayError::InvalidRequest("no order to retry".to_string())));
  };
  let order = match orders.get_order(order_id).await? {
    Some(stored) if owns(&stored.order, user_id, &phone) => stored.order,
    _ => {
      warn!(%order_id, "Retry refused: no such order for this shopper.");
      attempt.update(|a| a.failure = Some(RETRY_ORDER_NOT_FOUND.to_string()));
      return Ok(PipelineControl::Stop);
    }
  };
  attempt.update(|a| {
    a.amount = order.total;
    a.customer_name = order.customer_name;
    a.customer_email = order.customer_email;
    a.customer_phone = order.customer_phone;
    a.payment_method = order.payment_method;
  });
  Ok(PipelineControl::Continue)
}

async fn check_retry_request(attempt: ContextData<PaymentAttempt>) -> Result<PipelineControl, AppError> {
  let request = retry_request(&attempt.read());
  let outcome = match request {
    Some(request) => request.validate(),
    None => Err(GatewayError::InvalidRequest("no order to retry".to_string())),
  };
  match outcome {
    Ok(()) => Ok(PipelineControl::Continue),
    Err(e) => Ok(fail_attempt(&attempt, &e)),
  }
}

#[instrument(name = "payment::initiate", skip_all)]
async fn call_initiate(attempt: ContextData<PaymentAttempt>) -> Result<PipelineControl, AppError> {
  let (gateway, request) = {
    let a = attempt.read();
    (Arc::clone(&a.deps.gateway), initiate_request(&a))
  };
  let response = gateway.initiate(&request).await.and_then(GatewayResponse::into_result);
  Ok(record_response(&attempt, response))
}

#[instrument(name = "payment::retry", skip_all)]
async fn call_retry(attempt: ContextData<PaymentAttempt>) -> Result<PipelineControl, AppError> {
  let (gateway, request) = {
    let a = attempt.read();
    (Arc::clone(&a.deps.gateway), retry_request(&a))
  };
  let Some(request) = request else {
    return Ok(fail_attempt(&attempt, &GatewayError::InvalidRequest("no order to retry".to_string())));
  };
  let response = gateway.retry(&request).await.and_then(GatewayResponse::into_result);
  Ok(record_response(&attempt, response))
}

fn record_response(
  attempt: &ContextData<PaymentAttempt>,
  response: Result<GatewayResponse, GatewayError>,
) -> PipelineControl {
  let response = match response {
    Ok(response) => response,
    Err(e) => return fail_attempt(attempt, &e),
  };
  let reference = response.reference.or(response.session_id).or(response.payment_id);
  let redirect_to = match (&response.checkout_url, &reference) {
    (Some(url), _) => url.clone(),
    (None, Some(reference)) => format!("{}?reference={}", PAYMENT_STATUS_PATH, reference),
    (None, None) => {
      return fail_attempt(
        attempt,
        &GatewayError::Rejected("the payment provider returned no reference".to_string()),
      )
    }
  };
  attempt.update(|a| {
    a.reference = reference;
    a.redirect_to = Some(redirect_to);
  });
  PipelineControl::Continue
}

/// Stores the reference in the session's handoff slot before the redirect is
/// returned; the browser may leave the page for good after that.
async fn hand_off(attempt: ContextData<PaymentAttempt>) -> Result<PipelineControl, AppError> {
  let (handoff, session_id, reference, redirect_to) = {
    let a = attempt.read();
    (
      Arc::clone(&a.deps.handoff),
      a.session_id.clone(),
      a.reference.clone(),
      a.redirect_to.clone(),
    )
  };
  if let Some(reference) = reference {
    handoff.set(&session_id, reference);
  }
  info!(redirect_to = ?redirect_to, "Shopper sent to payment page.");
  Ok(PipelineControl::Stop)
}

/// A retried payment belongs to an order that already exists, so the
/// reference goes straight onto it instead of through the handoff slot.
async fn attach_to_order(attempt: ContextData<PaymentAttempt>) -> Result<PipelineControl, AppError> {
  let (orders, order_id, reference) = {
    let a = attempt.read();
    (Arc::clone(&a.deps.orders), a.retry_order_id, a.reference.clone())
  };
  if let (Some(order_id), Some(reference)) = (order_id, reference) {
    if let Err(e) = orders.set_payment_reference(order_id, &reference).await {
      warn!(%order_id, error = %e, "Could not record retried payment reference on order.");
    }
  }
  Ok(PipelineControl::Stop)
}

fn verified_pipeline() -> Pipeline<PaymentAttempt, AppError> {
  let mut p = Pipeline::new("payment_verified", &[("confirm_verified", false, None)]);
  p.on("confirm_verified", confirm_verified);
  p
}

fn retry_pipeline() -> Pipeline<PaymentAttempt, AppError> {
  let mut p = Pipeline::new(
    "payment_retry",
    &[
      ("load_order", false, None),
      ("check_request", false, None),
      ("call_gateway", false, None),
      ("attach_to_order", false, None),
    ],
  );
  p.on("load_order", load_retry_order);
  p.on("check_request", check_retry_request);
  p.on("call_gateway", call_retry);
  p.on("attach_to_order", attach_to_order);
  p
}

fn initiate_pipeline() -> Pipeline<PaymentAttempt, AppError> {
  let mut p = Pipeline::new(
    "payment_initiate",
    &[("check_request", false, None), ("call_gateway", false, None), ("hand_off", false, None)],
  );
  p.on("check_request", check_initiate_request);
  p.on("call_gateway", call_initiate);
  p.on("hand_off", hand_off);
  p
}

/// Hosts the payment branches on `step_name` of the checkout pipeline.
pub fn install_payment_branches(pipeline: &mut Pipeline<CheckoutContext, AppError>, step_name: &str) {
  pipeline
    .branches_for_step(step_name)
    .add_branch(Arc::new(verified_pipeline()), shared_attempt)
    .when(|ctx| ctx.read().form.payment_verified)
    .add_branch(Arc::new(retry_pipeline()), shared_attempt)
    .when(|ctx| ctx.read().form.retry_order_id.is_some())
    .add_branch(Arc::new(initiate_pipeline()), shared_attempt)
    .when(|_| true)
    .otherwise(NoMatch::Fail)
    .finalize(false);
}
