// storefront/src/web/handlers/checkout_handlers.rs

use crate::checkout::{CheckoutForm, CheckoutOutcome};
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{Identity, SessionId};
use actix_web::{http::StatusCode, web, HttpResponse};
use tracing::{info, instrument};

fn status_for(outcome: &CheckoutOutcome) -> StatusCode {
  match outcome {
    CheckoutOutcome::Placed { .. } => StatusCode::CREATED,
    CheckoutOutcome::Redirect { .. } => StatusCode::OK,
    CheckoutOutcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    CheckoutOutcome::Blocked { .. } => StatusCode::FORBIDDEN,
    CheckoutOutcome::PaymentFailed { .. } => StatusCode::PAYMENT_REQUIRED,
    CheckoutOutcome::AlreadySubmitting => StatusCode::CONFLICT,
  }
}

#[instrument(
  name = "handler::submit_checkout",
  skip(app_state, form, identity),
  fields(session_id = %session.0, user_id = ?identity.user_id)
)]
pub async fn submit_checkout_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  session: SessionId,
  form: web::Json<CheckoutForm>,
) -> Result<HttpResponse, AppError> {
  let outcome = app_state
    .checkout
    .submit(&session.0, identity.user_id, form.into_inner())
    .await?;
  let status = status_for(&outcome);
  info!(status = status.as_u16(), "Checkout submission answered.");
  Ok(HttpResponse::build(status).json(outcome))
}
