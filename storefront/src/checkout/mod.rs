// storefront/src/checkout/mod.rs

//! Order submission.
//!
//! `validate_form → evaluate_acceptance → prepare_order → dispatch_payment →
//! write_order → clear_checkout_state → link_payment_reference →
//! dispatch_confirmation → resolve_navigation → acknowledge`
//!
//! The step a run stops at decides the outcome shown to the shopper.

pub mod contexts;
pub mod payment;
pub mod pipeline;
pub mod reconcile;
pub mod validation;

pub use contexts::{BlockReason, CheckoutContext, CheckoutDeps, CheckoutForm, PaymentAttempt};
pub use pipeline::build_checkout_pipeline;
pub use validation::{validate, FieldErrors};

use crate::errors::{AppError, Result as AppResult};
use crate::models::Order;
use iduka_flow::{ContextData, FlowRegistry, PipelineResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
  Rejected {
    errors: FieldErrors,
    message: String,
  },
  Blocked {
    reason: BlockReason,
    message: String,
  },
  Redirect {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
  },
  PaymentFailed {
    reason: String,
  },
  Placed {
    order: Order,
    navigate_to: String,
    message: String,
    warnings: Vec<String>,
  },
  /// A submission for this session is still running.
  AlreadySubmitting,
}

/// Sessions with a submission in flight.
#[derive(Debug, Default)]
struct InFlight(Mutex<HashSet<String>>);

struct InFlightGuard<'a> {
  set: &'a InFlight,
  session_id: String,
}

impl InFlight {
  fn acquire(&self, session_id: &str) -> Option<InFlightGuard<'_>> {
    if !self.0.lock().insert(session_id.to_string()) {
      return None;
    }
    Some(InFlightGuard {
      set: self,
      session_id: session_id.to_string(),
    })
  }
}

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) {
    self.set.0.lock().remove(&self.session_id);
  }
}

pub struct CheckoutService {
  flows: Arc<FlowRegistry<AppError>>,
  deps: Arc<CheckoutDeps>,
  in_flight: InFlight,
}

impl CheckoutService {
  /// Registers the checkout pipeline with `flows`.
  pub fn new(flows: Arc<FlowRegistry<AppError>>, deps: Arc<CheckoutDeps>) -> Self {
    flows.register(Arc::new(build_checkout_pipeline()));
    Self {
      flows,
      deps,
      in_flight: InFlight::default(),
    }
  }

  pub fn deps(&self) -> &Arc<CheckoutDeps> {
    &self.deps
  }

  #[instrument(name = "CheckoutService::submit", skip(self, form), fields(method = %form.payment_method))]
  pub async fn submit(&self, session_id: &str, user_id: Option<Uuid>, form: CheckoutForm) -> AppResult<CheckoutOutcome> {
    let Some(_guard) = self.in_flight.acquire(session_id) else {
      info!("Submission already in flight; ignoring.");
      return Ok(CheckoutOutcome::AlreadySubmitting);
    };

    let ctx = ContextData::new(CheckoutContext::new(Arc::clone(&self.deps), session_id, user_id, form));
    let result = self.flows.run(ctx.clone()).await?;
    outcome_of(&ctx, result)
  }
}

fn outcome_of(ctx: &ContextData<CheckoutContext>, result: PipelineResult) -> AppResult<CheckoutOutcome> {
  let c = ctx.read();
  match result {
    PipelineResult::Completed => {
      let order = c
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("checkout completed without an order".to_string()))?;
      if !c.warnings.is_empty() {
        warn!(order_number = %order.order_number, warnings = ?c.warnings, "Order placed with warnings.");
      }
      Ok(CheckoutOutcome::Placed {
        navigate_to: c.navigate_to.clone().unwrap_or_else(|| "/thank-you".to_string()),
        message: c.message.clone().unwrap_or_default(),
        warnings: c.warnings.clone(),
        order,
      })
    }
    PipelineResult::Stopped { step } => match step.as_str() {
      pipeline::VALIDATE_FORM => Ok(CheckoutOutcome::Rejected {
        message: c.field_errors.first().unwrap_or("Please check your details.").to_string(),
        errors: c.field_errors.clone(),
      }),
      pipeline::EVALUATE_ACCEPTANCE => {
        let (reason, message) = c
          .blocked
          .clone()
          .ok_or_else(|| AppError::Internal("acceptance stopped without a reason".to_string()))?;
        Ok(CheckoutOutcome::Blocked { reason, message })
      }
      pipeline::DISPATCH_PAYMENT => {
        let attempt = c.payment.read();
        match (&attempt.failure, &attempt.redirect_to) {
          (Some(reason), _) => Ok(CheckoutOutcome::PaymentFailed { reason: reason.clone() }),
          (None, Some(url)) => Ok(CheckoutOutcome::Redirect {
            url: url.clone(),
            reference: attempt.reference.clone(),
          }),
          (None, None) => Err(AppError::Internal("payment stopped without a result".to_string())),
        }
      }
      other => Err(AppError::Internal(format!("checkout stopped at unexpected step '{other}'"))),
    },
  }
}
