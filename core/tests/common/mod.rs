// tests/common/mod.rs
#![allow(dead_code)]

use iduka_flow::{ContextData, FlowError, Handler, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

/// Checkout-shaped context used across the engine tests.
#[derive(Clone, Debug, Default)]
pub struct OrderFlowContext {
  pub order_total: i64,
  pub cash_on_delivery: bool,
  pub payment_verified: bool,
  pub trail: Vec<String>,
  pub warnings: Vec<String>,
  pub stop_at: Option<String>,
  pub payment: ContextData<PaymentContext>,
}

#[derive(Clone, Debug, Default)]
pub struct PaymentContext {
  pub reference: Option<String>,
  pub path: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Appends `label` to the trail; stops if `stop_at` names it.
pub fn recording_handler(label: &'static str) -> Handler<OrderFlowContext, TestError> {
  Box::new(move |ctx: ContextData<OrderFlowContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.trail.push(label.to_string());
      if guard.stop_at.as_deref() == Some(label) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(label: &'static str, message: &'static str) -> Handler<OrderFlowContext, TestError> {
  Box::new(move |ctx: ContextData<OrderFlowContext>| {
    Box::pin(async move {
      ctx.write().trail.push(label.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
