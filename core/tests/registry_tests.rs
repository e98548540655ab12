// tests/registry_tests.rs
mod common;

use common::*;
use iduka_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, PipelineResult};
use std::sync::Arc;

#[derive(Debug, Default)]
struct NotifyContext {
  delivered: bool,
}

#[tokio::test]
async fn registry_dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut checkout = Pipeline::<OrderFlowContext, TestError>::new("checkout", &[("write", false, None)]);
  checkout.on_boxed("write", recording_handler("write"));
  registry.register(Arc::new(checkout));

  let mut notify = Pipeline::<NotifyContext, TestError>::new("notify", &[("insert", false, None)]);
  notify.on("insert", |ctx: ContextData<NotifyContext>| async move {
    ctx.write().delivered = true;
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  registry.register(Arc::new(notify));

  assert!(registry.is_registered::<OrderFlowContext>());
  assert!(registry.is_registered::<NotifyContext>());

  let order_ctx = ContextData::new(OrderFlowContext::default());
  assert_eq!(registry.run(order_ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(order_ctx.read().trail, vec!["write"]);

  let notify_ctx = ContextData::new(NotifyContext::default());
  registry.run(notify_ctx.clone()).await.unwrap();
  assert!(notify_ctx.read().delivered);
}

#[tokio::test]
async fn unregistered_context_type_is_a_configuration_error() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();
  assert!(!registry.is_registered::<NotifyContext>());

  let err = registry.run(ContextData::new(NotifyContext::default())).await.unwrap_err();
  match err {
    TestError::Flow(msg) => assert!(msg.contains("ConfigurationError"), "got {msg}"),
    other => panic!("expected configuration error, got {other:?}"),
  }
}

#[tokio::test]
async fn pipeline_errors_surface_through_the_registry() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();
  let mut checkout = Pipeline::<OrderFlowContext, TestError>::new("checkout", &[("write", false, None)]);
  checkout.on_boxed("write", failing_handler("write", "duplicate order"));
  registry.register(Arc::new(checkout));

  let err = registry.run(ContextData::new(OrderFlowContext::default())).await.unwrap_err();
  assert_eq!(err, TestError::Handler("duplicate order".into()));
}
