// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use iduka_flow::{ContextData, Pipeline, PipelineControl, PipelineResult};
use serial_test::serial;
use std::sync::Arc;

fn three_steps() -> Pipeline<OrderFlowContext, TestError> {
  Pipeline::new(
    "three_steps",
    &[("validate", false, None), ("write", false, None), ("acknowledge", false, None)],
  )
}

#[tokio::test]
#[serial]
async fn steps_run_in_declaration_order() {
  setup_tracing();
  let mut pipeline = three_steps();
  pipeline.on_boxed("validate", recording_handler("validate"));
  pipeline.on_boxed("write", recording_handler("write"));
  pipeline.on_boxed("acknowledge", recording_handler("acknowledge"));

  let ctx = ContextData::new(OrderFlowContext::default());
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(result, PipelineResult::Completed);
  assert_eq!(ctx.read().trail, vec!["validate", "write", "acknowledge"]);
}

#[tokio::test]
#[serial]
async fn before_on_after_phases_run_around_each_step() {
  setup_tracing();
  let mut pipeline = Pipeline::<OrderFlowContext, TestError>::new("phases", &[("write", false, None)]);
  pipeline.after("write", |ctx: ContextData<OrderFlowContext>| async move {
    ctx.write().trail.push("after".into());
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  pipeline.on("write", |ctx: ContextData<OrderFlowContext>| async move {
    ctx.write().trail.push("on".into());
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  pipeline.before("write", |ctx: ContextData<OrderFlowContext>| async move {
    ctx.write().trail.push("before".into());
    Ok::<_, TestError>(PipelineControl::Continue)
  });

  let ctx = ContextData::new(OrderFlowContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().trail, vec!["before", "on", "after"]);
}

#[tokio::test]
#[serial]
async fn stop_reports_the_stopping_step() {
  setup_tracing();
  let mut pipeline = three_steps();
  pipeline.on_boxed("validate", recording_handler("validate"));
  pipeline.on_boxed("write", recording_handler("write"));
  pipeline.on_boxed("acknowledge", recording_handler("acknowledge"));

  let ctx = ContextData::new(OrderFlowContext {
    stop_at: Some("validate".into()),
    ..Default::default()
  });
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(result.stopped_at(), Some("validate"));
  assert!(!result.is_completed());
  assert_eq!(ctx.read().trail, vec!["validate"]);
}

#[tokio::test]
#[serial]
async fn skip_condition_bypasses_step() {
  setup_tracing();
  let mut pipeline = Pipeline::<OrderFlowContext, TestError>::new(
    "skip",
    &[
      ("validate", false, None),
      (
        "dispatch_payment",
        false,
        Some(Arc::new(|ctx: ContextData<OrderFlowContext>| ctx.read().cash_on_delivery)),
      ),
      ("write", false, None),
    ],
  );
  pipeline.on_boxed("validate", recording_handler("validate"));
  pipeline.on_boxed("dispatch_payment", recording_handler("dispatch_payment"));
  pipeline.on_boxed("write", recording_handler("write"));

  let cash = ContextData::new(OrderFlowContext {
    cash_on_delivery: true,
    ..Default::default()
  });
  pipeline.run(cash.clone()).await.unwrap();
  assert_eq!(cash.read().trail, vec!["validate", "write"]);

  let momo = ContextData::new(OrderFlowContext::default());
  pipeline.run(momo.clone()).await.unwrap();
  assert_eq!(momo.read().trail, vec!["validate", "dispatch_payment", "write"]);
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut pipeline = Pipeline::<OrderFlowContext, TestError>::new(
    "optional",
    &[("validate", false, None), ("audit", true, None), ("write", false, None)],
  );
  pipeline.on_boxed("validate", recording_handler("validate"));
  pipeline.on_boxed("write", recording_handler("write"));

  let ctx = ContextData::new(OrderFlowContext::default());
  assert!(pipeline.run(ctx.clone()).await.unwrap().is_completed());
  assert_eq!(ctx.read().trail, vec!["validate", "write"]);
}

#[tokio::test]
#[serial]
async fn structural_edits_reshape_the_step_list() {
  setup_tracing();
  let mut pipeline = three_steps();
  pipeline.insert_before_step("write", "evaluate_acceptance", false, None).unwrap();
  pipeline.insert_after_step("write", "clear_state", true, None).unwrap();
  pipeline.remove_step("acknowledge");
  pipeline.remove_step("not_there");

  assert_eq!(
    pipeline.step_names(),
    vec!["validate", "evaluate_acceptance", "write", "clear_state"]
  );
  assert!(pipeline.insert_after_step("missing", "x", false, None).is_err());
  assert!(pipeline.set_optional("missing", true).is_err());
}

#[tokio::test]
#[serial]
async fn handler_sees_writes_from_earlier_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<OrderFlowContext, TestError>::new(
    "totals",
    &[("price", false, None), ("check", false, None)],
  );
  pipeline.on("price", |ctx: ContextData<OrderFlowContext>| async move {
    ctx.update(|c| c.order_total = 5_500);
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  pipeline.on("check", |ctx: ContextData<OrderFlowContext>| async move {
    let total = ctx.read().order_total;
    tokio::task::yield_now().await;
    if total != 5_500 {
      return Err(TestError::Handler(format!("unexpected total {total}")));
    }
    Ok(PipelineControl::Continue)
  });

  let ctx = ContextData::new(OrderFlowContext::default());
  assert!(pipeline.run(ctx).await.is_ok());
}
