// src/pipeline/hooks.rs

//! Handler and fault-observer registration.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

fn boxed_handler<TData, Err, F, E>(
  handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
) -> Handler<TData, Err>
where
  TData: 'static + Send + Sync,
  F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
  E: Into<Err> + Send + Sync + 'static,
{
  Box::new(move |ctx_data| {
    let fut = handler_fn(ctx_data);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn push_handler(
    phase: &mut HashMap<String, Vec<Handler<TData, Err>>>,
    step_name: &str,
    handler: Handler<TData, Err>,
  ) {
    phase.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers a handler for the `before` phase of `step_name`.
  ///
  /// The handler's own error type only needs to convert into the pipeline's `Err`.
  pub fn before<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    Self::push_handler(&mut self.before, step_name, boxed_handler(handler_fn));
  }

  /// Registers a handler for the main (`on`) phase of `step_name`.
  pub fn on<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    Self::push_handler(&mut self.on, step_name, boxed_handler(handler_fn));
  }

  /// Registers a handler for the `after` phase of `step_name`.
  pub fn after<F, E>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<PipelineControl, E>> + Send + 'static,
    E: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    Self::push_handler(&mut self.after, step_name, boxed_handler(handler_fn));
  }

  /// Registers an already boxed handler for the `on` phase.
  pub fn on_boxed(&mut self, step_name: &str, handler: Handler<TData, Err>) {
    self.ensure_step_exists(step_name);
    Self::push_handler(&mut self.on, step_name, handler);
  }

  /// Adds an observer for failures of best-effort steps.
  pub fn on_fault(&mut self, observer: impl Fn(ContextData<TData>, &str, &Err) + Send + Sync + 'static) {
    self.fault_handlers.push(Arc::new(observer));
  }
}
