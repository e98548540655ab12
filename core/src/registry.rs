// src/registry.rs

//! `FlowRegistry<E>`: pipelines keyed by the type of context they run over.
//!
//! The storefront registers one pipeline per workflow context (checkout,
//! notification) at startup and dispatches through the registry, so a handler
//! only needs the context value to reach the right flow.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  fn pipeline_name(&self) -> &str;

  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct Registered<TData, PErr, AppErr>
where
  TData: 'static + Send + Sync,
  PErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<TData, PErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<TData, PErr, AppErr> ErasedRunner<AppErr> for Registered<TData, PErr, AppErr>
where
  TData: 'static + Send + Sync,
  PErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<PErr> + From<FlowError> + Send + Sync + 'static,
{
  fn pipeline_name(&self) -> &str {
    self.pipeline.name()
  }

  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let ctx = ctx_obj.downcast::<ContextData<TData>>().map_err(|_| {
      AppErr::from(FlowError::Internal(format!(
        "context handed to '{}' is not ContextData<{}>",
        self.pipeline.name(),
        std::any::type_name::<TData>()
      )))
    })?;
    self.pipeline.run(*ctx).await.map_err(AppErr::from)
  }
}

/// Type-keyed registry of pipelines. `AppErr` is what [`FlowRegistry::run`] returns.
pub struct FlowRegistry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  runners: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
}

impl<AppErr> Default for FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for contexts of type `TData`, replacing any previous one.
  pub fn register<TData, PErr>(&self, pipeline: Arc<Pipeline<TData, PErr>>)
  where
    TData: 'static + Send + Sync,
    PErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<PErr>,
  {
    event!(
      Level::DEBUG,
      pipeline = pipeline.name(),
      context_type = std::any::type_name::<TData>(),
      "Registering pipeline."
    );
    let runner = Registered::<TData, PErr, AppErr> {
      pipeline,
      _app_err: PhantomData,
    };
    let previous = self.runners.write().insert(TypeId::of::<TData>(), Arc::new(runner));
    if let Some(previous) = previous {
      event!(Level::WARN, replaced = previous.pipeline_name(), "Pipeline registration replaced.");
    }
  }

  pub fn is_registered<TData: 'static + Send + Sync>(&self) -> bool {
    self.runners.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for `TData`.
  #[instrument(name = "FlowRegistry::run", skip_all, fields(context_type = std::any::type_name::<TData>()))]
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self.runners.read().get(&TypeId::of::<TData>()).cloned();
    let Some(runner) = runner else {
      let type_name = std::any::type_name::<TData>();
      event!(Level::ERROR, "No pipeline registered for context type {}.", type_name);
      return Err(AppErr::from(FlowError::ConfigurationError {
        step_name: "FlowRegistry::run".to_string(),
        message: format!("No pipeline registered for context type {}", type_name),
      }));
    };
    runner.run_erased(Box::new(ctx_data)).await
  }
}
