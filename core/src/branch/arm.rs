// src/branch/arm.rs

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, Level};

pub(crate) type Extractor<TData, SData> =
  Arc<dyn Fn(ContextData<TData>) -> Result<ContextData<SData>, FlowError> + Send + Sync + 'static>;

pub(crate) type Condition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// One branch: a condition on the parent context, an extractor producing the
/// sub-context, and the sub-pipeline to run over it.
pub(crate) struct Arm<TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) pipeline: Arc<Pipeline<SData, Err>>,
  pub(crate) extractor: Extractor<TData, SData>,
  pub(crate) condition: Condition<TData>,
}

/// Erases `SData` so branches over different sub-context types can share a step.
#[async_trait]
pub(crate) trait AnyArm<TData, Err>: Send + Sync
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn label(&self) -> &str;

  fn matches(&self, parent: ContextData<TData>) -> bool;

  async fn execute(&self, step_name: &str, parent: ContextData<TData>) -> Result<PipelineControl, Err>;
}

#[async_trait]
impl<TData, SData, Err> AnyArm<TData, Err> for Arm<TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn label(&self) -> &str {
    self.pipeline.name()
  }

  fn matches(&self, parent: ContextData<TData>) -> bool {
    (self.condition)(parent)
  }

  async fn execute(&self, step_name: &str, parent: ContextData<TData>) -> Result<PipelineControl, Err> {
    let sub_ctx = (self.extractor)(parent).map_err(|e| {
      event!(Level::ERROR, step = step_name, branch = self.label(), error = %e, "Branch extractor failed.");
      let source = match e {
        FlowError::ExtractorFailure { source, .. } | FlowError::HandlerError { source } => source,
        other => anyhow::Error::new(other),
      };
      Err::from(FlowError::ExtractorFailure {
        step_name: step_name.to_string(),
        source,
      })
    })?;

    match self.pipeline.run(sub_ctx).await? {
      PipelineResult::Completed => Ok(PipelineControl::Continue),
      PipelineResult::Stopped { step } => {
        event!(Level::DEBUG, branch = self.label(), sub_step = %step, "Branch stopped; stopping parent step.");
        Ok(PipelineControl::Stop)
      }
    }
  }
}
