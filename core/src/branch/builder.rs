// src/branch/builder.rs

//! Fluent configuration of the branches hosted by one step:
//!
//! ```ignore
//! pipeline
//!   .branches_for_step("dispatch_payment")
//!   .add_branch(verified_flow, |ctx| Ok(ctx.read().payment.clone()))
//!   .when(|ctx| ctx.read().form.payment_verified)
//!   .add_branch(initiate_flow, |ctx| Ok(ctx.read().payment.clone()))
//!   .when(|_| true)
//!   .otherwise(NoMatch::Fail)
//!   .finalize(false);
//! ```

use crate::branch::arm::{AnyArm, Arm, Extractor};
use crate::branch::NoMatch;
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tracing::{event, Level};

pub struct BranchBuilder<'pipeline, TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: &'pipeline mut Pipeline<TData, Err>,
  step_name: String,
  arms: Vec<Arc<dyn AnyArm<TData, Err>>>,
  no_match: NoMatch,
}

impl<'pipeline, TData, Err> BranchBuilder<'pipeline, TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) fn new(pipeline: &'pipeline mut Pipeline<TData, Err>, step_name: String) -> Self {
    Self {
      pipeline,
      step_name,
      arms: Vec::new(),
      no_match: NoMatch::default(),
    }
  }

  /// Adds a branch running `pipeline` over the sub-context returned by `extractor`.
  /// Finish it with [`BranchConfigurator::when`].
  pub fn add_branch<SData>(
    self,
    pipeline: Arc<Pipeline<SData, Err>>,
    extractor: impl Fn(ContextData<TData>) -> Result<ContextData<SData>, FlowError> + Send + Sync + 'static,
  ) -> BranchConfigurator<'pipeline, TData, SData, Err>
  where
    SData: 'static + Send + Sync,
  {
    BranchConfigurator {
      builder: self,
      pipeline,
      extractor: Arc::new(extractor),
    }
  }

  pub fn otherwise(mut self, behavior: NoMatch) -> Self {
    self.no_match = behavior;
    self
  }

  /// Installs the branching handler as the step's `on` phase.
  ///
  /// With `optional` set, a failing branch is treated like any other
  /// best-effort failure: reported to fault observers, run continues.
  pub fn finalize(self, optional: bool) {
    let arms = Arc::new(self.arms);
    let no_match = self.no_match;
    let step_name = self.step_name.clone();
    let num_arms = arms.len();

    let branching_handler: Handler<TData, Err> = Box::new(move |ctx_data: ContextData<TData>| {
      let arms = Arc::clone(&arms);
      let step_name = step_name.clone();
      Box::pin(async move {
        for arm in arms.iter() {
          if arm.matches(ctx_data.clone()) {
            event!(Level::DEBUG, step = %step_name, branch = arm.label(), "Branch selected.");
            return arm.execute(&step_name, ctx_data.clone()).await;
          }
        }
        event!(Level::DEBUG, step = %step_name, ?no_match, "No branch matched.");
        match no_match {
          NoMatch::Continue => Ok(PipelineControl::Continue),
          NoMatch::Stop => Ok(PipelineControl::Stop),
          NoMatch::Fail => Err(Err::from(FlowError::NoBranchMatched { step_name })),
        }
      })
    });

    if let Some(step_def) = self.pipeline.steps.iter_mut().find(|s| s.name == self.step_name) {
      step_def.optional = optional;
    }
    self.pipeline.branch_counts.insert(self.step_name.clone(), num_arms);
    self.pipeline.on.insert(self.step_name.clone(), vec![branching_handler]);

    event!(Level::DEBUG, pipeline = %self.pipeline.name, step = %self.step_name, num_arms, "Branches finalized.");
  }
}

/// A branch waiting for its condition.
pub struct BranchConfigurator<'pipeline, TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  builder: BranchBuilder<'pipeline, TData, Err>,
  pipeline: Arc<Pipeline<SData, Err>>,
  extractor: Extractor<TData, SData>,
}

impl<'pipeline, TData, SData, Err> BranchConfigurator<'pipeline, TData, SData, Err>
where
  TData: 'static + Send + Sync,
  SData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn when(
    mut self,
    condition: impl Fn(ContextData<TData>) -> bool + Send + Sync + 'static,
  ) -> BranchBuilder<'pipeline, TData, Err> {
    self.builder.arms.push(Arc::new(Arm {
      pipeline: self.pipeline,
      extractor: self.extractor,
      condition: Arc::new(condition),
    }));
    self.builder
  }
}
