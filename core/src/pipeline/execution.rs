// src/pipeline/execution.rs

//! `Pipeline::run`: walks the steps in order and drives each phase's handlers.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

enum PhaseOutcome<Err> {
  Continue,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn run_phase(
    &self,
    phase: &'static str,
    step_name: &str,
    ctx_data: &ContextData<TData>,
  ) -> PhaseOutcome<Err> {
    let handlers: Option<&Vec<Handler<TData, Err>>> = match phase {
      "before" => self.before.get(step_name),
      "on" => self.on.get(step_name),
      _ => self.after.get(step_name),
    };
    let Some(handlers) = handlers else {
      return PhaseOutcome::Continue;
    };

    for (idx, handler) in handlers.iter().enumerate() {
      let result = handler(ctx_data.clone())
        .instrument(info_span!("flow_handler", phase, handler_index = idx))
        .await;
      match result {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => {
          event!(Level::INFO, step = step_name, phase, "Handler stopped the pipeline.");
          return PhaseOutcome::Stop;
        }
        Err(e) => return PhaseOutcome::Failed(e),
      }
    }
    PhaseOutcome::Continue
  }

  fn has_handlers(&self, step_name: &str) -> bool {
    [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(step_name).is_some_and(|v| !v.is_empty()))
  }

  /// Runs every step against `ctx_data`.
  ///
  /// Returns `Ok(Completed)` when the last step finished, `Ok(Stopped { step })`
  /// when a handler asked to stop, and `Err` when a required step failed.
  /// Failures inside optional steps are handed to the fault observers and
  /// the run moves on to the next step.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = %self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline run starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(Level::DEBUG, step = step_name, "Step skipped by condition.");
          continue;
        }
      }

      if !self.has_handlers(step_name) {
        if step_def.optional {
          event!(Level::DEBUG, step = step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step = step_name, "Required step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = info_span!("flow_step", step = step_name, step_index = step_idx, optional = step_def.optional);
      let mut failure = None;
      for phase in ["before", "on", "after"] {
        match self.run_phase(phase, step_name, &ctx_data).instrument(step_span.clone()).await {
          PhaseOutcome::Continue => {}
          PhaseOutcome::Stop => {
            return Ok(PipelineResult::Stopped {
              step: step_def.name.clone(),
            })
          }
          PhaseOutcome::Failed(e) => {
            failure = Some(e);
            break;
          }
        }
      }

      if let Some(err) = failure {
        if !step_def.optional {
          event!(Level::ERROR, step = step_name, error = %err, "Required step failed.");
          return Err(err);
        }
        event!(Level::WARN, step = step_name, error = %err, "Best-effort step failed, continuing.");
        for observer in &self.fault_handlers {
          observer(ctx_data.clone(), step_name, &err);
        }
      }
    }

    event!(Level::DEBUG, "Pipeline run completed.");
    Ok(PipelineResult::Completed)
  }
}
