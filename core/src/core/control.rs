// src/core/control.rs

//! Flow-control signals returned by handlers and by a whole run.

/// What a handler wants the pipeline to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt the run. Remaining handlers of this step and all later steps are skipped.
  Stop,
}

/// Outcome of a run that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  /// A handler returned [`PipelineControl::Stop`] while running `step`.
  Stopped { step: String },
}

impl PipelineResult {
  pub fn is_completed(&self) -> bool {
    matches!(self, PipelineResult::Completed)
  }

  pub fn stopped_at(&self) -> Option<&str> {
    match self {
      PipelineResult::Completed => None,
      PipelineResult::Stopped { step } => Some(step),
    }
  }
}
