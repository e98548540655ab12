// src/pipeline/definition.rs

use crate::branch::BranchBuilder;
use crate::core::handler::{FaultHandler, Handler};
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// Ordered, named steps over a context of type `TData`, with handlers failing as `Err`.
///
/// `Err` has to absorb [`FlowError`] because the engine raises its own
/// failures (missing handlers, branch extraction, unmatched branches)
/// through the same channel.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,

  pub(crate) fault_handlers: Vec<FaultHandler<TData, Err>>,

  // step name -> number of branches finalized on it
  pub(crate) branch_counts: HashMap<String, usize>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step_name, optional, skip_if)` triples.
  ///
  /// # Panics
  ///
  /// Panics on duplicate step names; that is a wiring mistake, not a runtime condition.
  pub fn new(name: impl Into<String>, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let mut pipeline = Self {
      name: name.into(),
      steps: Vec::with_capacity(step_defs.len()),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
      fault_handlers: Vec::new(),
      branch_counts: HashMap::new(),
    };
    for (step_name, optional, skip_if) in step_defs {
      pipeline.ensure_step_not_exists(step_name);
      pipeline.steps.push(StepDef::new(*step_name, *optional, skip_if.clone()));
    }
    pipeline
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_step(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name)
  }

  pub fn branch_count(&self, step_name: &str) -> usize {
    self.branch_counts.get(step_name).copied().unwrap_or(0)
  }

  pub(crate) fn position_of(&self, step_name: &str) -> Result<usize, FlowError> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.has_step(step_name) {
      panic!("Pipeline '{}': step '{}' is not defined.", self.name, step_name);
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.has_step(step_name) {
      panic!("Pipeline '{}': step '{}' is already defined.", self.name, step_name);
    }
  }

  // --- structural edits ---

  pub fn insert_before_step(
    &mut self,
    existing_step: &str,
    new_step: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> Result<(), FlowError> {
    let idx = self.position_of(existing_step)?;
    let new_step = new_step.into();
    self.ensure_step_not_exists(&new_step);
    self.steps.insert(idx, StepDef::new(new_step, optional, skip_if));
    Ok(())
  }

  pub fn insert_after_step(
    &mut self,
    existing_step: &str,
    new_step: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> Result<(), FlowError> {
    let idx = self.position_of(existing_step)?;
    let new_step = new_step.into();
    self.ensure_step_not_exists(&new_step);
    self.steps.insert(idx + 1, StepDef::new(new_step, optional, skip_if));
    Ok(())
  }

  /// Removes a step together with its handlers. Unknown names are a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Ok(idx) = self.position_of(step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
      self.after.remove(step_name);
      self.branch_counts.remove(step_name);
    }
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) -> Result<(), FlowError> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].optional = optional;
    Ok(())
  }

  pub fn set_skip_condition(
    &mut self,
    step_name: &str,
    skip_if: Option<SkipCondition<TData>>,
  ) -> Result<(), FlowError> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].skip_if = skip_if;
    Ok(())
  }

  /// Starts configuring branches hosted by `step_name`.
  ///
  /// The step is appended if it does not exist yet.
  pub fn branches_for_step(&mut self, step_name: &str) -> BranchBuilder<'_, TData, Err> {
    if !self.has_step(step_name) {
      self.steps.push(StepDef::new(step_name, false, None));
    }
    BranchBuilder::new(self, step_name.to_string())
  }
}
