// src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Framework-level failures raised by the engine itself.
///
/// Pipelines are generic over their own error type `Err`, which must be
/// `From<FlowError>` so these can travel through the same channel as
/// handler errors.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for required step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Branch extractor failed for step '{step_name}': {source}")]
  ExtractorFailure {
    step_name: String,
    #[source]
    source: AnyhowError,
  },

  #[error("No branch matched for step '{step_name}'")]
  NoBranchMatched { step_name: String },

  #[error("Handler failed: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl FlowError {
  /// Name of the step the error is attached to, if any.
  pub fn step_name(&self) -> Option<&str> {
    match self {
      FlowError::StepNotFound { step_name }
      | FlowError::HandlerMissing { step_name }
      | FlowError::ExtractorFailure { step_name, .. }
      | FlowError::NoBranchMatched { step_name }
      | FlowError::ConfigurationError { step_name, .. } => Some(step_name),
      FlowError::HandlerError { .. } | FlowError::Internal(_) => None,
    }
  }
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<FlowError>() {
      Ok(flow_err) => flow_err,
      Err(source) => FlowError::HandlerError { source },
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
