// storefront/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use iduka_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Unauthorized: {0}")]
  Unauthorized(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Invalid Transition: {0}")]
  InvalidTransition(String),

  #[error("Order Write Error: {0}")]
  Write(#[from] WriteError),

  #[error("Payment Gateway Error: {0}")]
  Gateway(#[from] GatewayError),

  /// Post-commit follow-up failures. The message is shown to the user as-is.
  #[error("{0}")]
  Reconciliation(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    let err = match err.downcast::<AppError>() {
      Ok(app_err) => return app_err,
      Err(err) => err,
    };
    match err.downcast::<sqlx::Error>() {
      Ok(db_err) => AppError::Sqlx(db_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Unauthorized(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::Forbidden(m) => HttpResponse::Forbidden().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::InvalidTransition(m) => HttpResponse::Conflict().json(json!({"error": m})),
      AppError::Write(write_err) => {
        let body = json!({"error": write_err.user_message(), "kind": write_err.kind()});
        match write_err {
          WriteError::Conflict(_) => HttpResponse::Conflict().json(body),
          WriteError::Database(_) => HttpResponse::InternalServerError().json(body),
          _ => HttpResponse::UnprocessableEntity().json(body),
        }
      }
      AppError::Gateway(g) => HttpResponse::BadGateway().json(json!({"error": "Payment provider error", "detail": g.to_string()})),
      AppError::Reconciliation(m) => HttpResponse::InternalServerError().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        HttpResponse::InternalServerError()
          .json(json!({"error": "Workflow processing error", "detail": source.to_string()}))
      }
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

/// Order persistence failures, classified by the database constraint that fired.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
  #[error("malformed reference: {0}")]
  MalformedReference(String),

  #[error("referenced row does not exist: {0}")]
  MissingReference(String),

  #[error("conflicting row: {0}")]
  Conflict(String),

  #[error("invalid order: {0}")]
  Invalid(String),

  #[error("database failure: {0}")]
  Database(String),
}

impl WriteError {
  /// Maps a sqlx error onto the taxonomy using its SQLSTATE.
  pub fn from_sqlx(err: &sqlx::Error) -> Self {
    let Some(db_err) = err.as_database_error() else {
      return WriteError::Database(err.to_string());
    };
    let detail = db_err.message().to_string();
    match db_err.code().as_deref() {
      Some("22P02") => WriteError::MalformedReference(detail),
      Some("23503") => WriteError::MissingReference(detail),
      Some("23505") => WriteError::Conflict(detail),
      _ => WriteError::Database(detail),
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      WriteError::MalformedReference(_) => "malformed_reference",
      WriteError::MissingReference(_) => "missing_reference",
      WriteError::Conflict(_) => "conflict",
      WriteError::Invalid(_) => "invalid",
      WriteError::Database(_) => "database",
    }
  }

  /// Text safe to show a shopper.
  pub fn user_message(&self) -> String {
    match self {
      WriteError::MalformedReference(_) => {
        "One of the products in your cart has an invalid id. Please remove it and add it again.".to_string()
      }
      WriteError::MissingReference(_) => {
        "One of the products in your cart is no longer available. Please refresh your cart and try again.".to_string()
      }
      WriteError::Conflict(_) => "This order conflicts with an existing record. Please try again.".to_string(),
      WriteError::Invalid(detail) => format!("Your order could not be saved: {detail}"),
      WriteError::Database(_) => "We could not save your order. Please try again in a moment.".to_string(),
    }
  }
}

/// Failures talking to the payment gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
  #[error("invalid payment request: {0}")]
  InvalidRequest(String),

  #[error("payment gateway declined: {0}")]
  Rejected(String),

  #[error("payment gateway unreachable: {0}")]
  Transport(String),

  #[error("unexpected gateway response ({status}): {body}")]
  UnexpectedResponse { status: u16, body: String },
}

impl From<reqwest::Error> for GatewayError {
  fn from(err: reqwest::Error) -> Self {
    GatewayError::Transport(err.to_string())
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
