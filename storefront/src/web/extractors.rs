// storefront/src/web/extractors.rs

//! Header-based identity. Authentication proper happens in front of this
//! service; it forwards the caller as `X-User-ID` / `X-User-Role`.

use crate::errors::AppError;
use crate::models::{Actor, Role};
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
pub const SESSION_ID_HEADER: &str = "X-Session-ID";

fn header<'r>(req: &'r HttpRequest, name: &str) -> Option<&'r str> {
  req
    .headers()
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

/// The caller, possibly a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
  pub user_id: Option<Uuid>,
  pub role: Role,
}

impl Identity {
  pub fn actor(&self) -> Actor {
    Actor {
      user_id: self.user_id,
      role: self.role,
    }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn require_admin(&self) -> Result<(), AppError> {
    if self.is_admin() {
      Ok(())
    } else {
      Err(AppError::Forbidden("Admin role required".to_string()))
    }
  }

  pub fn role_name(&self) -> &'static str {
    match self.role {
      Role::Customer => "customer",
      Role::Rider => "rider",
      Role::Admin => "admin",
    }
  }
}

impl FromRequest for Identity {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let user_id = match header(req, USER_ID_HEADER).map(Uuid::parse_str) {
      None => None,
      Some(Ok(id)) => Some(id),
      Some(Err(_)) => {
        warn!("Identity extractor: malformed X-User-ID header.");
        return ready(Err(AppError::Unauthorized("Malformed X-User-ID header".to_string())));
      }
    };
    let role = match header(req, USER_ROLE_HEADER) {
      None => Role::Customer,
      Some(raw) => match Role::parse(raw) {
        Some(role) => role,
        None => return ready(Err(AppError::Unauthorized(format!("Unknown role '{raw}'")))),
      },
    };
    ready(Ok(Identity { user_id, role }))
  }
}

/// Checkout session key, required for anything session-scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl FromRequest for SessionId {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(
      header(req, SESSION_ID_HEADER)
        .map(|s| SessionId(s.to_string()))
        .ok_or_else(|| AppError::Validation("Missing X-Session-ID header".to_string())),
    )
  }
}
