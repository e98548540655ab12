// storefront/src/web/handlers/settings_handlers.rs

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::Identity;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
pub struct SetAcceptanceRequest {
  pub enabled: bool,
}

/// Cached read; pages poll this.
#[instrument(name = "handler::get_order_acceptance", skip(app_state))]
pub async fn get_order_acceptance_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let setting = app_state.acceptance.get().await?;
  Ok(HttpResponse::Ok().json(setting))
}

#[instrument(name = "handler::set_order_acceptance", skip(app_state, body), fields(enabled = body.enabled))]
pub async fn set_order_acceptance_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  body: web::Json<SetAcceptanceRequest>,
) -> Result<HttpResponse, AppError> {
  identity.require_admin()?;
  let setting = app_state.acceptance.set_override(body.enabled).await?;
  info!(user_id = ?identity.user_id, "Order acceptance override updated.");
  Ok(HttpResponse::Ok().json(setting))
}

#[instrument(name = "handler::clear_order_acceptance", skip(app_state))]
pub async fn clear_order_acceptance_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
) -> Result<HttpResponse, AppError> {
  identity.require_admin()?;
  let setting = app_state.acceptance.clear_override().await?;
  Ok(HttpResponse::Ok().json(setting))
}
