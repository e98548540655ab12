// storefront/src/web/handlers/cart_handlers.rs

use crate::errors::AppError;
use crate::models::CartLine;
use crate::state::AppState;
use crate::web::extractors::SessionId;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct SaveCartRequest {
  pub lines: Vec<CartLine>,
}

#[instrument(name = "handler::get_cart", skip(app_state), fields(session_id = %session.0))]
pub async fn get_cart_handler(app_state: web::Data<AppState>, session: SessionId) -> Result<HttpResponse, AppError> {
  let lines = app_state.carts.get(&session.0).await?;
  Ok(HttpResponse::Ok().json(json!({ "lines": lines })))
}

#[instrument(name = "handler::save_cart", skip(app_state, body), fields(session_id = %session.0))]
pub async fn save_cart_handler(
  app_state: web::Data<AppState>,
  session: SessionId,
  body: web::Json<SaveCartRequest>,
) -> Result<HttpResponse, AppError> {
  let lines = body.into_inner().lines;
  if lines.iter().any(|l| l.quantity < 1 || l.unit_price < 0) {
    return Err(AppError::Validation("Cart lines need a positive quantity and a price".to_string()));
  }
  app_state.carts.save(&session.0, lines.clone()).await?;
  Ok(HttpResponse::Ok().json(json!({ "lines": lines })))
}
