// storefront/src/web/handlers/notification_handlers.rs

use crate::errors::AppError;
use crate::models::CreateNotification;
use crate::state::AppState;
use crate::web::extractors::Identity;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

#[instrument(name = "handler::create_notification", skip(app_state, body), fields(kind = %body.kind))]
pub async fn create_notification_handler(
  app_state: web::Data<AppState>,
  body: web::Json<CreateNotification>,
) -> Result<HttpResponse, AppError> {
  let created = app_state.notifications.create(body.into_inner()).await?;
  if created.skipped_duplicate {
    Ok(HttpResponse::Ok().json(created))
  } else {
    Ok(HttpResponse::Created().json(created))
  }
}

#[instrument(name = "handler::list_notifications", skip(app_state))]
pub async fn list_notifications_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
) -> Result<HttpResponse, AppError> {
  if identity.user_id.is_none() && !identity.is_admin() {
    return Err(AppError::Unauthorized("Sign in to see notifications".to_string()));
  }
  let notifications = app_state
    .notifications
    .list_for(identity.user_id, Some(identity.role_name()))
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "notifications": notifications })))
}

#[instrument(name = "handler::mark_notification_read", skip(app_state))]
pub async fn mark_notification_read_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let notification = app_state
    .notifications
    .mark_read(path.into_inner(), identity.user_id, Some(identity.role_name()))
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "notification": notification })))
}
