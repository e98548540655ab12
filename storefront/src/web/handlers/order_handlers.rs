// storefront/src/web/handlers/order_handlers.rs

use crate::errors::AppError;
use crate::models::OrderAction;
use crate::state::AppState;
use crate::web::extractors::Identity;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct OrderActionRequest {
  pub action: OrderAction,
}

#[instrument(name = "handler::get_order", skip(app_state, identity))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let found = app_state
    .orders
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;
  if !(identity.is_admin() || identity.actor().owns(&found.order)) {
    // Not the owner: answer as if the order did not exist.
    return Err(AppError::NotFound(format!("Order {order_id} not found")));
  }
  Ok(HttpResponse::Ok().json(found))
}

/// Which notification an action sends, and to whom.
fn follow_up(action: OrderAction, notify_owner: bool) -> Option<(&'static str, bool)> {
  match action {
    OrderAction::StartProcessing | OrderAction::Ship | OrderAction::Cancel => {
      Some(("order_status_change", notify_owner))
    }
    OrderAction::MarkDelivered => Some(("order_delivered", notify_owner)),
    OrderAction::RequestRefund => Some(("refund_requested", false)),
    OrderAction::ApproveRefund => Some(("refund_approved", notify_owner)),
    OrderAction::RejectRefund => Some(("order_status_change", notify_owner)),
  }
}

#[instrument(name = "handler::order_action", skip(app_state, identity, body), fields(action = ?body.action))]
pub async fn order_action_handler(
  app_state: web::Data<AppState>,
  identity: Identity,
  path: web::Path<Uuid>,
  body: web::Json<OrderActionRequest>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let before = app_state
    .orders
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;
  let previous_status = before.order.status;

  let updated = app_state
    .orders
    .apply_action(order_id, body.action, &identity.actor(), app_state.clock.now())
    .await?;

  if let Some((kind, to_owner)) = follow_up(body.action, updated.user_id.is_some()) {
    let items: Vec<_> = before
      .items
      .iter()
      .map(|i| json!({ "name": i.product_name, "quantity": i.quantity, "price": i.price }))
      .collect();
    let status = match body.action {
      OrderAction::RejectRefund => "refund rejected".to_string(),
      _ => updated.status.to_string(),
    };
    let meta = json!({
      "order_id": updated.id,
      "order_number": updated.order_number,
      "status": status,
      "previous_status": previous_status.to_string(),
      "items": items,
      "total": updated.total,
      "delivery_address": format!("{}, {}", updated.address, updated.city),
    });
    let request = crate::models::CreateNotification {
      recipient_user_id: if to_owner { updated.user_id } else { None },
      recipient_role: if to_owner { None } else { Some("admin".to_string()) },
      kind: kind.to_string(),
      meta,
      ..Default::default()
    };
    if let Err(e) = app_state.notifications.create(request).await {
      warn!(order_id = %updated.id, error = %e, "Order action notification failed.");
    }
  }

  Ok(HttpResponse::Ok().json(updated))
}
