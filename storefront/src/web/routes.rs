// storefront/src/web/routes.rs

use crate::web::handlers::{
  cart_handlers, checkout_handlers, notification_handlers, order_handlers, settings_handlers,
};
use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::resource("/settings/order-acceptance")
          .route(web::get().to(settings_handlers::get_order_acceptance_handler))
          .route(web::post().to(settings_handlers::set_order_acceptance_handler))
          .route(web::delete().to(settings_handlers::clear_order_acceptance_handler)),
      )
      .service(
        web::resource("/cart")
          .route(web::get().to(cart_handlers::get_cart_handler))
          .route(web::put().to(cart_handlers::save_cart_handler)),
      )
      .route("/checkout", web::post().to(checkout_handlers::submit_checkout_handler))
      .service(
        web::scope("/orders")
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}/actions", web::post().to(order_handlers::order_action_handler)),
      )
      .service(
        web::scope("/notifications")
          .route("", web::post().to(notification_handlers::create_notification_handler))
          .route("", web::get().to(notification_handlers::list_notifications_handler))
          .route("/{id}/read", web::post().to(notification_handlers::mark_notification_read_handler)),
      ),
  );
}
