// storefront/src/main.rs

use iduka_storefront::clock::{Clock, SystemClock};
use iduka_storefront::config::AppConfig;
use iduka_storefront::state::{AppState, Backends};
use iduka_storefront::web::routes::configure_app_routes;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
  tracing::error!(error = %err, "{}", context);
  io::Error::new(io::ErrorKind::Other, format!("{context}: {err}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting Iduka storefront server...");

  let app_config = AppConfig::from_env()
    .map(Arc::new)
    .map_err(|e| startup_error("Failed to load application configuration", e))?;
  let clock: Arc<dyn Clock> = Arc::new(SystemClock);

  let backends = match &app_config.database_url {
    Some(database_url) => {
      let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| startup_error("Failed to connect to the database", e))?;
      tracing::info!("Successfully connected to the database.");
      sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| startup_error("Failed to run database migrations", e))?;
      Backends::postgres(pool, &app_config, clock)
    }
    None => {
      tracing::warn!("DATABASE_URL not set; orders and notifications are kept in memory.");
      Backends::in_memory(&app_config, clock)
    }
  }
  .map_err(|e| startup_error("Failed to set up backends", e))?;

  let app_state = AppState::build(Arc::clone(&app_config), backends);
  tracing::info!("Checkout and notification pipelines registered.");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
