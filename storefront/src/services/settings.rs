// storefront/src/services/settings.rs

use crate::errors::Result as AppResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{PgPool, Row};

const ACCEPTANCE_KEY: &str = "order_acceptance_override";

/// Persistence for the admin override of order acceptance.
#[async_trait]
pub trait SettingsStore: Send + Sync {
  async fn acceptance_override(&self) -> AppResult<Option<bool>>;

  /// `None` clears the override.
  async fn set_acceptance_override(&self, value: Option<bool>) -> AppResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
  acceptance: RwLock<Option<bool>>,
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
  async fn acceptance_override(&self) -> AppResult<Option<bool>> {
    Ok(*self.acceptance.read())
  }

  async fn set_acceptance_override(&self, value: Option<bool>) -> AppResult<()> {
    *self.acceptance.write() = value;
    Ok(())
  }
}

pub struct PgSettingsStore {
  pool: PgPool,
}

impl PgSettingsStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
  async fn acceptance_override(&self) -> AppResult<Option<bool>> {
    let row = sqlx::query("SELECT bool_value FROM store_settings WHERE key = $1")
      .bind(ACCEPTANCE_KEY)
      .fetch_optional(&self.pool)
      .await?;
    Ok(match row {
      Some(row) => row.try_get::<Option<bool>, _>("bool_value")?,
      None => None,
    })
  }

  async fn set_acceptance_override(&self, value: Option<bool>) -> AppResult<()> {
    match value {
      Some(enabled) => {
        sqlx::query(
          "INSERT INTO store_settings (key, bool_value, updated_at) VALUES ($1, $2, now()) \
           ON CONFLICT (key) DO UPDATE SET bool_value = EXCLUDED.bool_value, updated_at = now()",
        )
        .bind(ACCEPTANCE_KEY)
        .bind(enabled)
        .execute(&self.pool)
        .await?;
      }
      None => {
        sqlx::query("DELETE FROM store_settings WHERE key = $1")
          .bind(ACCEPTANCE_KEY)
          .execute(&self.pool)
          .await?;
      }
    }
    Ok(())
  }
}
