// storefront/src/services/carts.rs

use crate::errors::Result as AppResult;
use crate::models::CartLine;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Per-session cart drafts kept between page views until checkout succeeds.
#[async_trait]
pub trait CartStore: Send + Sync {
  async fn get(&self, session_id: &str) -> AppResult<Vec<CartLine>>;

  async fn save(&self, session_id: &str, lines: Vec<CartLine>) -> AppResult<()>;

  async fn clear(&self, session_id: &str) -> AppResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
  carts: RwLock<HashMap<String, Vec<CartLine>>>,
}

#[async_trait]
impl CartStore for InMemoryCartStore {
  async fn get(&self, session_id: &str) -> AppResult<Vec<CartLine>> {
    Ok(self.carts.read().get(session_id).cloned().unwrap_or_default())
  }

  async fn save(&self, session_id: &str, lines: Vec<CartLine>) -> AppResult<()> {
    self.carts.write().insert(session_id.to_string(), lines);
    Ok(())
  }

  async fn clear(&self, session_id: &str) -> AppResult<()> {
    self.carts.write().remove(session_id);
    Ok(())
  }
}
