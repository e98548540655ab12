// storefront/src/services/orders.rs

//! Order persistence. Header and line items are written as one unit; lifecycle
//! actions go through [`Order::apply`] so the transition table is enforced here
//! rather than by each caller.

use crate::clock::Clock;
use crate::errors::{AppError, Result as AppResult, WriteError};
use crate::models::{Actor, NewOrder, Order, OrderAction, OrderLineItem, OrderWithItems};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Writes header and items atomically and returns the stored header.
  async fn create_order(&self, new_order: NewOrder) -> AppResult<Order>;

  async fn get_order(&self, order_id: Uuid) -> AppResult<Option<OrderWithItems>>;

  async fn apply_action(
    &self,
    order_id: Uuid,
    action: OrderAction,
    actor: &Actor,
    now: DateTime<Utc>,
  ) -> AppResult<Order>;

  async fn set_payment_reference(&self, order_id: Uuid, reference: &str) -> AppResult<()>;
}

fn checked(new_order: &NewOrder) -> Result<(), WriteError> {
  new_order.check_totals().map_err(WriteError::Invalid)
}

// --- in-memory ---

#[derive(Debug)]
pub struct InMemoryOrderStore {
  orders: RwLock<HashMap<Uuid, OrderWithItems>>,
  clock: Arc<dyn Clock>,
}

impl InMemoryOrderStore {
  pub fn new(clock: Arc<dyn Clock>) -> Self {
    Self {
      orders: RwLock::new(HashMap::new()),
      clock,
    }
  }

  pub fn len(&self) -> usize {
    self.orders.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.orders.read().is_empty()
  }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
  async fn create_order(&self, new_order: NewOrder) -> AppResult<Order> {
    checked(&new_order)?;
    let id = Uuid::new_v4();
    let order = new_order.to_order(id, self.clock.now());
    let items = new_order.items.iter().map(|item| OrderLineItem::from_new(id, item)).collect();
    self.orders.write().insert(
      id,
      OrderWithItems {
        order: order.clone(),
        items,
      },
    );
    info!(order_id = %id, order_number = %order.order_number, "Order stored in memory.");
    Ok(order)
  }

  async fn get_order(&self, order_id: Uuid) -> AppResult<Option<OrderWithItems>> {
    Ok(self.orders.read().get(&order_id).cloned())
  }

  async fn apply_action(
    &self,
    order_id: Uuid,
    action: OrderAction,
    actor: &Actor,
    now: DateTime<Utc>,
  ) -> AppResult<Order> {
    let mut orders = self.orders.write();
    let stored = orders
      .get_mut(&order_id)
      .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    let mut updated = stored.order.clone();
    updated.apply(action, actor, now)?;
    stored.order = updated.clone();
    Ok(updated)
  }

  async fn set_payment_reference(&self, order_id: Uuid, reference: &str) -> AppResult<()> {
    let mut orders = self.orders.write();
    let stored = orders
      .get_mut(&order_id)
      .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    stored.order.payment_reference = Some(reference.to_string());
    Ok(())
  }
}

// --- postgres ---

pub struct PgOrderStore {
  pool: PgPool,
  clock: Arc<dyn Clock>,
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, customer_name, customer_email, customer_phone, \
  address, city, subtotal, delivery_fee, total, status, refund_status, payment_method, payment_reference, \
  delivery_notes, schedule_note, created_at, delivered_at";

fn order_from_row(row: &PgRow) -> AppResult<Order> {
  Ok(Order {
    id: row.try_get("id")?,
    order_number: row.try_get("order_number")?,
    user_id: row.try_get("user_id")?,
    customer_name: row.try_get("customer_name")?,
    customer_email: row.try_get("customer_email")?,
    customer_phone: row.try_get("customer_phone")?,
    address: row.try_get("address")?,
    city: row.try_get("city")?,
    subtotal: row.try_get("subtotal")?,
    delivery_fee: row.try_get("delivery_fee")?,
    total: row.try_get("total")?,
    status: row.try_get::<String, _>("status")?.parse()?,
    refund_status: row.try_get::<String, _>("refund_status")?.parse()?,
    payment_method: row.try_get::<String, _>("payment_method")?.parse()?,
    payment_reference: row.try_get("payment_reference")?,
    delivery_notes: row.try_get("delivery_notes")?,
    schedule_note: row.try_get("schedule_note")?,
    created_at: row.try_get("created_at")?,
    delivered_at: row.try_get("delivered_at")?,
  })
}

fn item_from_row(row: &PgRow) -> AppResult<OrderLineItem> {
  Ok(OrderLineItem {
    id: row.try_get("id")?,
    order_id: row.try_get("order_id")?,
    product_id: row.try_get("product_id")?,
    product_variation_id: row.try_get("product_variation_id")?,
    product_name: row.try_get("product_name")?,
    price: row.try_get("price")?,
    quantity: row.try_get("quantity")?,
    total: row.try_get("total")?,
  })
}

impl PgOrderStore {
  pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
    Self { pool, clock }
  }

  async fn insert_all(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
    items: &[OrderLineItem],
  ) -> Result<(), sqlx::Error> {
    sqlx::query(
      "INSERT INTO orders (id, order_number, user_id, customer_name, customer_email, customer_phone, \
       address, city, subtotal, delivery_fee, total, status, refund_status, payment_method, payment_reference, \
       delivery_notes, schedule_note, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(&order.customer_name)
    .bind(&order.customer_email)
    .bind(&order.customer_phone)
    .bind(&order.address)
    .bind(&order.city)
    .bind(order.subtotal)
    .bind(order.delivery_fee)
    .bind(order.total)
    .bind(order.status.as_str())
    .bind(order.refund_status.as_str())
    .bind(order.payment_method.as_str())
    .bind(&order.payment_reference)
    .bind(&order.delivery_notes)
    .bind(&order.schedule_note)
    .bind(order.created_at)
    .execute(&mut **tx)
    .await?;

    for item in items {
      sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, product_variation_id, product_name, price, quantity, total) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
      )
      .bind(item.id)
      .bind(item.order_id)
      .bind(item.product_id)
      .bind(&item.product_variation_id)
      .bind(&item.product_name)
      .bind(item.price)
      .bind(item.quantity)
      .bind(item.total)
      .execute(&mut **tx)
      .await?;
    }
    Ok(())
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  #[instrument(name = "PgOrderStore::create_order", skip_all, fields(items = new_order.items.len()))]
  async fn create_order(&self, new_order: NewOrder) -> AppResult<Order> {
    checked(&new_order)?;
    let id = Uuid::new_v4();
    let order = new_order.to_order(id, self.clock.now());
    let items: Vec<OrderLineItem> = new_order.items.iter().map(|item| OrderLineItem::from_new(id, item)).collect();

    let write = async {
      let mut tx = self.pool.begin().await?;
      Self::insert_all(&mut tx, &order, &items).await?;
      tx.commit().await
    };
    write.await.map_err(|e| WriteError::from_sqlx(&e))?;

    info!(order_id = %order.id, order_number = %order.order_number, "Order committed.");
    Ok(order)
  }

  async fn get_order(&self, order_id: Uuid) -> AppResult<Option<OrderWithItems>> {
    let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let Some(row) = sqlx::query(&query).bind(order_id).fetch_optional(&self.pool).await? else {
      return Ok(None);
    };
    let order = order_from_row(&row)?;
    let item_rows = sqlx::query(
      "SELECT id, order_id, product_id, product_variation_id, product_name, price, quantity, total \
       FROM order_items WHERE order_id = $1 ORDER BY product_name, id",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    let items = item_rows.iter().map(item_from_row).collect::<AppResult<Vec<_>>>()?;
    Ok(Some(OrderWithItems { order, items }))
  }

  #[instrument(name = "PgOrderStore::apply_action", skip(self, actor))]
  async fn apply_action(
    &self,
    order_id: Uuid,
    action: OrderAction,
    actor: &Actor,
    now: DateTime<Utc>,
  ) -> AppResult<Order> {
    let mut tx = self.pool.begin().await?;
    let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&query)
      .bind(order_id)
      .fetch_optional(&mut *tx)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    let mut order = order_from_row(&row)?;
    order.apply(action, actor, now)?;

    sqlx::query("UPDATE orders SET status = $2, refund_status = $3, delivered_at = $4 WHERE id = $1")
      .bind(order.id)
      .bind(order.status.as_str())
      .bind(order.refund_status.as_str())
      .bind(order.delivered_at)
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;
    Ok(order)
  }

  async fn set_payment_reference(&self, order_id: Uuid, reference: &str) -> AppResult<()> {
    let result = sqlx::query("UPDATE orders SET payment_reference = $2 WHERE id = $1")
      .bind(order_id)
      .bind(reference)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("order {order_id}")));
    }
    Ok(())
  }
}
