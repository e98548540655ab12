// storefront/src/services/notification_store.rs

use crate::errors::Result as AppResult;
use crate::models::{NewNotification, Notification, Recipient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[async_trait]
pub trait NotificationStore: Send + Sync {
  /// Latest notification of `kind` for `recipient` created at or after `since`.
  async fn find_recent(
    &self,
    kind: &str,
    recipient: &Recipient,
    since: DateTime<Utc>,
  ) -> AppResult<Option<Notification>>;

  async fn insert(&self, notification: NewNotification, created_at: DateTime<Utc>) -> AppResult<Notification>;

  /// Everything addressed to any of `recipients`, newest first.
  async fn list_for_recipient(&self, recipients: &[Recipient]) -> AppResult<Vec<Notification>>;

  async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Notification>>;

  async fn get(&self, id: Uuid) -> AppResult<Option<Notification>>;
}

fn addressed_to(n: &Notification, recipient: &Recipient) -> bool {
  match recipient {
    Recipient::User(id) => n.recipient_user_id == Some(*id),
    Recipient::Role(role) => n.recipient_user_id.is_none() && n.recipient_role.as_deref() == Some(role.as_str()),
  }
}

#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
  rows: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
  pub fn len(&self) -> usize {
    self.rows.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.read().is_empty()
  }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
  async fn find_recent(
    &self,
    kind: &str,
    recipient: &Recipient,
    since: DateTime<Utc>,
  ) -> AppResult<Option<Notification>> {
    Ok(
      self
        .rows
        .read()
        .iter()
        .filter(|n| n.kind == kind && addressed_to(n, recipient) && n.created_at >= since)
        .max_by_key(|n| n.created_at)
        .cloned(),
    )
  }

  async fn insert(&self, notification: NewNotification, created_at: DateTime<Utc>) -> AppResult<Notification> {
    let stored = notification.into_notification(Uuid::new_v4(), created_at);
    self.rows.write().push(stored.clone());
    Ok(stored)
  }

  async fn list_for_recipient(&self, recipients: &[Recipient]) -> AppResult<Vec<Notification>> {
    let mut found: Vec<Notification> = self
      .rows
      .read()
      .iter()
      .filter(|n| recipients.iter().any(|r| addressed_to(n, r)))
      .cloned()
      .collect();
    found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(found)
  }

  async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Notification>> {
    let mut rows = self.rows.write();
    Ok(rows.iter_mut().find(|n| n.id == id).map(|n| {
      n.read_at.get_or_insert(at);
      n.clone()
    }))
  }

  async fn get(&self, id: Uuid) -> AppResult<Option<Notification>> {
    Ok(self.rows.read().iter().find(|n| n.id == id).cloned())
  }
}

pub struct PgNotificationStore {
  pool: PgPool,
}

const COLUMNS: &str = "id, recipient_user_id, recipient_role, type, title, body, meta, read_at, created_at";

fn notification_from_row(row: &PgRow) -> AppResult<Notification> {
  Ok(Notification {
    id: row.try_get("id")?,
    recipient_user_id: row.try_get("recipient_user_id")?,
    recipient_role: row.try_get("recipient_role")?,
    kind: row.try_get("type")?,
    title: row.try_get("title")?,
    body: row.try_get("body")?,
    meta: row.try_get("meta")?,
    read_at: row.try_get("read_at")?,
    created_at: row.try_get("created_at")?,
  })
}

impl PgNotificationStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
  async fn find_recent(
    &self,
    kind: &str,
    recipient: &Recipient,
    since: DateTime<Utc>,
  ) -> AppResult<Option<Notification>> {
    let (user_id, role) = match recipient {
      Recipient::User(id) => (Some(*id), None),
      Recipient::Role(role) => (None, Some(role.as_str())),
    };
    let query = format!(
      "SELECT {COLUMNS} FROM notifications WHERE type = $1 \
       AND recipient_user_id IS NOT DISTINCT FROM $2 \
       AND ($2 IS NOT NULL OR recipient_role = $3) \
       AND created_at >= $4 ORDER BY created_at DESC LIMIT 1"
    );
    let row = sqlx::query(&query)
      .bind(kind)
      .bind(user_id)
      .bind(role)
      .bind(since)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(notification_from_row).transpose()
  }

  async fn insert(&self, notification: NewNotification, created_at: DateTime<Utc>) -> AppResult<Notification> {
    let stored = notification.into_notification(Uuid::new_v4(), created_at);
    sqlx::query(
      "INSERT INTO notifications (id, recipient_user_id, recipient_role, type, title, body, meta, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(stored.id)
    .bind(stored.recipient_user_id)
    .bind(&stored.recipient_role)
    .bind(&stored.kind)
    .bind(&stored.title)
    .bind(&stored.body)
    .bind(&stored.meta)
    .bind(stored.created_at)
    .execute(&self.pool)
    .await?;
    Ok(stored)
  }

  async fn list_for_recipient(&self, recipients: &[Recipient]) -> AppResult<Vec<Notification>> {
    let user_ids: Vec<Uuid> = recipients
      .iter()
      .filter_map(|r| match r {
        Recipient::User(id) => Some(*id),
        Recipient::Role(_) => None,
      })
      .collect();
    let roles: Vec<String> = recipients
      .iter()
      .filter_map(|r| match r {
        Recipient::Role(role) => Some(role.clone()),
        Recipient::User(_) => None,
      })
      .collect();
    let query = format!(
      "SELECT {COLUMNS} FROM notifications \
       WHERE recipient_user_id = ANY($1) OR (recipient_user_id IS NULL AND recipient_role = ANY($2)) \
       ORDER BY created_at DESC LIMIT 200"
    );
    let rows = sqlx::query(&query)
      .bind(&user_ids)
      .bind(&roles)
      .fetch_all(&self.pool)
      .await?;
    rows.iter().map(notification_from_row).collect()
  }

  async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Notification>> {
    let query = format!(
      "UPDATE notifications SET read_at = COALESCE(read_at, $2) WHERE id = $1 RETURNING {COLUMNS}"
    );
    let row = sqlx::query(&query).bind(id).bind(at).fetch_optional(&self.pool).await?;
    row.as_ref().map(notification_from_row).transpose()
  }

  async fn get(&self, id: Uuid) -> AppResult<Option<Notification>> {
    let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
    row.as_ref().map(notification_from_row).transpose()
  }
}
