// storefront/src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Who a notification is addressed to: one user, or everyone holding a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recipient {
  User(Uuid),
  Role(String),
}

impl fmt::Display for Recipient {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Recipient::User(id) => write!(f, "user:{}", id),
      Recipient::Role(role) => write!(f, "role:{}", role),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
  pub id: Uuid,
  pub recipient_user_id: Option<Uuid>,
  pub recipient_role: Option<String>,
  #[serde(rename = "type")]
  pub kind: String,
  pub title: String,
  pub body: String,
  pub meta: Value,
  pub read_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

impl Notification {
  pub fn recipient(&self) -> Option<Recipient> {
    match (&self.recipient_user_id, &self.recipient_role) {
      (Some(id), _) => Some(Recipient::User(*id)),
      (None, Some(role)) => Some(Recipient::Role(role.clone())),
      (None, None) => None,
    }
  }
}

/// A rendered notification ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
  pub recipient: Recipient,
  pub kind: String,
  pub title: String,
  pub body: String,
  pub meta: Value,
}

impl NewNotification {
  pub fn into_notification(self, id: Uuid, created_at: DateTime<Utc>) -> Notification {
    let (recipient_user_id, recipient_role) = match self.recipient {
      Recipient::User(id) => (Some(id), None),
      Recipient::Role(role) => (None, Some(role)),
    };
    Notification {
      id,
      recipient_user_id,
      recipient_role,
      kind: self.kind,
      title: self.title,
      body: self.body,
      meta: self.meta,
      read_at: None,
      created_at,
    }
  }
}

/// Body of `POST /notifications`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNotification {
  pub recipient_user_id: Option<Uuid>,
  pub recipient_role: Option<String>,
  #[serde(rename = "type")]
  pub kind: String,
  pub title: Option<String>,
  pub body: Option<String>,
  #[serde(default)]
  pub meta: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedNotification {
  pub notification: Notification,
  #[serde(rename = "skippedDuplicate", skip_serializing_if = "std::ops::Not::not")]
  pub skipped_duplicate: bool,
}
