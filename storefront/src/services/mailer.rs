// storefront/src/services/mailer.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::Order;
use async_trait::async_trait;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmailInfo {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub message_id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send_order_confirmation(&self, order: &Order) -> AppResult<SentEmailInfo>;
}

/// Mail transport is external; this one records the message in the log.
pub struct LogMailer {
  sender: String,
}

impl LogMailer {
  pub fn new(sender: impl Into<String>) -> Self {
    Self { sender: sender.into() }
  }
}

pub fn confirmation_subject(order: &Order) -> String {
  format!("Your Iduka order {} is confirmed", order.order_number)
}

#[async_trait]
impl Mailer for LogMailer {
  async fn send_order_confirmation(&self, order: &Order) -> AppResult<SentEmailInfo> {
    let subject = confirmation_subject(order);
    if order.customer_email.trim().is_empty() {
      warn!(order_number = %order.order_number, "No recipient address for confirmation email.");
      return Err(AppError::Internal(format!("order {} has no email", order.order_number)));
    }
    let message_id = format!("log_mail_{}", uuid::Uuid::new_v4());
    info!(
      to = %order.customer_email,
      from = %self.sender,
      subject = %subject,
      total = order.total,
      %message_id,
      "Order confirmation email sent."
    );
    Ok(SentEmailInfo {
      to: order.customer_email.clone(),
      from: self.sender.clone(),
      subject,
      message_id,
    })
  }
}
