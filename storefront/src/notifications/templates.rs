// storefront/src/notifications/templates.rs

use crate::models::Recipient;
use crate::notifications::events::{NotificationEvent, OrderContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
  Admin,
  Customer,
  Rider,
}

impl Audience {
  pub fn of(recipient: &Recipient) -> Self {
    match recipient {
      Recipient::Role(role) if role.eq_ignore_ascii_case("admin") => Audience::Admin,
      Recipient::Role(role) if role.eq_ignore_ascii_case("rider") => Audience::Rider,
      _ => Audience::Customer,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
  pub title: String,
  pub body: String,
}

/// `RWF 12,500`
pub fn format_rwf(amount: i64) -> String {
  let digits = amount.unsigned_abs().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }
  let sign = if amount < 0 { "-" } else { "" };
  format!("RWF {sign}{grouped}")
}

fn label(order: &OrderContext) -> String {
  order.label().unwrap_or_else(|| "your order".to_string())
}

fn admin_label(order: &OrderContext) -> String {
  order.label().unwrap_or_else(|| "an order".to_string())
}

/// Items, total and address, one per line.
fn order_details(order: &OrderContext) -> String {
  let mut lines = Vec::new();
  if !order.items.is_empty() {
    lines.push("Items:".to_string());
    for item in &order.items {
      lines.push(format!(
        "- {} x{} @ {}",
        item.name,
        item.quantity,
        format_rwf(item.price)
      ));
    }
  }
  if let Some(total) = order.total() {
    lines.push(format!("Total: {}", format_rwf(total)));
  }
  if let Some(address) = &order.delivery_address {
    lines.push(format!("Deliver to: {address}"));
  }
  lines.join("\n")
}

fn verbose(headline: String, order: &OrderContext) -> String {
  let details = order_details(order);
  if details.is_empty() {
    headline
  } else {
    format!("{headline}\n\n{details}")
  }
}

fn terse_total(order: &OrderContext) -> String {
  order.total().map(|t| format!(" ({})", format_rwf(t))).unwrap_or_default()
}

fn rendered(title: impl Into<String>, body: impl Into<String>) -> RenderedNotification {
  RenderedNotification {
    title: title.into(),
    body: body.into(),
  }
}

pub fn render(event: &NotificationEvent, audience: Audience) -> RenderedNotification {
  use NotificationEvent as E;

  match (event, audience) {
    (E::OrderStatusChange(e), Audience::Admin) => rendered(
      "Order status updated",
      format!("{} is now {}.", admin_label(&e.order), e.status),
    ),
    (E::OrderStatusChange(e), _) => {
      let headline = match &e.previous_status {
        Some(prev) => format!("{} moved from {} to {}.", label(&e.order), prev, e.status),
        None => format!("{} is now {}.", label(&e.order), e.status),
      };
      rendered("Order update", verbose(headline, &e.order))
    }

    (E::AssignmentCreated(e), Audience::Admin) => rendered(
      "Rider assigned",
      format!(
        "{} assigned to {}.",
        admin_label(&e.order),
        e.rider_name.as_deref().unwrap_or("a rider")
      ),
    ),
    (E::AssignmentCreated(e), _) | (E::OrderAssigned(e), _) if audience == Audience::Rider => rendered(
      "New delivery assigned",
      verbose(format!("You have been assigned {}. Please accept or decline.", label(&e.order)), &e.order),
    ),
    (E::AssignmentCreated(e), _) | (E::OrderAssigned(e), Audience::Customer) => rendered(
      "Your order is on its way",
      verbose(
        format!(
          "{} has been handed to {}.",
          label(&e.order),
          e.rider_name.as_deref().unwrap_or("our rider")
        ),
        &e.order,
      ),
    ),
    (E::OrderAssigned(e), _) => rendered(
      "Order assigned",
      format!(
        "{} assigned to {}.",
        admin_label(&e.order),
        e.rider_name.as_deref().unwrap_or("a rider")
      ),
    ),

    (E::AssignmentAccepted(e), Audience::Admin) => rendered(
      "Assignment accepted",
      format!(
        "{} accepted {}.",
        e.rider_name.as_deref().unwrap_or("Rider"),
        admin_label(&e.order)
      ),
    ),
    (E::AssignmentAccepted(e), _) => rendered(
      "Delivery accepted",
      verbose(
        format!(
          "{} accepted the delivery of {}.",
          e.rider_name.as_deref().unwrap_or("Your rider"),
          label(&e.order)
        ),
        &e.order,
      ),
    ),

    (E::AssignmentRejected(e), Audience::Admin) => rendered(
      "Assignment rejected",
      format!(
        "{} declined {}{}.",
        e.rider_name.as_deref().unwrap_or("Rider"),
        admin_label(&e.order),
        e.reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
      ),
    ),
    (E::AssignmentRejected(e), _) => rendered(
      "Delivery reassignment",
      verbose(
        format!("We are finding a new rider for {}.", label(&e.order)),
        &e.order,
      ),
    ),

    (E::OrderCreated(e), Audience::Admin) => rendered(
      "New order",
      format!(
        "{} placed {}{}.",
        e.customer_name.as_deref().unwrap_or("A customer"),
        admin_label(&e.order),
        terse_total(&e.order)
      ),
    ),
    (E::OrderCreated(e), _) => rendered(
      "Order received",
      verbose(format!("Thank you! We received {}.", label(&e.order)), &e.order),
    ),

    (E::OrderDelivered(order), Audience::Admin) => {
      rendered("Order delivered", format!("{} was delivered.", admin_label(order)))
    }
    (E::OrderDelivered(order), _) => rendered(
      "Order delivered",
      verbose(
        format!(
          "{} has been delivered. You can request a refund within 24 hours if something is wrong.",
          label(order)
        ),
        order,
      ),
    ),

    (E::RefundRequested(e), Audience::Admin) => rendered(
      "Refund requested",
      format!(
        "Refund requested for {}{}{}.",
        admin_label(&e.order),
        terse_total(&e.order),
        e.reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
      ),
    ),
    (E::RefundRequested(e), _) => rendered(
      "Refund request received",
      verbose(
        format!("We received your refund request for {}. We will review it shortly.", label(&e.order)),
        &e.order,
      ),
    ),

    (E::RefundApproved(e), Audience::Admin) => rendered(
      "Refund approved",
      format!("Refund approved for {}.", admin_label(&e.order)),
    ),
    (E::RefundApproved(e), _) => {
      let amount = e.amount.or_else(|| e.order.total());
      let headline = match amount {
        Some(amount) => format!("Your refund of {} for {} was approved.", format_rwf(amount), label(&e.order)),
        None => format!("Your refund for {} was approved.", label(&e.order)),
      };
      rendered("Refund approved", verbose(headline, &e.order))
    }

    (E::Promotion(p), _) => {
      let body = match &p.code {
        Some(code) => format!("{}\nUse code {} at checkout.", p.message, code),
        None => p.message.clone(),
      };
      rendered(p.headline.clone().unwrap_or_else(|| "Special offer".to_string()), body)
    }

    (E::System(s), _) => rendered("System notice", s.message.clone()),

    (E::Other { order, .. }, Audience::Admin) => rendered(
      "Notification",
      match order.label() {
        Some(l) => format!("Update on {}{}.", l, terse_total(order)),
        None => "You have a new notification.".to_string(),
      },
    ),
    (E::Other { order, .. }, _) => rendered(
      "Notification",
      match order.label() {
        Some(l) => verbose(format!("There is an update on {l}."), order),
        None => verbose("You have a new notification.".to_string(), order),
      },
    ),
  }
}
