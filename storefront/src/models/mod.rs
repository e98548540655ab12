// storefront/src/models/mod.rs

pub mod notification;
pub mod order;
pub mod order_item;
pub mod product_ref;

pub use notification::{CreateNotification, CreatedNotification, NewNotification, Notification, Recipient};
pub use order::{
  Actor, NewOrder, Order, OrderAction, OrderStatus, OrderWithItems, PaymentMethod, RefundStatus, Role,
};
pub use order_item::{cart_total, CartLine, NewOrderItem, OrderLineItem};
pub use product_ref::{ProductRef, ProductRefError};
