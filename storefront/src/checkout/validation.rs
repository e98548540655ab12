// storefront/src/checkout/validation.rs

use crate::checkout::contexts::CheckoutForm;
use crate::models::{cart_total, CartLine};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

// `[0-9]`, not `\d`: the latter also matches non-ASCII digits.
static RWANDA_MOBILE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(\+250[0-9]{9}|07[0-9]{8})$").expect("phone pattern is a valid regex"));

pub const MAX_LINE_QUANTITY: i64 = 999;
pub const MAX_UNIT_PRICE: i64 = 10_000_000;

/// Field name to message, in the order the fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// The message shown to the shopper.
  pub fn first(&self) -> Option<&str> {
    self.0.first().map(|(_, message)| message.as_str())
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.0.iter().find(|(f, _)| *f == field).map(|(_, m)| m.as_str())
  }

  pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.0.iter().map(|(f, _)| *f)
  }

  fn push(&mut self, field: &'static str, message: impl Into<String>) {
    self.0.push((field, message.into()));
  }
}

impl Serialize for FieldErrors {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for (field, message) in &self.0 {
      map.serialize_entry(field, message)?;
    }
    map.end()
  }
}

/// Matches the trimmed input as typed; inner spaces are not accepted.
pub fn is_valid_phone(raw: &str) -> bool {
  RWANDA_MOBILE.is_match(raw.trim())
}

fn line_is_valid(line: &CartLine) -> bool {
  (1..=MAX_LINE_QUANTITY).contains(&line.quantity) && (0..=MAX_UNIT_PRICE).contains(&line.unit_price)
}

pub fn validate(form: &CheckoutForm) -> FieldErrors {
  let mut errors = FieldErrors::default();

  if form.cart.is_empty() {
    errors.push("cart", "Your cart is empty.");
  } else if !form.cart.iter().all(line_is_valid) || cart_total(&form.cart).is_none() {
    errors.push("cart", "Your cart contains an item with an invalid quantity or price.");
  }

  if form.customer_name.trim().is_empty() {
    errors.push("customer_name", "Please enter your name.");
  }

  if form.phone.trim().is_empty() {
    errors.push("phone", "Please enter a phone number.");
  } else if !is_valid_phone(&form.phone) {
    errors.push("phone", "Enter a Rwandan mobile number such as +250788123456 or 0788123456.");
  }

  if form.address.trim().is_empty() {
    errors.push("address", "Please enter a delivery address.");
  }
  if form.city.trim().is_empty() {
    errors.push("city", "Please enter a city.");
  }

  errors
}
