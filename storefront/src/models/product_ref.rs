// storefront/src/models/product_ref.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

const UUID_LEN: usize = 36;

/// Structured cart identifier: the product plus an optional variation key.
///
/// Accepts the structured form `{"product_id": "...", "variation_id": "red-large"}`
/// and the older composite string `"<uuid>"` / `"<uuid>-<variationKey>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawProductRef")]
pub struct ProductRef {
  pub product_id: Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variation_id: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProductRefError {
  #[error("product id '{0}' does not start with a UUID")]
  NotAUuid(String),
  #[error("product id '{0}' has an empty or unseparated variation key")]
  BadVariation(String),
}

impl ProductRef {
  pub fn new(product_id: Uuid, variation_id: Option<String>) -> Self {
    Self {
      product_id,
      variation_id: variation_id.filter(|v| !v.is_empty()),
    }
  }

  /// Parses the composite `"<uuid>[-<variationKey>]"` form.
  pub fn parse_composite(raw: &str) -> Result<Self, ProductRefError> {
    let raw = raw.trim();
    let head = raw.get(..UUID_LEN).ok_or_else(|| ProductRefError::NotAUuid(raw.to_string()))?;
    let product_id = Uuid::parse_str(head).map_err(|_| ProductRefError::NotAUuid(raw.to_string()))?;

    let rest = &raw[UUID_LEN..];
    if rest.is_empty() {
      return Ok(Self::new(product_id, None));
    }
    match rest.strip_prefix('-') {
      Some(variation) if !variation.is_empty() => Ok(Self::new(product_id, Some(variation.to_string()))),
      _ => Err(ProductRefError::BadVariation(raw.to_string())),
    }
  }
}

impl FromStr for ProductRef {
  type Err = ProductRefError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse_composite(s)
  }
}

impl fmt::Display for ProductRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.variation_id {
      Some(variation) => write!(f, "{}-{}", self.product_id, variation),
      None => write!(f, "{}", self.product_id),
    }
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProductRef {
  Structured {
    product_id: Uuid,
    #[serde(default)]
    variation_id: Option<String>,
  },
  Composite(String),
}

impl TryFrom<RawProductRef> for ProductRef {
  type Error = ProductRefError;

  fn try_from(raw: RawProductRef) -> Result<Self, Self::Error> {
    match raw {
      RawProductRef::Structured {
        product_id,
        variation_id,
      } => Ok(ProductRef::new(product_id, variation_id)),
      RawProductRef::Composite(s) => ProductRef::parse_composite(&s),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const ID: &str = "0b8f5a52-3c1e-4d7a-9a51-6f2b8c9d0e11";

  #[test]
  fn composite_with_variation_keeps_the_uuid_prefix() {
    let parsed = ProductRef::parse_composite(&format!("{ID}-red-large")).unwrap();
    assert_eq!(parsed.product_id.to_string(), ID);
    assert_eq!(parsed.variation_id.as_deref(), Some("red-large"));
  }

  #[test]
  fn bare_uuid_has_no_variation() {
    let parsed: ProductRef = ID.parse().unwrap();
    assert_eq!(parsed.variation_id, None);
    assert_eq!(parsed.to_string(), ID);
  }

  #[test]
  fn rejects_garbage_and_dangling_separator() {
    assert!(matches!(ProductRef::parse_composite("sku-42"), Err(ProductRefError::NotAUuid(_))));
    assert!(matches!(
      ProductRef::parse_composite(&format!("{ID}-")),
      Err(ProductRefError::BadVariation(_))
    ));
    assert!(matches!(
      ProductRef::parse_composite(&format!("{ID}x")),
      Err(ProductRefError::BadVariation(_))
    ));
  }

  #[test]
  fn deserializes_both_wire_forms() {
    let legacy: ProductRef = serde_json::from_str(&format!("\"{ID}-blue\"")).unwrap();
    let structured: ProductRef =
      serde_json::from_str(&format!(r#"{{"product_id":"{ID}","variation_id":"blue"}}"#)).unwrap();
    assert_eq!(legacy, structured);
  }
}
