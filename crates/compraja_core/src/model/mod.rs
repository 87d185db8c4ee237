//! Domain model for lists, items, products, stores and prices.
//!
//! # Responsibility
//! - Define persisted records, creation payloads and partial update payloads.
//! - Validate write payloads before they reach SQL.
//!
//! # Invariants
//! - Update payloads distinguish "absent" (`None`) from "set" (`Some`); for
//!   nullable columns `Some(None)` clears the value.
//! - In JSON, an absent key is `None` and an explicit `null` on a nullable
//!   column is `Some(None)`.
//! - Timestamps are Unix epoch milliseconds assigned by storage.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod list;
pub mod list_item;
pub mod price;
pub mod product;
pub mod store;

/// Epoch milliseconds written by SQLite.
pub type Timestamp = i64;

/// Write-side validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required name is empty or whitespace only.
    EmptyName { entity: &'static str },
    /// Quantity is negative or not a finite number.
    InvalidQuantity(f64),
    NegativePrice(i64),
    /// Currency is not a three-letter upper-case code.
    InvalidCurrency(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName { entity } => write!(f, "{entity} name must not be empty"),
            Self::InvalidQuantity(qty) => {
                write!(f, "quantity must be a finite number >= 0, got {qty}")
            }
            Self::NegativePrice(cents) => write!(f, "price must be >= 0 cents, got {cents}"),
            Self::InvalidCurrency(code) => {
                write!(f, "currency must be a three-letter ISO code, got `{code}`")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn validate_name(entity: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName { entity });
    }
    Ok(())
}
