//! Price observations.
//!
//! # Invariants
//! - A price belongs to one product and one store; both cascade on delete.
//! - `captured_at` ordering defines the latest price of a product/store pair.
//! - Updates never touch `created_at` or `captured_at`.

use super::product::ProductId;
use super::store::StoreId;
use super::{Timestamp, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub type PriceId = i64;

pub const DEFAULT_CURRENCY: &str = "EUR";

static CURRENCY_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid currency regex"));

/// Price of one product at one store, as captured at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: PriceId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub price_cents: i64,
    pub currency: String,
    pub captured_at: Timestamp,
    pub photo_uri: Option<String>,
    pub created_at: Timestamp,
}

/// Price annotated with product and store names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceWithDetails {
    #[serde(flatten)]
    pub price: Price,
    pub product_name: String,
    pub store_name: String,
}

/// Optional filters for [`PriceWithDetails`] queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceDetailsFilter {
    pub product_id: Option<ProductId>,
    pub store_id: Option<StoreId>,
}

/// Creation payload. `currency` defaults to [`DEFAULT_CURRENCY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrice {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub price_cents: i64,
    pub currency: Option<String>,
    pub photo_uri: Option<String>,
}

impl NewPrice {
    pub fn new(product_id: ProductId, store_id: StoreId, price_cents: i64) -> Self {
        Self {
            product_id,
            store_id,
            price_cents,
            currency: None,
            photo_uri: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_photo(mut self, photo_uri: impl Into<String>) -> Self {
        self.photo_uri = Some(photo_uri.into());
        self
    }

    pub fn currency_or_default(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_cents(self.price_cents)?;
        validate_currency(self.currency_or_default())
    }
}

/// Partial update. Unlike other entities, applying it refreshes no timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub photo_uri: Option<Option<String>>,
}

impl PriceUpdate {
    pub fn is_empty(&self) -> bool {
        self.price_cents.is_none() && self.currency.is_none() && self.photo_uri.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(cents) = self.price_cents {
            validate_cents(cents)?;
        }
        if let Some(currency) = &self.currency {
            validate_currency(currency)?;
        }
        Ok(())
    }
}

fn validate_cents(cents: i64) -> Result<(), ValidationError> {
    if cents < 0 {
        return Err(ValidationError::NegativePrice(cents));
    }
    Ok(())
}

fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if !CURRENCY_CODE_RE.is_match(code) {
        return Err(ValidationError::InvalidCurrency(code.to_string()));
    }
    Ok(())
}
