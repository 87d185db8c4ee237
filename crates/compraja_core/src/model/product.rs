//! Product catalog records.

use super::{validate_name, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

pub type ProductId = i64;

/// Catalog entry, shared by list items and prices.
///
/// `barcode` is unique when present; several products may have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Product plus the cents of its most recently captured price in any store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWithLatestPrice {
    #[serde(flatten)]
    pub product: Product,
    pub latest_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub barcode: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            barcode: None,
            name: name.into(),
            brand: None,
            category: None,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("product", &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub barcode: Option<Option<String>>,
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub brand: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub category: Option<Option<String>>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.barcode.is_none()
            && self.name.is_none()
            && self.brand.is_none()
            && self.category.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => validate_name("product", name),
            None => Ok(()),
        }
    }
}
