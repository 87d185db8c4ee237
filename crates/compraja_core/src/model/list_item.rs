//! List item records.
//!
//! # Invariants
//! - `list_id` always points to an existing list (cascade on list delete).
//! - `product_id` is nulled when the referenced product is deleted.
//! - `qty` is finite and non-negative.

use super::list::ListId;
use super::product::ProductId;
use super::{Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

pub type ListItemId = i64;

pub const DEFAULT_QTY: f64 = 1.0;

/// One line of a shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: ListItemId,
    pub list_id: ListId,
    pub product_id: Option<ProductId>,
    pub qty: f64,
    pub note: Option<String>,
    pub checked: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// List item annotated with its product for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItemWithProduct {
    #[serde(flatten)]
    pub item: ListItem,
    pub product_name: Option<String>,
    pub product_barcode: Option<String>,
}

/// Creation payload. `qty` defaults to 1 and `checked` to false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListItem {
    pub list_id: ListId,
    pub product_id: Option<ProductId>,
    pub qty: Option<f64>,
    pub note: Option<String>,
    pub checked: Option<bool>,
}

impl NewListItem {
    pub fn new(list_id: ListId) -> Self {
        Self {
            list_id,
            product_id: None,
            qty: None,
            note: None,
            checked: None,
        }
    }

    pub fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_qty(mut self, qty: f64) -> Self {
        self.qty = Some(qty);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.qty {
            Some(qty) => validate_qty(qty),
            None => Ok(()),
        }
    }
}

/// Partial update. Only populated fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItemUpdate {
    pub qty: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub note: Option<Option<String>>,
    pub checked: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub product_id: Option<Option<ProductId>>,
}

impl ListItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.qty.is_none()
            && self.note.is_none()
            && self.checked.is_none()
            && self.product_id.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.qty {
            Some(qty) => validate_qty(qty),
            None => Ok(()),
        }
    }
}

fn validate_qty(qty: f64) -> Result<(), ValidationError> {
    if !qty.is_finite() || qty < 0.0 {
        return Err(ValidationError::InvalidQuantity(qty));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ListItemUpdate, NewListItem};

    #[test]
    fn negative_or_nan_quantity_is_rejected() {
        assert!(NewListItem::new(1).with_qty(-1.0).validate().is_err());
        assert!(NewListItem::new(1).with_qty(f64::NAN).validate().is_err());
        assert!(NewListItem::new(1).with_qty(0.0).validate().is_ok());
        assert!(NewListItem::new(1).validate().is_ok());
    }

    #[test]
    fn clearing_note_counts_as_populated() {
        let update = ListItemUpdate {
            note: Some(None),
            ..ListItemUpdate::default()
        };
        assert!(!update.is_empty());
        assert!(ListItemUpdate::default().is_empty());
    }
}
