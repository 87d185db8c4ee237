//! Shopping list records.

use super::{validate_name, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

pub type ListId = i64;

/// Named shopping list. Owns its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// List plus the number of items it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListWithCount {
    #[serde(flatten)]
    pub list: List,
    pub item_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewList {
    pub name: String,
}

impl NewList {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("list", &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUpdate {
    pub name: Option<String>,
}

impl ListUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => validate_name("list", name),
            None => Ok(()),
        }
    }
}
