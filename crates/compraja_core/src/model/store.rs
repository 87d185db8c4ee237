//! Store records.

use super::{validate_name, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

pub type StoreId = i64;

/// Shop where prices are observed. `name` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStore {
    pub name: String,
}

impl NewStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("store", &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreUpdate {
    pub name: Option<String>,
}

impl StoreUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => validate_name("store", name),
            None => Ok(()),
        }
    }
}
