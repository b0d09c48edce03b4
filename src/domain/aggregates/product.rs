//! Product Aggregate

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};
use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: Money,
    #[serde(default)]
    pub description: String,
    pub in_stock: bool,
    #[serde(default)]
    pub stock_count: u32,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub image_ref: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Product {
    pub fn from_draft(id: ProductId, draft: ProductDraft) -> Self {
        let in_stock = draft.in_stock.unwrap_or(draft.stock_count > 0);
        Self {
            id, name: draft.name, brand: draft.brand, category: draft.category, price: draft.price,
            description: draft.description, in_stock, stock_count: draft.stock_count,
            rating: draft.rating, review_count: draft.review_count, image_ref: draft.image_ref,
            attributes: draft.attributes,
        }
    }

    /// Replaces every editable field, keeping the id.
    pub fn apply(&mut self, draft: ProductDraft) {
        let id = self.id.clone();
        *self = Self::from_draft(id, draft);
    }

    pub fn is_in_stock(&self) -> bool { self.in_stock }
}

/// Admin-supplied product fields, validated before they reach the catalog
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[validate(length(min = 1, max = 120, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 80, message = "Brand is required"))]
    pub brand: String,
    #[validate(length(min = 1, max = 80, message = "Category is required"))]
    pub category: String,
    #[validate(custom = "validate_price")]
    pub price: Money,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub stock_count: u32,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub image_ref: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ProductDraft {
    /// Surrounding whitespace removed from the text fields, so blank names fail validation.
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(), brand: self.brand.trim().to_string(),
            category: self.category.trim().to_string(), description: self.description.trim().to_string(),
            image_ref: self.image_ref.trim().to_string(), ..self
        }
    }
}

fn validate_price(price: &Money) -> Result<(), ValidationError> {
    if price.is_negative() {
        let mut err = ValidationError::new("negative_price");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    if !price.is_valid_price() {
        let mut err = ValidationError::new("price_too_high");
        err.message = Some(format!("Price cannot exceed {}", Money::MAX_PRICE).into());
        return Err(err);
    }
    Ok(())
}
