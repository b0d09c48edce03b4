//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{Money, ProductId, Quantity};
use crate::pricing::PricedLine;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartItem>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: Quantity,
    pub image_ref: String,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity.value()) }
}

impl PricedLine for CartItem {
    fn unit_price(&self) -> Money { self.unit_price }
    fn quantity(&self) -> u32 { self.quantity.value() }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn unit_count(&self) -> u32 { self.items.iter().map(|i| i.quantity.value()).sum() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn updated_at(&self) -> Option<DateTime<Utc>> { self.updated_at }
    pub fn get(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Sum of line totals at display precision.
    pub fn subtotal(&self) -> Money { crate::pricing::subtotal(&self.items) }

    /// Adds `quantity` units of `product`, merging into an existing line for the same id.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if !product.is_in_stock() { return Err(CartError::OutOfStock(product.id.clone())); }
        if !product.price.is_valid_price() { return Err(CartError::InvalidPrice(product.id.clone())); }
        let quantity = Quantity::new(quantity).map_err(|_| CartError::InvalidQuantity)?;

        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            existing.quantity = existing.quantity.checked_add(quantity)
                .ok_or_else(|| CartError::QuantityLimit(product.id.clone()))?;
        } else {
            self.items.push(CartItem {
                product_id: product.id.clone(), name: product.name.clone(), unit_price: product.price,
                quantity, image_ref: product.image_ref.clone(),
            });
        }
        self.touch();
        Ok(())
    }

    /// Sets a line's quantity, clamped into `1..=Quantity::MAX`.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| &i.product_id == product_id)
            .ok_or_else(|| CartError::ItemNotFound(product_id.clone()))?;
        item.quantity = Quantity::clamped(quantity);
        self.touch();
        Ok(())
    }

    /// Returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| &i.product_id != product_id);
        let removed = self.items.len() != before;
        if removed { self.touch(); }
        removed
    }

    pub fn clear(&mut self) { self.items.clear(); self.touch(); }

    fn touch(&mut self) { self.updated_at = Some(Utc::now()); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("product {0} is out of stock")]
    OutOfStock(ProductId),
    #[error("product {0} has a price outside the accepted range")]
    InvalidPrice(ProductId),
    #[error("quantity must be between 1 and 999")]
    InvalidQuantity,
    #[error("product {0} would exceed the per-line quantity limit")]
    QuantityLimit(ProductId),
    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),
}
