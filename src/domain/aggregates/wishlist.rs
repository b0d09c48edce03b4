//! Wishlist Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::cart::{Cart, CartError};
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Wishlist {
    items: Vec<WishlistItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub image_ref: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle { Added, Removed }

impl Wishlist {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[WishlistItem] { &self.items }
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn contains(&self, product_id: &ProductId) -> bool { self.items.iter().any(|i| &i.product_id == product_id) }

    /// Returns false when the product was already saved.
    pub fn add(&mut self, product: &Product) -> bool {
        if self.contains(&product.id) { return false; }
        self.items.push(WishlistItem {
            product_id: product.id.clone(), name: product.name.clone(), unit_price: product.price,
            image_ref: product.image_ref.clone(), added_at: Utc::now(),
        });
        true
    }

    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| &i.product_id != product_id);
        self.items.len() != before
    }

    pub fn toggle(&mut self, product: &Product) -> Toggle {
        if self.remove(&product.id) { Toggle::Removed } else { self.add(product); Toggle::Added }
    }

    pub fn clear(&mut self) { self.items.clear(); }

    /// Adds one unit to the cart and drops the entry; a rejected add keeps it saved.
    pub fn move_to_cart(&mut self, product: &Product, cart: &mut Cart) -> Result<(), CartError> {
        cart.add_item(product, 1)?;
        self.remove(&product.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id).unwrap(), name: id.into(), brand: "Acme".into(), category: "Skin Care".into(),
            price: Money::from_minor(1500), description: String::new(), in_stock: true, stock_count: 4,
            rating: 0.0, review_count: 0, image_ref: String::new(), attributes: Default::default(),
        }
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut w = Wishlist::new();
        assert!(w.add(&product("P1")));
        assert!(!w.add(&product("P1")));
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_toggle() {
        let mut w = Wishlist::new();
        let p = product("P1");
        assert_eq!(w.toggle(&p), Toggle::Added);
        assert!(w.contains(&p.id));
        assert_eq!(w.toggle(&p), Toggle::Removed);
        assert!(w.is_empty());
    }

    #[test]
    fn test_move_to_cart() {
        let mut w = Wishlist::new();
        let mut cart = Cart::new();
        let available = product("P1");
        let sold_out = Product { in_stock: false, stock_count: 0, ..product("P2") };
        w.add(&available);
        w.add(&sold_out);

        w.move_to_cart(&available, &mut cart).unwrap();
        assert!(!w.contains(&available.id));
        assert_eq!(cart.get(&available.id).map(|i| i.quantity.value()), Some(1));

        assert!(matches!(w.move_to_cart(&sold_out, &mut cart), Err(CartError::OutOfStock(_))));
        assert!(w.contains(&sold_out.id));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_clear() {
        let mut w = Wishlist::new();
        w.add(&product("P1"));
        w.add(&product("P2"));
        w.clear();
        assert!(w.is_empty());
    }
}
