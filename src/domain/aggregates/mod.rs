//! Aggregates module
pub mod product;
pub mod cart;
pub mod wishlist;
pub mod order;

pub use product::{Product, ProductDraft};
pub use cart::{Cart, CartError, CartItem};
pub use wishlist::{Toggle, Wishlist, WishlistItem};
pub use order::{Customer, DeliveryOption, DeliveryTier, Order, OrderDetails, OrderError, OrderLine, OrderStatus, PaymentMethod, ShippingAddress};
