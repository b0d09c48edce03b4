//! Pharmacy Storefront
//!
//! Product browsing, cart and wishlist management, checkout and order
//! tracking for an online pharmacy, plus a thin admin panel.
//!
//! ## Features
//! - Deterministic pricing with configurable tax, promotions and shipping
//! - Cart and wishlist stores with their invariants enforced at one boundary
//! - Checkout state machine that only clears the cart after the order is saved
//! - Order lifecycle with forward-only status transitions
//! - Session holder with a local demo mode when no identity provider is configured

use thiserror::Error;

pub mod admin;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod orders;
pub mod pricing;
pub mod storage;

pub use config::{PricingConfig, StorefrontConfig};
pub use domain::{Cart, Money, Order, OrderStatus, Product, Wishlist};

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Authentication error: {0}")]
    Auth(#[from] auth::AuthError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
