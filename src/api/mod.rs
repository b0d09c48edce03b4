//! JSON HTTP surface over the storefront stores

use axum::{routing::{get, post, put}, Json, Router};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use crate::admin::Admin;
use crate::auth::{DocumentStore, IdentityProvider, SessionHolder};
use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::domain::{Cart, Wishlist};
use crate::orders::OrderStore;
use crate::storage::KeyValueStore;
use crate::StorefrontError;

mod admin;
mod auth;
pub mod error;
mod storefront;

pub use error::ApiError;

/// Carts are locked per browsing session so a slow checkout does not block other sessions.
pub type Carts = Mutex<HashMap<String, Arc<Mutex<Cart>>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StorefrontConfig>,
    pub catalog: Arc<RwLock<Catalog>>,
    pub carts: Arc<Carts>,
    pub wishlists: Arc<Mutex<HashMap<String, Wishlist>>>,
    pub orders: OrderStore,
    pub sessions: Arc<SessionHolder>,
    pub admin: Admin,
}

impl AppState {
    /// Loads the catalog and restores any persisted session.
    pub async fn build(config: StorefrontConfig, kv: Arc<dyn KeyValueStore>, documents: Arc<dyn DocumentStore>, provider: Arc<dyn IdentityProvider>) -> Result<Self, StorefrontError> {
        let catalog = Catalog::load(kv.as_ref()).await?;
        let orders = OrderStore::new(kv.clone());
        let sessions = SessionHolder::new(provider, documents.clone(), kv.clone(), config.admin.clone());
        sessions.restore().await?;
        Ok(Self {
            admin: Admin::new(kv, orders.clone(), documents),
            config: Arc::new(config),
            catalog: Arc::new(RwLock::new(catalog)),
            carts: Arc::default(),
            wishlists: Arc::default(),
            orders,
            sessions: Arc::new(sessions),
        })
    }

    /// Cart for `session`, created on first write.
    pub(crate) async fn cart(&self, session: &str) -> Arc<Mutex<Cart>> {
        self.carts.lock().await.entry(session.to_string()).or_default().clone()
    }

    /// The stored cart or a detached empty one; never inserts.
    pub(crate) async fn existing_cart(&self, session: &str) -> Arc<Mutex<Cart>> {
        self.carts.lock().await.get(session).cloned().unwrap_or_default()
    }

    /// Drops the entry for `session` when its cart is empty and no other request holds it.
    pub(crate) async fn evict_if_empty(&self, session: &str) {
        let mut carts = self.carts.lock().await;
        let idle_and_empty = carts.get(session)
            .is_some_and(|cart| Arc::strong_count(cart) == 1 && cart.try_lock().is_ok_and(|c| c.is_empty()));
        if idle_and_empty {
            carts.remove(session);
            tracing::debug!(%session, "evicted empty cart");
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "pharmacy-storefront"})) }))
        .route("/api/v1/products", get(storefront::list_products))
        .route("/api/v1/products/:id", get(storefront::get_product))
        .route("/api/v1/categories", get(storefront::list_categories))
        .route("/api/v1/doctors", get(storefront::list_doctors))
        .route("/api/v1/cart/:session", get(storefront::get_cart).post(storefront::add_to_cart).delete(storefront::clear_cart))
        .route("/api/v1/cart/:session/items/:product_id", put(storefront::update_cart_item).delete(storefront::remove_cart_item))
        .route("/api/v1/wishlist/:session", get(storefront::get_wishlist).delete(storefront::clear_wishlist))
        .route("/api/v1/wishlist/:session/toggle", post(storefront::toggle_wishlist))
        .route("/api/v1/wishlist/:session/items/:product_id/move-to-cart", post(storefront::move_to_cart))
        .route("/api/v1/checkout/:session", post(storefront::checkout))
        .route("/api/v1/orders/latest", get(storefront::latest_order))
        .route("/api/v1/orders/:id", get(storefront::get_order))
        .route("/api/v1/auth/session", get(auth::current_session))
        .route("/api/v1/auth/sign-in", post(auth::sign_in))
        .route("/api/v1/auth/oauth", post(auth::sign_in_with_oauth))
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/password-reset", post(auth::password_reset))
        .route("/api/v1/auth/sign-out", post(auth::sign_out))
        .route("/api/v1/auth/admin", post(auth::sign_in_admin))
        .route("/api/v1/admin/products", get(admin::list_products).post(admin::create_product))
        .route("/api/v1/admin/products/:id", put(admin::update_product).delete(admin::delete_product))
        .route("/api/v1/admin/orders", get(admin::list_orders))
        .route("/api/v1/admin/orders/:id/status", put(admin::update_order_status))
        .route("/api/v1/admin/orders/:id/cancel", post(admin::cancel_order))
        .route("/api/v1/admin/users", get(admin::list_users))
        .with_state(state)
}
