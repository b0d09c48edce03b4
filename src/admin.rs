//! Admin panel operations
//!
//! Predicate searches over products, orders and user profiles, order status
//! management and product CRUD. Product changes are written back to
//! `admin-products` as the full list before the in-memory catalog is swapped.

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;
use crate::auth::documents::{self, DocumentStore, UserProfile};
use crate::catalog::Catalog;
use crate::checkout::{field_errors, FieldErrors};
use crate::domain::{DomainEvent, Order, OrderStatus, Product, ProductDraft, ProductEvent, ProductId};
use crate::orders::{OrderStore, OrderStoreError};
use crate::storage::{self, keys, KeyValueStore, StorageError};

fn needle(query: &Option<String>) -> Option<String> {
    query.as_deref().map(str::trim).filter(|q| !q.is_empty()).map(str::to_lowercase)
}

fn contains(haystack: &str, needle: &str) -> bool { haystack.to_lowercase().contains(needle) }

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductSearch {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    pub category: Option<String>,
}

impl ProductSearch {
    pub fn matches(&self, p: &Product) -> bool {
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if p.category != category { return false; }
        }
        needle(&self.query).map_or(true, |q| contains(&p.name, &q) || contains(&p.brand, &q))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderSearch {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderSearch {
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|s| s != order.status()) { return false; }
        needle(&self.query).map_or(true, |q| {
            let customer = order.customer();
            contains(order.id(), &q) || contains(&customer.email, &q) || contains(&customer.name, &q)
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserSearch {
    #[serde(default, alias = "q")]
    pub query: Option<String>,
}

impl UserSearch {
    pub fn matches(&self, user: &UserProfile) -> bool {
        needle(&self.query).map_or(true, |q| contains(&user.name, &q) || contains(&user.email, &q))
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("product form has invalid fields")]
    Validation(FieldErrors),
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
    #[error(transparent)]
    Orders(#[from] OrderStoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct Admin {
    kv: Arc<dyn KeyValueStore>,
    orders: OrderStore,
    documents: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Admin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("Admin").finish_non_exhaustive() }
}

impl Admin {
    pub fn new(kv: Arc<dyn KeyValueStore>, orders: OrderStore, documents: Arc<dyn DocumentStore>) -> Self {
        Self { kv, orders, documents }
    }

    pub fn products<'a>(&self, catalog: &'a Catalog, search: &ProductSearch) -> Vec<&'a Product> {
        catalog.products().iter().filter(|p| search.matches(p)).collect()
    }

    pub async fn create_product(&self, catalog: &mut Catalog, draft: ProductDraft) -> Result<Product, AdminError> {
        let draft = check(draft)?;
        let id = ProductId::new(format!("p-{}", Uuid::new_v4().simple()))
            .map_err(|e| AdminError::Validation(FieldErrors::from([("id".to_string(), vec![e.to_string()])])))?;
        let product = Product::from_draft(id, draft);
        let mut next = catalog.products().to_vec();
        next.push(product.clone());
        self.commit(catalog, next).await?;
        DomainEvent::Product(ProductEvent::Created { product_id: product.id.clone() }).log();
        Ok(product)
    }

    pub async fn update_product(&self, catalog: &mut Catalog, id: &ProductId, draft: ProductDraft) -> Result<Product, AdminError> {
        let draft = check(draft)?;
        let mut next = catalog.products().to_vec();
        let product = next.iter_mut().find(|p| &p.id == id).ok_or_else(|| AdminError::ProductNotFound(id.clone()))?;
        product.apply(draft);
        let updated = product.clone();
        self.commit(catalog, next).await?;
        DomainEvent::Product(ProductEvent::Updated { product_id: id.clone() }).log();
        Ok(updated)
    }

    pub async fn delete_product(&self, catalog: &mut Catalog, id: &ProductId) -> Result<(), AdminError> {
        let mut next = catalog.products().to_vec();
        let before = next.len();
        next.retain(|p| &p.id != id);
        if next.len() == before { return Err(AdminError::ProductNotFound(id.clone())); }
        self.commit(catalog, next).await?;
        DomainEvent::Product(ProductEvent::Deleted { product_id: id.clone() }).log();
        Ok(())
    }

    pub async fn orders(&self, search: &OrderSearch) -> Result<Vec<Order>, AdminError> {
        Ok(self.orders.list().await?.into_iter().filter(|o| search.matches(o)).collect())
    }

    pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<Order, AdminError> {
        Ok(self.orders.update_status(id, status).await?)
    }

    pub async fn cancel_order(&self, id: &str) -> Result<Order, AdminError> { Ok(self.orders.cancel(id).await?) }

    pub async fn users(&self, search: &UserSearch) -> Result<Vec<UserProfile>, AdminError> {
        let mut users: Vec<UserProfile> = documents::user_profiles(self.documents.as_ref()).await?
            .into_iter().filter(|u| search.matches(u)).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn commit(&self, catalog: &mut Catalog, products: Vec<Product>) -> Result<(), StorageError> {
        storage::write_json(self.kv.as_ref(), keys::ADMIN_PRODUCTS, &products).await?;
        *catalog.products_mut() = products;
        Ok(())
    }
}

fn check(draft: ProductDraft) -> Result<ProductDraft, AdminError> {
    let draft = draft.trimmed();
    draft.validate().map_err(|e| AdminError::Validation(field_errors(&e)))?;
    Ok(draft)
}
