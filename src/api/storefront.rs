use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use crate::api::{ApiError, AppState};
use crate::catalog::{Browse, Doctor};
use crate::checkout::{Checkout, CheckoutForm};
use crate::domain::{Cart, CartItem, DeliveryTier, Order, Product, ProductId, Toggle, Wishlist};
use crate::pricing::{self, PriceBreakdown};

#[derive(Debug, Default, Deserialize)]
pub struct PricingParams { pub promo: Option<String>, pub tier: Option<DeliveryTier> }

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub item_count: usize,
    pub unit_count: u32,
    pub pricing: PriceBreakdown,
    pub formatted_total: String,
}

impl CartView {
    fn new(cart: &Cart, params: &PricingParams, state: &AppState) -> Self {
        let config = &state.config.pricing;
        let amounts = pricing::calculate(cart.items(), params.promo.as_deref(), params.tier.unwrap_or_default(), config).rounded();
        Self {
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            unit_count: cart.unit_count(),
            formatted_total: config.currency.format(amounts.total),
            pricing: amounts,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest { pub product_id: ProductId, #[serde(default = "one")] pub quantity: u32 }

fn one() -> u32 { 1 }

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest { pub quantity: u32 }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest { pub product_id: ProductId }

#[derive(Debug, Serialize)]
pub struct ToggleResponse { pub result: Toggle, pub wishlist: Wishlist }

pub async fn list_products(State(s): State<AppState>, Query(browse): Query<Browse>) -> Json<Vec<Product>> {
    Json(s.catalog.read().await.browse(&browse).into_iter().cloned().collect())
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>, ApiError> {
    let id = ProductId::new(id)?;
    s.catalog.read().await.find(&id).cloned().map(Json).ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))
}

pub async fn list_categories(State(s): State<AppState>) -> Json<Vec<String>> {
    Json(s.catalog.read().await.categories().into_iter().map(str::to_string).collect())
}

pub async fn list_doctors(State(s): State<AppState>) -> Json<Vec<Doctor>> { Json(s.catalog.read().await.doctors().to_vec()) }

async fn product(s: &AppState, id: &ProductId) -> Result<Product, ApiError> {
    s.catalog.read().await.find(id).cloned().ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))
}

pub async fn get_cart(State(s): State<AppState>, Path(session): Path<String>, Query(p): Query<PricingParams>) -> Json<CartView> {
    let cart = s.existing_cart(&session).await;
    let cart = cart.lock().await;
    Json(CartView::new(&cart, &p, &s))
}

pub async fn add_to_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddToCartRequest>) -> Result<Json<CartView>, ApiError> {
    let product = product(&s, &r.product_id).await?;
    let handle = s.cart(&session).await;
    let added = {
        let mut cart = handle.lock().await;
        cart.add_item(&product, r.quantity).map(|()| CartView::new(&cart, &PricingParams::default(), &s))
    };
    drop(handle);
    match added {
        Ok(view) => {
            tracing::debug!(%session, product_id = %product.id, quantity = r.quantity, "added to cart");
            Ok(Json(view))
        }
        Err(error) => {
            s.evict_if_empty(&session).await;
            Err(error.into())
        }
    }
}

pub async fn update_cart_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, String)>, Json(r): Json<UpdateQuantityRequest>) -> Result<Json<CartView>, ApiError> {
    let product_id = ProductId::new(product_id)?;
    let cart = s.existing_cart(&session).await;
    let mut cart = cart.lock().await;
    cart.update_quantity(&product_id, r.quantity)?;
    Ok(Json(CartView::new(&cart, &PricingParams::default(), &s)))
}

pub async fn remove_cart_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, String)>) -> Result<Json<CartView>, ApiError> {
    let product_id = ProductId::new(product_id)?;
    let handle = s.existing_cart(&session).await;
    let view = {
        let mut cart = handle.lock().await;
        cart.remove_item(&product_id);
        CartView::new(&cart, &PricingParams::default(), &s)
    };
    drop(handle);
    s.evict_if_empty(&session).await;
    Ok(Json(view))
}

pub async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> StatusCode {
    s.existing_cart(&session).await.lock().await.clear();
    s.evict_if_empty(&session).await;
    tracing::info!(%session, "cart cleared");
    StatusCode::NO_CONTENT
}

pub async fn get_wishlist(State(s): State<AppState>, Path(session): Path<String>) -> Json<Wishlist> {
    Json(s.wishlists.lock().await.get(&session).cloned().unwrap_or_default())
}

pub async fn toggle_wishlist(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<ToggleRequest>) -> Result<Json<ToggleResponse>, ApiError> {
    let product = product(&s, &r.product_id).await?;
    let mut wishlists = s.wishlists.lock().await;
    let wishlist = wishlists.entry(session.clone()).or_default();
    let result = wishlist.toggle(&product);
    let wishlist = wishlist.clone();
    if wishlist.is_empty() { wishlists.remove(&session); }
    Ok(Json(ToggleResponse { result, wishlist }))
}

pub async fn clear_wishlist(State(s): State<AppState>, Path(session): Path<String>) -> StatusCode {
    s.wishlists.lock().await.remove(&session);
    StatusCode::NO_CONTENT
}

fn not_on_wishlist(id: &ProductId) -> ApiError { ApiError::NotFound(format!("product {id} is not on the wishlist")) }

// Lock order is cart, then wishlists. The wishlists lock is never held across an await.
pub async fn move_to_cart(State(s): State<AppState>, Path((session, product_id)): Path<(String, String)>) -> Result<Json<CartView>, ApiError> {
    let product = product(&s, &ProductId::new(product_id)?).await?;
    let listed = s.wishlists.lock().await.get(&session).is_some_and(|w| w.contains(&product.id));
    if !listed { return Err(not_on_wishlist(&product.id)); }

    let handle = s.cart(&session).await;
    let moved = {
        let mut cart = handle.lock().await;
        let mut wishlists = s.wishlists.lock().await;
        let moved = match wishlists.get_mut(&session) {
            Some(wishlist) if wishlist.contains(&product.id) => wishlist.move_to_cart(&product, &mut cart).map_err(ApiError::from),
            _ => Err(not_on_wishlist(&product.id)),
        };
        if wishlists.get(&session).is_some_and(Wishlist::is_empty) { wishlists.remove(&session); }
        moved.map(|()| CartView::new(&cart, &PricingParams::default(), &s))
    };
    drop(handle);
    if moved.is_err() { s.evict_if_empty(&session).await; }
    moved.map(Json)
}

pub async fn checkout(State(s): State<AppState>, Path(session): Path<String>, Json(form): Json<CheckoutForm>) -> Result<(StatusCode, Json<Order>), ApiError> {
    let handle = s.existing_cart(&session).await;
    let placed = {
        let mut cart = handle.lock().await;
        let mut flow = Checkout::new(&s.config.pricing, &s.orders).with_delay(s.config.checkout_delay);
        flow.submit(&mut cart, &form).await
    };
    drop(handle);
    s.evict_if_empty(&session).await;
    Ok((StatusCode::CREATED, Json(placed?)))
}

pub async fn latest_order(State(s): State<AppState>) -> Result<Json<Order>, ApiError> {
    s.orders.latest().await?.map(Json).ok_or_else(|| ApiError::NotFound("no order has been placed yet".into()))
}

pub async fn get_order(State(s): State<AppState>, Path(id): Path<String>) -> Result<Json<Order>, ApiError> {
    s.orders.get(&id).await?.map(Json).ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))
}
