use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, Json};
use serde::Deserialize;
use crate::admin::{OrderSearch, ProductSearch, UserSearch};
use crate::api::{auth::bearer, ApiError, AppState};
use crate::auth::UserProfile;
use crate::domain::{Order, OrderStatus, Product, ProductDraft, ProductId};

#[derive(Debug, Deserialize)]
pub struct StatusRequest { pub status: OrderStatus }

async fn require_admin(s: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    s.sessions.require_admin(bearer(headers)).await?;
    Ok(())
}

pub async fn list_products(State(s): State<AppState>, headers: HeaderMap, Query(q): Query<ProductSearch>) -> Result<Json<Vec<Product>>, ApiError> {
    require_admin(&s, &headers).await?;
    let catalog = s.catalog.read().await;
    Ok(Json(s.admin.products(&catalog, &q).into_iter().cloned().collect()))
}

pub async fn create_product(State(s): State<AppState>, headers: HeaderMap, Json(draft): Json<ProductDraft>) -> Result<(StatusCode, Json<Product>), ApiError> {
    require_admin(&s, &headers).await?;
    let mut catalog = s.catalog.write().await;
    Ok((StatusCode::CREATED, Json(s.admin.create_product(&mut catalog, draft).await?)))
}

pub async fn update_product(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>, Json(draft): Json<ProductDraft>) -> Result<Json<Product>, ApiError> {
    require_admin(&s, &headers).await?;
    let id = ProductId::new(id)?;
    let mut catalog = s.catalog.write().await;
    Ok(Json(s.admin.update_product(&mut catalog, &id, draft).await?))
}

pub async fn delete_product(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    require_admin(&s, &headers).await?;
    let id = ProductId::new(id)?;
    let mut catalog = s.catalog.write().await;
    s.admin.delete_product(&mut catalog, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_orders(State(s): State<AppState>, headers: HeaderMap, Query(q): Query<OrderSearch>) -> Result<Json<Vec<Order>>, ApiError> {
    require_admin(&s, &headers).await?;
    Ok(Json(s.admin.orders(&q).await?))
}

pub async fn update_order_status(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>, Json(r): Json<StatusRequest>) -> Result<Json<Order>, ApiError> {
    require_admin(&s, &headers).await?;
    Ok(Json(s.admin.update_order_status(&id, r.status).await?))
}

pub async fn cancel_order(State(s): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<Json<Order>, ApiError> {
    require_admin(&s, &headers).await?;
    Ok(Json(s.admin.cancel_order(&id).await?))
}

pub async fn list_users(State(s): State<AppState>, headers: HeaderMap, Query(q): Query<UserSearch>) -> Result<Json<Vec<UserProfile>>, ApiError> {
    require_admin(&s, &headers).await?;
    Ok(Json(s.admin.users(&q).await?))
}
