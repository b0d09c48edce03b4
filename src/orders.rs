//! Order store
//!
//! Each order lives under `order-<id>`; the most recently placed one is also
//! written to `latest-order` for the confirmation page.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use crate::domain::{Order, OrderError, OrderStatus};
use crate::storage::{self, keys, KeyValueStore, StorageError};

#[derive(Clone)]
pub struct OrderStore {
    kv: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("OrderStore").finish_non_exhaustive() }
}

impl OrderStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self { Self { kv } }

    /// Persists a newly placed order and drains its events.
    pub async fn create(&self, order: &mut Order) -> Result<(), StorageError> {
        let key = keys::order(order.id());
        storage::write_json(self.kv.as_ref(), &key, order).await?;
        if let Err(error) = storage::write_json(self.kv.as_ref(), keys::LATEST_ORDER, order).await {
            if let Err(cleanup) = self.kv.remove(&key).await {
                tracing::warn!(%key, error = %cleanup, "could not roll back partially written order");
            }
            return Err(error);
        }
        order.take_events().iter().for_each(|e| e.log());
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Order>, StorageError> {
        Ok(storage::read_json::<Order>(self.kv.as_ref(), &keys::order(id)).await?.and_then(checked))
    }

    pub async fn latest(&self) -> Result<Option<Order>, StorageError> {
        Ok(storage::read_json::<Order>(self.kv.as_ref(), keys::LATEST_ORDER).await?.and_then(checked))
    }

    /// All readable orders, newest first.
    pub async fn list(&self) -> Result<Vec<Order>, StorageError> {
        let mut orders: Vec<Order> = storage::read_all_json::<Order>(self.kv.as_ref(), keys::ORDER_PREFIX).await?
            .into_iter().filter_map(checked).collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    pub async fn update_status(&self, id: &str, status: OrderStatus) -> Result<Order, OrderStoreError> {
        let mut order = self.get(id).await?.ok_or_else(|| OrderStoreError::NotFound(id.to_string()))?;
        order.update_status(status, Utc::now())?;
        self.save(&mut order).await?;
        Ok(order)
    }

    pub async fn cancel(&self, id: &str) -> Result<Order, OrderStoreError> { self.update_status(id, OrderStatus::Cancelled).await }

    async fn save(&self, order: &mut Order) -> Result<(), StorageError> {
        storage::write_json(self.kv.as_ref(), &keys::order(order.id()), order).await?;
        if self.latest().await?.is_some_and(|latest| latest.id() == order.id()) {
            storage::write_json(self.kv.as_ref(), keys::LATEST_ORDER, order).await?;
        }
        order.take_events().iter().for_each(|e| e.log());
        Ok(())
    }
}

fn checked(order: Order) -> Option<Order> {
    match order.verify() {
        Ok(()) => Some(order),
        Err(error) => {
            tracing::warn!(order_id = order.id(), %error, "skipping inconsistent order record");
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("order {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use crate::domain::*;
    use crate::pricing::PriceBreakdown;
    use crate::storage::MemoryStore;

    pub(crate) fn sample_order(id: &str, at: DateTime<Utc>) -> Order {
        let line = OrderLine { product_id: ProductId::new("p-001").unwrap(), name: "Paracetamol 500mg".into(), unit_price: Money::from_minor(1299), quantity: 2 };
        let details = OrderDetails {
            customer: Customer { name: "Grace Hopper".into(), email: "grace@example.com".into(), phone: "+15550123".into() },
            shipping_address: ShippingAddress { street: "9 Navy Way".into(), city: "Arlington".into(), region: "VA".into(), postal_code: "22201".into() },
            delivery: DeliveryOption { tier: DeliveryTier::Express, fee: Money::from_minor(999), eta_days: 2 },
            payment_method: PaymentMethod::Card,
            promo_code: None,
        };
        let pricing = PriceBreakdown { subtotal: Money::from_minor(2598), discount: Money::ZERO, tax: Money::new("2.0784".parse().unwrap()), shipping_fee: Money::from_minor(999), total: Money::from_minor(3805) };
        Order::place(id, vec![line], details, pricing, at).unwrap()
    }

    fn store() -> (Arc<MemoryStore>, OrderStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), OrderStore::new(kv))
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let (_, orders) = store();
        let mut order = sample_order("ORD-1", Utc::now());
        orders.create(&mut order).await.unwrap();
        assert_eq!(orders.get("ORD-1").await.unwrap().unwrap().id(), "ORD-1");
        assert_eq!(orders.latest().await.unwrap().unwrap().id(), "ORD-1");
        assert!(orders.get("ORD-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first_and_skips_bad_records() {
        let (kv, orders) = store();
        let now = Utc::now();
        orders.create(&mut sample_order("ORD-1", now - Duration::hours(2))).await.unwrap();
        orders.create(&mut sample_order("ORD-2", now)).await.unwrap();
        kv.set("order-broken", "{".into()).await.unwrap();
        let ids: Vec<String> = orders.list().await.unwrap().iter().map(|o| o.id().to_string()).collect();
        assert_eq!(ids, vec!["ORD-2", "ORD-1"]);
    }

    #[tokio::test]
    async fn test_update_status_persists_only_status() {
        let (_, orders) = store();
        let mut order = sample_order("ORD-1", Utc::now());
        orders.create(&mut order).await.unwrap();

        orders.update_status("ORD-1", OrderStatus::Confirmed).await.unwrap();
        let updated = orders.update_status("ORD-1", OrderStatus::Shipped).await.unwrap();
        let stored = orders.get("ORD-1").await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Shipped);
        assert_eq!(stored.items(), order.items());
        assert_eq!(stored.pricing(), order.pricing());
        assert_eq!(updated.updated_at().timestamp_millis(), stored.updated_at().timestamp_millis());
        assert_eq!(orders.latest().await.unwrap().unwrap().status(), OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_update_status_errors() {
        let (_, orders) = store();
        assert!(matches!(orders.update_status("nope", OrderStatus::Confirmed).await, Err(OrderStoreError::NotFound(_))));
        orders.create(&mut sample_order("ORD-1", Utc::now())).await.unwrap();
        orders.cancel("ORD-1").await.unwrap();
        assert!(matches!(orders.update_status("ORD-1", OrderStatus::Confirmed).await, Err(OrderStoreError::Order(OrderError::InvalidTransition { .. }))));
    }
}
