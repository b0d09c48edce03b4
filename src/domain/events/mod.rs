//! Domain events
use crate::domain::aggregates::order::OrderStatus;
use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProductEvent {
    Created { product_id: ProductId },
    Updated { product_id: ProductId },
    Deleted { product_id: ProductId },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_id: String, total: Money },
    StatusChanged { order_id: String, from: OrderStatus, to: OrderStatus },
    Cancelled { order_id: String },
}

impl DomainEvent {
    /// Emits the event on the `tracing` subscriber.
    pub fn log(&self) {
        match self {
            DomainEvent::Product(ProductEvent::Created { product_id }) => tracing::info!(%product_id, "product created"),
            DomainEvent::Product(ProductEvent::Updated { product_id }) => tracing::info!(%product_id, "product updated"),
            DomainEvent::Product(ProductEvent::Deleted { product_id }) => tracing::info!(%product_id, "product deleted"),
            DomainEvent::Order(OrderEvent::Placed { order_id, total }) => tracing::info!(%order_id, %total, "order placed"),
            DomainEvent::Order(OrderEvent::StatusChanged { order_id, from, to }) => {
                tracing::info!(%order_id, ?from, ?to, "order status changed")
            }
            DomainEvent::Order(OrderEvent::Cancelled { order_id }) => tracing::info!(%order_id, "order cancelled"),
        }
    }
}
