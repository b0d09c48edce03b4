//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::aggregates::cart::CartItem;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, ProductId};
use crate::pricing::{PriceBreakdown, PricedLine};

/// Placed orders are a snapshot: only `status` and `updated_at` change after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: String,
    items: Vec<OrderLine>,
    customer: Customer,
    shipping_address: ShippingAddress,
    delivery: DeliveryOption,
    payment_method: PaymentMethod,
    #[serde(default)]
    promo_code: Option<String>,
    #[serde(flatten)]
    pricing: PriceBreakdown,
    status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine { pub product_id: ProductId, pub name: String, pub unit_price: Money, pub quantity: u32 }

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self { product_id: item.product_id.clone(), name: item.name.clone(), unit_price: item.unit_price, quantity: item.quantity.value() }
    }
}

impl PricedLine for OrderLine {
    fn unit_price(&self) -> Money { self.unit_price }
    fn quantity(&self) -> u32 { self.quantity }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer { pub name: String, pub email: String, pub phone: String }

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress { pub street: String, pub city: String, pub region: String, pub postal_code: String }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOption { pub tier: DeliveryTier, pub fee: Money, pub eta_days: u32 }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryTier { #[default] Standard, Express, SameDay }

/// Stored as a label only; no payment is taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod { #[default] CashOnDelivery, Card, Wallet }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    fn stage(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0), Self::Confirmed => Some(1), Self::Processing => Some(2),
            Self::Shipped => Some(3), Self::Delivered => Some(4), Self::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }

    /// Forward moves only; cancellation from anything short of delivered.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() { return false; }
        match (self.stage(), next.stage()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, _) => false,
        }
    }
}

/// Customer-facing fields captured at checkout
#[derive(Clone, Debug, PartialEq)]
pub struct OrderDetails {
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub delivery: DeliveryOption,
    pub payment_method: PaymentMethod,
    pub promo_code: Option<String>,
}

impl Order {
    pub fn place(id: impl Into<String>, items: Vec<OrderLine>, details: OrderDetails, pricing: PriceBreakdown, now: DateTime<Utc>) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        let id = id.into();
        let mut order = Self {
            id: id.clone(), items, customer: details.customer, shipping_address: details.shipping_address,
            delivery: details.delivery, payment_method: details.payment_method, promo_code: details.promo_code,
            pricing, status: OrderStatus::Pending, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, total: pricing.total }));
        Ok(order)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn items(&self) -> &[OrderLine] { &self.items }
    pub fn customer(&self) -> &Customer { &self.customer }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn delivery(&self) -> &DeliveryOption { &self.delivery }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn promo_code(&self) -> Option<&str> { self.promo_code.as_deref() }
    pub fn pricing(&self) -> &PriceBreakdown { &self.pricing }
    pub fn total(&self) -> Money { self.pricing.total }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn update_status(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), OrderError> {
        let from = self.status;
        if !from.can_transition_to(next) { return Err(OrderError::InvalidTransition { from, to: next }); }
        self.status = next;
        self.updated_at = now;
        let order_id = self.id.clone();
        self.raise_event(DomainEvent::Order(match next {
            OrderStatus::Cancelled => OrderEvent::Cancelled { order_id },
            to => OrderEvent::StatusChanged { order_id, from, to },
        }));
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> { self.update_status(OrderStatus::Cancelled, now) }

    /// Rejects records that could not have been produced by `place`.
    pub fn verify(&self) -> Result<(), OrderError> {
        if self.items.is_empty() { return Err(OrderError::NoItems); }
        if !self.pricing.reconciles() { return Err(OrderError::TotalMismatch); }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("cannot move order from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("order total does not reconcile with its breakdown")]
    TotalMismatch,
}
