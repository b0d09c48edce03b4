//! Storefront domain model
pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::*;
pub use events::{DomainEvent, OrderEvent, ProductEvent};
pub use value_objects::{Money, ProductId, Quantity};
