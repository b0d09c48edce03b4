//! Checkout
//!
//! `Draft -> Submitting -> Confirmed | Failed`. Validation failures and an
//! empty cart keep the flow in `Draft`. The cart is cleared only after the
//! order has been persisted; a storage failure leaves it intact for retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};
use crate::config::PricingConfig;
use crate::domain::{Cart, Customer, DeliveryOption, DeliveryTier, Order, OrderDetails, OrderError, OrderLine, PaymentMethod, ShippingAddress};
use crate::orders::OrderStore;
use crate::pricing;
use crate::storage::StorageError;

/// Field name to user-facing messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckoutForm {
    #[validate(length(min = 1, max = 60, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 60, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(min = 3, max = 120, message = "Street address is required"))]
    pub street: String,
    #[validate(length(min = 2, max = 60, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 2, max = 60, message = "State or region is required"))]
    pub region: String,
    #[validate(custom = "validate_postal_code")]
    pub postal_code: String,
    #[validate(required(message = "Choose a delivery option"))]
    pub delivery_tier: Option<DeliveryTier>,
    #[validate(required(message = "Choose a payment method"))]
    pub payment_method: Option<PaymentMethod>,
    pub promo_code: Option<String>,
    pub accept_terms: bool,
}

impl CheckoutForm {
    /// Copy with surrounding whitespace removed from every text field.
    pub fn trimmed(&self) -> Self {
        let trim = |s: &str| s.trim().to_string();
        Self {
            first_name: trim(&self.first_name), last_name: trim(&self.last_name), email: trim(&self.email),
            phone: trim(&self.phone), street: trim(&self.street), city: trim(&self.city),
            region: trim(&self.region), postal_code: trim(&self.postal_code),
            promo_code: self.promo_code.as_deref().map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
            ..self.clone()
        }
    }

    /// Runs every field rule on the trimmed form, including terms acceptance.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.trimmed().validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if !self.accept_terms {
            errors.add("acceptTerms", message_error("terms", "You must accept the terms and conditions"));
        }
        if errors.errors().is_empty() { Ok(()) } else { Err(errors) }
    }

    fn customer(&self) -> Customer {
        Customer { name: format!("{} {}", self.first_name, self.last_name), email: self.email.clone(), phone: self.phone.clone() }
    }

    fn address(&self) -> ShippingAddress {
        ShippingAddress {
            street: self.street.clone(), city: self.city.clone(),
            region: self.region.clone(), postal_code: self.postal_code.clone(),
        }
    }
}

fn message_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    let allowed = rest.chars().all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    let digits = rest.chars().filter(char::is_ascii_digit).count();
    if allowed && (7..=15).contains(&digits) { Ok(()) } else { Err(message_error("phone", "Enter a valid phone number")) }
}

fn validate_postal_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    let allowed = code.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-'));
    if allowed && (3..=10).contains(&code.len()) { Ok(()) } else { Err(message_error("postal_code", "Enter a valid postal code")) }
}

/// Flattens validator output into field -> messages, using the camelCase
/// field names the form is submitted with.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors.field_errors().into_iter().map(|(field, errs)| {
        let messages = errs.iter()
            .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
            .collect();
        (camel_case(field), messages)
    }).collect()
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' { upper = true; continue; }
        if upper { out.extend(c.to_uppercase()); upper = false; } else { out.push(c); }
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CheckoutState {
    Draft,
    Submitting,
    Confirmed { order_id: String },
    Failed { message: String },
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("checkout form has invalid fields")]
    Validation(FieldErrors),
    #[error("this checkout was already confirmed")]
    AlreadyConfirmed,
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("could not save order: {0}")]
    Persistence(#[source] StorageError),
}

pub const PERSISTENCE_FAILED: &str = "We couldn't place your order. Your cart has been kept, please try again.";

#[derive(Debug)]
pub struct Checkout<'a> {
    pricing: &'a PricingConfig,
    orders: &'a OrderStore,
    delay: Duration,
    state: CheckoutState,
}

impl<'a> Checkout<'a> {
    pub fn new(pricing: &'a PricingConfig, orders: &'a OrderStore) -> Self {
        Self { pricing, orders, delay: Duration::ZERO, state: CheckoutState::Draft }
    }

    /// Simulated network latency before the order is written.
    pub fn with_delay(mut self, delay: Duration) -> Self { self.delay = delay; self }

    pub fn state(&self) -> &CheckoutState { &self.state }

    pub async fn submit(&mut self, cart: &mut Cart, form: &CheckoutForm) -> Result<Order, CheckoutError> {
        if matches!(self.state, CheckoutState::Confirmed { .. }) { return Err(CheckoutError::AlreadyConfirmed); }
        if cart.is_empty() {
            self.state = CheckoutState::Draft;
            return Err(CheckoutError::EmptyCart);
        }
        if let Err(errors) = form.check() {
            self.state = CheckoutState::Draft;
            return Err(CheckoutError::Validation(field_errors(&errors)));
        }

        self.state = CheckoutState::Submitting;
        let form = form.trimmed();
        let tier = form.delivery_tier.unwrap_or_default();
        let amounts = pricing::calculate(cart.items(), form.promo_code.as_deref(), tier, self.pricing);
        let details = OrderDetails {
            customer: form.customer(),
            shipping_address: form.address(),
            // The recorded fee is what was charged, so a waived fee is zero.
            delivery: DeliveryOption { fee: amounts.shipping_fee, ..self.pricing.delivery.option(tier) },
            payment_method: form.payment_method.unwrap_or_default(),
            promo_code: form.promo_code.as_deref().filter(|c| self.pricing.promotion(c).is_some()).map(str::to_uppercase),
        };
        let now = Utc::now();
        let lines = cart.items().iter().map(OrderLine::from).collect();
        let mut order = match Order::place(order_id(now), lines, details, amounts, now) {
            Ok(order) => order,
            Err(error) => {
                self.state = CheckoutState::Draft;
                return Err(error.into());
            }
        };

        if !self.delay.is_zero() { tokio::time::sleep(self.delay).await; }

        if let Err(error) = self.orders.create(&mut order).await {
            tracing::error!(order_id = order.id(), %error, "order was not saved, keeping cart");
            self.state = CheckoutState::Failed { message: PERSISTENCE_FAILED.to_string() };
            return Err(CheckoutError::Persistence(error));
        }

        cart.clear();
        tracing::info!(order_id = order.id(), total = %order.total(), "checkout confirmed, cart cleared");
        self.state = CheckoutState::Confirmed { order_id: order.id().to_string() };
        Ok(order)
    }
}

fn order_id(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
    format!("ORD-{}-{}", now.timestamp_millis(), suffix.to_uppercase())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::catalog::Catalog;
    use crate::domain::{Money, OrderStatus, ProductId};
    use crate::storage::{MemoryStore, MockKeyValueStore};

    pub(crate) fn valid_form() -> CheckoutForm {
        CheckoutForm {
            first_name: "Ada".into(), last_name: "Lovelace".into(), email: "ada@example.com".into(),
            phone: "+1 (555) 010-0199".into(), street: "12 Analytical Row".into(), city: "London".into(),
            region: "Greater London".into(), postal_code: "NW1 6XE".into(),
            delivery_tier: Some(DeliveryTier::Standard), payment_method: Some(PaymentMethod::CashOnDelivery),
            promo_code: Some("save10".into()), accept_terms: true,
        }
    }

    pub(crate) fn reference_cart() -> Cart {
        let catalog = Catalog::seeded();
        let mut cart = Cart::new();
        cart.add_item(catalog.find(&ProductId::new("p-001").unwrap()).unwrap(), 2).unwrap();
        cart.add_item(catalog.find(&ProductId::new("p-002").unwrap()).unwrap(), 1).unwrap();
        cart
    }

    fn memory_orders() -> OrderStore { OrderStore::new(Arc::new(MemoryStore::new())) }

    #[test]
    fn test_valid_form_passes() {
        assert!(valid_form().check().is_ok());
    }

    #[test]
    fn test_field_errors_are_reported_per_field() {
        let form = CheckoutForm {
            email: "not-an-email".into(), phone: "12".into(), postal_code: "!".into(),
            delivery_tier: None, accept_terms: false, ..valid_form()
        };
        let errors = field_errors(&form.check().unwrap_err());
        for field in ["email", "phone", "postalCode", "deliveryTier", "acceptTerms"] {
            assert!(errors.contains_key(field), "missing {field} in {errors:?}");
        }
        assert!(!errors.contains_key("firstName"));
        assert_eq!(errors["acceptTerms"], vec!["You must accept the terms and conditions".to_string()]);
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        let form = CheckoutForm { first_name: "   ".into(), street: " \t ".into(), city: "  L ".into(), ..valid_form() };
        let errors = field_errors(&form.check().unwrap_err());
        for field in ["firstName", "street", "city"] {
            assert!(errors.contains_key(field), "missing {field} in {errors:?}");
        }
        assert!(!errors.contains_key("lastName"));
        assert!(CheckoutForm { first_name: "  Ada  ".into(), ..valid_form() }.check().is_ok());
    }

    #[test]
    fn test_phone_rules() {
        assert!(validate_phone("01012345678").is_ok());
        assert!(validate_phone("+20 101 234 5678").is_ok());
        assert!(validate_phone("555-01a9").is_err());
        assert!(validate_phone("+123").is_err());
    }

    #[tokio::test]
    async fn test_submit_places_order_and_clears_cart() {
        let pricing = PricingConfig::default();
        let orders = memory_orders();
        let mut cart = reference_cart();
        let mut checkout = Checkout::new(&pricing, &orders);

        let order = checkout.submit(&mut cart, &valid_form()).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total(), Money::from_minor(4954));
        assert_eq!(order.promo_code(), Some("SAVE10"));
        assert_eq!(order.customer().name, "Ada Lovelace");
        assert_eq!(order.delivery().fee, order.pricing().shipping_fee);
        assert_eq!(checkout.state(), &CheckoutState::Confirmed { order_id: order.id().to_string() });
        assert_eq!(orders.latest().await.unwrap().unwrap().id(), order.id());
        assert!(matches!(checkout.submit(&mut reference_cart(), &valid_form()).await, Err(CheckoutError::AlreadyConfirmed)));
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let pricing = PricingConfig::default();
        let orders = memory_orders();
        let mut checkout = Checkout::new(&pricing, &orders);
        let result = checkout.submit(&mut Cart::new(), &valid_form()).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(checkout.state(), &CheckoutState::Draft);
        assert!(orders.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_form_stays_in_draft() {
        let pricing = PricingConfig::default();
        let orders = memory_orders();
        let mut cart = reference_cart();
        let mut checkout = Checkout::new(&pricing, &orders);
        let form = CheckoutForm { accept_terms: false, ..valid_form() };
        assert!(matches!(checkout.submit(&mut cart, &form).await, Err(CheckoutError::Validation(_))));
        assert_eq!(checkout.state(), &CheckoutState::Draft);
        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_cart() {
        let mut kv = MockKeyValueStore::new();
        kv.expect_set().returning(|_, _| Err(StorageError::Unavailable("quota exceeded".into())));
        kv.expect_remove().returning(|_| Ok(()));
        let orders = OrderStore::new(Arc::new(kv));
        let pricing = PricingConfig::default();
        let mut cart = reference_cart();
        let mut checkout = Checkout::new(&pricing, &orders);

        let result = checkout.submit(&mut cart, &valid_form()).await;
        assert!(matches!(result, Err(CheckoutError::Persistence(_))));
        assert_eq!(cart.item_count(), 2);
        assert_eq!(checkout.state(), &CheckoutState::Failed { message: PERSISTENCE_FAILED.to_string() });
    }

    #[tokio::test]
    async fn test_retry_after_failure_succeeds() {
        let pricing = PricingConfig::default();
        let mut cart = reference_cart();

        let mut failing = MockKeyValueStore::new();
        failing.expect_set().returning(|_, _| Err(StorageError::Unavailable("offline".into())));
        failing.expect_remove().returning(|_| Ok(()));
        let failing = OrderStore::new(Arc::new(failing));
        assert!(Checkout::new(&pricing, &failing).submit(&mut cart, &valid_form()).await.is_err());

        let orders = memory_orders();
        let mut checkout = Checkout::new(&pricing, &orders);
        checkout.submit(&mut cart, &valid_form()).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_promo_is_not_recorded() {
        let pricing = PricingConfig::default();
        let orders = memory_orders();
        let mut cart = reference_cart();
        let form = CheckoutForm { promo_code: Some("FREESTUFF".into()), ..valid_form() };
        let order = Checkout::new(&pricing, &orders).submit(&mut cart, &form).await.unwrap();
        assert_eq!(order.promo_code(), None);
        assert_eq!(order.pricing().discount, Money::ZERO);
    }

    #[tokio::test]
    async fn test_waived_fee_is_recorded_as_zero() {
        let pricing = PricingConfig::default();
        let orders = memory_orders();
        let form = CheckoutForm { delivery_tier: Some(DeliveryTier::Express), promo_code: None, ..valid_form() };
        let order = Checkout::new(&pricing, &orders).submit(&mut reference_cart(), &form).await.unwrap();
        assert_eq!(order.pricing().shipping_fee, Money::ZERO);
        assert_eq!(order.delivery().tier, DeliveryTier::Express);
        assert_eq!(order.delivery().fee, Money::ZERO);
        assert_eq!(order.delivery().eta_days, pricing.delivery.express.eta_days);

        let mut small = Cart::new();
        small.add_item(Catalog::seeded().find(&ProductId::new("p-002").unwrap()).unwrap(), 1).unwrap();
        let order = Checkout::new(&pricing, &orders).submit(&mut small, &form).await.unwrap();
        assert_eq!(order.delivery().fee, pricing.delivery.express.fee);
        assert_eq!(order.pricing().shipping_fee, pricing.delivery.express.fee);
    }

    #[tokio::test]
    async fn test_submitted_fields_are_trimmed() {
        let pricing = PricingConfig::default();
        let orders = memory_orders();
        let form = CheckoutForm { first_name: " Ada ".into(), city: " London  ".into(), promo_code: Some("  save10 ".into()), ..valid_form() };
        let order = Checkout::new(&pricing, &orders).submit(&mut reference_cart(), &form).await.unwrap();
        assert_eq!(order.customer().name, "Ada Lovelace");
        assert_eq!(order.shipping_address().city, "London");
        assert_eq!(order.promo_code(), Some("SAVE10"));
    }
}
