//! Deployment configuration
//!
//! Every business constant the pricing calculator reads lives in
//! [`PricingConfig`]. Values come from the process environment (after
//! `dotenvy` has loaded `.env`), parsed through a lookup closure.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use crate::domain::{DeliveryOption, DeliveryTier, Money};

#[derive(Clone, Debug)]
pub struct StorefrontConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub checkout_delay: Duration,
    pub admin: AdminCredentials,
    pub pricing: PricingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminCredentials { pub email: String, pub password: String }

impl Default for AdminCredentials {
    fn default() -> Self { Self { email: "admin@pharmacy.local".into(), password: "admin123".into() } }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PricingConfig {
    pub tax_rate: Decimal,
    pub free_shipping: Option<FreeShipping>,
    pub delivery: DeliveryRates,
    pub promotions: Vec<PromoCode>,
    pub currency: CurrencyFormat,
}

/// Shipping is waived when the basis amount exceeds `threshold`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreeShipping { pub threshold: Money, pub basis: FreeShippingBasis }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FreeShippingBasis {
    /// Pre-discount subtotal.
    #[default]
    Subtotal,
    /// Subtotal after discount.
    TaxableBase,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeliveryRate { pub fee: Money, pub eta_days: u32 }

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeliveryRates { pub standard: DeliveryRate, pub express: DeliveryRate, pub same_day: DeliveryRate }

impl DeliveryRates {
    pub fn rate(&self, tier: DeliveryTier) -> DeliveryRate {
        match tier {
            DeliveryTier::Standard => self.standard,
            DeliveryTier::Express => self.express,
            DeliveryTier::SameDay => self.same_day,
        }
    }

    pub fn option(&self, tier: DeliveryTier) -> DeliveryOption {
        let rate = self.rate(tier);
        DeliveryOption { tier, fee: rate.fee, eta_days: rate.eta_days }
    }
}

impl Default for DeliveryRates {
    fn default() -> Self {
        Self {
            standard: DeliveryRate { fee: Money::ZERO, eta_days: 5 },
            express: DeliveryRate { fee: Money::from_minor(999), eta_days: 2 },
            same_day: DeliveryRate { fee: Money::from_minor(1999), eta_days: 0 },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PromoCode { pub code: String, pub percent_off: Decimal }

impl PromoCode {
    pub fn new(code: impl Into<String>, percent_off: Decimal) -> Self { Self { code: code.into(), percent_off } }
    pub fn rate(&self) -> Decimal { self.percent_off / Decimal::ONE_HUNDRED }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrencyFormat { pub symbol: String, pub position: SymbolPosition }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SymbolPosition { #[default] Prefix, Suffix }

impl CurrencyFormat {
    pub fn format(&self, amount: Money) -> String {
        match self.position {
            SymbolPosition::Prefix => format!("{}{}", self.symbol, amount),
            SymbolPosition::Suffix => format!("{} {}", amount, self.symbol),
        }
    }
}

impl Default for CurrencyFormat {
    fn default() -> Self { Self { symbol: "$".into(), position: SymbolPosition::Prefix } }
}

impl PricingConfig {
    /// Case-insensitive lookup; unknown codes are simply absent.
    pub fn promotion(&self, code: &str) -> Option<&PromoCode> {
        let code = code.trim();
        self.promotions.iter().find(|p| p.code.eq_ignore_ascii_case(code))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let tax_rate = parse(&lookup, "STORE_TAX_RATE", decimal)?.unwrap_or(defaults.tax_rate);

        let basis = parse(&lookup, "STORE_FREE_SHIPPING_BASIS", |v| match v {
            "subtotal" => Ok(FreeShippingBasis::Subtotal),
            "taxable-base" => Ok(FreeShippingBasis::TaxableBase),
            _ => Err("expected `subtotal` or `taxable-base`".to_string()),
        })?.unwrap_or_default();
        let free_shipping = match lookup("STORE_FREE_SHIPPING_THRESHOLD") {
            Some(v) if v.trim().eq_ignore_ascii_case("none") => None,
            Some(v) => Some(FreeShipping { threshold: Money::new(decimal(v.trim()).map_err(|reason| invalid("STORE_FREE_SHIPPING_THRESHOLD", &v, reason))?), basis }),
            None => defaults.free_shipping.map(|f| FreeShipping { basis, ..f }),
        };

        let mut delivery = defaults.delivery;
        for (key, rate) in [("STORE_FEE_STANDARD", &mut delivery.standard), ("STORE_FEE_EXPRESS", &mut delivery.express), ("STORE_FEE_SAME_DAY", &mut delivery.same_day)] {
            if let Some(fee) = parse(&lookup, key, decimal)? { rate.fee = Money::new(fee); }
        }

        let promotions = match lookup("STORE_PROMO_CODES") {
            Some(v) => promo_codes(&v).map_err(|reason| invalid("STORE_PROMO_CODES", &v, reason))?,
            None => defaults.promotions,
        };

        let mut currency = defaults.currency;
        if let Some(symbol) = lookup("STORE_CURRENCY_SYMBOL") { currency.symbol = symbol; }
        if let Some(position) = parse(&lookup, "STORE_CURRENCY_POSITION", |v| match v {
            "prefix" => Ok(SymbolPosition::Prefix),
            "suffix" => Ok(SymbolPosition::Suffix),
            _ => Err("expected `prefix` or `suffix`".to_string()),
        })? { currency.position = position; }

        Ok(Self { tax_rate, free_shipping, delivery, promotions, currency })
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(8, 2),
            free_shipping: Some(FreeShipping { threshold: Money::from_minor(5000), basis: FreeShippingBasis::Subtotal }),
            delivery: DeliveryRates::default(),
            promotions: vec![PromoCode::new("SAVE10", Decimal::TEN)],
            currency: CurrencyFormat::default(),
        }
    }
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|key| std::env::var(key).ok()) }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse(&lookup, "PORT", |v| v.parse::<u16>().map_err(|e| e.to_string()))?.unwrap_or(8083);
        let delay_ms = parse(&lookup, "CHECKOUT_DELAY_MS", |v| v.parse::<u64>().map_err(|e| e.to_string()))?.unwrap_or(800);
        let defaults = AdminCredentials::default();
        let admin = AdminCredentials {
            email: lookup("ADMIN_EMAIL").unwrap_or(defaults.email),
            password: lookup("ADMIN_PASSWORD").unwrap_or(defaults.password),
        };
        Ok(Self {
            port,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            checkout_delay: Duration::from_millis(delay_ms),
            admin,
            pricing: PricingConfig::from_lookup(&lookup)?,
        })
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self { port: 8083, database_url: None, checkout_delay: Duration::ZERO, admin: AdminCredentials::default(), pricing: PricingConfig::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, f: impl Fn(&str) -> Result<T, String>) -> Result<Option<T>, ConfigError> {
    lookup(key).map(|v| f(v.trim()).map_err(|reason| invalid(key, &v, reason))).transpose()
}

fn decimal(v: &str) -> Result<Decimal, String> {
    let d = Decimal::from_str(v).map_err(|e| e.to_string())?;
    if d.is_sign_negative() { return Err("must not be negative".to_string()); }
    Ok(d)
}

fn promo_codes(v: &str) -> Result<Vec<PromoCode>, String> {
    v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(|entry| {
        let (code, percent) = entry.split_once('=').ok_or_else(|| format!("expected CODE=percent, got {entry:?}"))?;
        let percent = decimal(percent.trim())?;
        if percent > Decimal::ONE_HUNDRED { return Err(format!("{code}: discount above 100%")); }
        Ok(PromoCode::new(code.trim(), percent))
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = StorefrontConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.port, 8083);
        assert_eq!(cfg.checkout_delay, Duration::from_millis(800));
        assert_eq!(cfg.pricing, PricingConfig::default());
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn test_vat_deployment() {
        let cfg = PricingConfig::from_lookup(lookup(&[
            ("STORE_TAX_RATE", "0.14"), ("STORE_FREE_SHIPPING_THRESHOLD", "500"),
            ("STORE_FREE_SHIPPING_BASIS", "taxable-base"), ("STORE_CURRENCY_SYMBOL", "L.E"),
            ("STORE_CURRENCY_POSITION", "suffix"), ("STORE_PROMO_CODES", "SAVE10=10, WELCOME=15"),
        ])).unwrap();
        assert_eq!(cfg.tax_rate, Decimal::new(14, 2));
        assert_eq!(cfg.free_shipping, Some(FreeShipping { threshold: Money::from_minor(50000), basis: FreeShippingBasis::TaxableBase }));
        assert_eq!(cfg.currency.format(Money::from_minor(12345)), "123.45 L.E");
        assert_eq!(cfg.promotion("welcome").map(|p| p.rate()), Some(Decimal::new(15, 2)));
    }

    #[test]
    fn test_threshold_can_be_disabled() {
        let cfg = PricingConfig::from_lookup(lookup(&[("STORE_FREE_SHIPPING_THRESHOLD", "none")])).unwrap();
        assert!(cfg.free_shipping.is_none());
    }

    #[test]
    fn test_malformed_values_are_errors() {
        assert!(PricingConfig::from_lookup(lookup(&[("STORE_TAX_RATE", "eight")])).is_err());
        assert!(PricingConfig::from_lookup(lookup(&[("STORE_TAX_RATE", "-0.1")])).is_err());
        assert!(PricingConfig::from_lookup(lookup(&[("STORE_PROMO_CODES", "SAVE10")])).is_err());
        assert!(StorefrontConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn test_promotion_lookup_ignores_case() {
        let cfg = PricingConfig::default();
        for code in ["SAVE10", "save10", "SaVe10", " save10 "] { assert!(cfg.promotion(code).is_some()); }
        assert!(cfg.promotion("SAVE20").is_none());
        assert_eq!(CurrencyFormat::default().format(Money::from_minor(4954)), "$49.54");
    }
}
