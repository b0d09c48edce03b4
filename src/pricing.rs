//! Pricing calculator
//!
//! A pure function from cart contents, promo code and delivery tier to the
//! money breakdown shown at checkout and frozen into an order. Every input
//! change re-runs [`calculate`]; nothing is updated incrementally.
//!
//! Rounding policy: `subtotal` is rounded to two places when it is summed
//! (the same value the cart displays), `discount` and `tax` are kept exact,
//! and `total` is rounded once at the end. As a result
//! `total == round2(subtotal - discount + tax + shipping_fee)` always holds.

use serde::{Deserialize, Serialize};
use crate::config::{FreeShippingBasis, PricingConfig};
use crate::domain::{DeliveryTier, Money};

/// Anything that can be priced as `unit_price x quantity`.
pub trait PricedLine {
    fn unit_price(&self) -> Money;
    fn quantity(&self) -> u32;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping_fee: Money,
    pub total: Money,
}

impl PriceBreakdown {
    pub fn zero() -> Self { Self::default() }

    pub fn taxable_base(&self) -> Money { self.subtotal.subtract(self.discount) }

    pub fn reconciles(&self) -> bool {
        self.taxable_base().add(self.tax).add(self.shipping_fee).round2() == self.total
    }

    /// Every component at display precision.
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: self.subtotal.round2(), discount: self.discount.round2(), tax: self.tax.round2(),
            shipping_fee: self.shipping_fee.round2(), total: self.total.round2(),
        }
    }
}

/// Sum of `unit_price x quantity`, rounded to display precision.
pub fn subtotal<L: PricedLine>(items: &[L]) -> Money {
    items.iter().map(|line| line_amount(line)).sum::<Money>().round2()
}

pub fn calculate<L: PricedLine>(items: &[L], promo_code: Option<&str>, tier: DeliveryTier, config: &PricingConfig) -> PriceBreakdown {
    if items.is_empty() { return PriceBreakdown::zero(); }

    let subtotal = subtotal(items);
    let discount = promo_code
        .and_then(|code| config.promotion(code))
        .map(|promo| subtotal.scale(promo.rate()))
        .unwrap_or(Money::ZERO);
    let taxable_base = subtotal.subtract(discount);
    let tax = taxable_base.scale(config.tax_rate);

    let shipping_fee = match config.free_shipping {
        Some(free) => {
            let basis = match free.basis {
                FreeShippingBasis::Subtotal => subtotal,
                FreeShippingBasis::TaxableBase => taxable_base,
            };
            if basis > free.threshold { Money::ZERO } else { config.delivery.rate(tier).fee }
        }
        None => config.delivery.rate(tier).fee,
    };

    let total = taxable_base.add(tax).add(shipping_fee).round2();
    tracing::debug!(%subtotal, %discount, %tax, %shipping_fee, %total, ?tier, "priced cart");
    PriceBreakdown { subtotal, discount, tax, shipping_fee, total }
}

// Negative amounts are rejected at the cart boundary; one reaching here is a bug.
fn line_amount<L: PricedLine>(line: &L) -> Money {
    let price = line.unit_price();
    debug_assert!(!price.is_negative(), "negative unit price reached the pricing calculator");
    price.max_zero().multiply(line.quantity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FreeShipping;
    use rust_decimal::Decimal;

    struct Line(i64, u32);

    impl PricedLine for Line {
        fn unit_price(&self) -> Money { Money::from_minor(self.0) }
        fn quantity(&self) -> u32 { self.1 }
    }

    struct Exact(Decimal, u32);

    impl PricedLine for Exact {
        fn unit_price(&self) -> Money { Money::new(self.0) }
        fn quantity(&self) -> u32 { self.1 }
    }

    fn money(s: &str) -> Money { Money::new(s.parse().unwrap()) }

    #[test]
    fn test_reference_scenario() {
        let items = [Line(1299, 2), Line(2499, 1)];
        let p = calculate(&items, Some("SAVE10"), DeliveryTier::Standard, &PricingConfig::default());
        assert_eq!(p.subtotal, money("50.97"));
        assert_eq!(p.discount, money("5.097"));
        assert_eq!(p.taxable_base(), money("45.873"));
        assert_eq!(p.tax, money("3.66984"));
        assert_eq!(p.shipping_fee, Money::ZERO);
        assert_eq!(p.total, money("49.54"));
        assert_eq!(p.rounded().discount, money("5.10"));
        assert_eq!(p.rounded().tax, money("3.67"));
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let items: [Line; 0] = [];
        assert_eq!(calculate(&items, Some("SAVE10"), DeliveryTier::SameDay, &PricingConfig::default()), PriceBreakdown::zero());
    }

    #[test]
    fn test_subtotal_ignores_order() {
        let a = [Line(1299, 2), Line(2499, 1), Line(350, 4)];
        let b = [Line(350, 4), Line(1299, 2), Line(2499, 1)];
        assert_eq!(subtotal(&a), subtotal(&b));
        assert_eq!(subtotal(&a), money("64.97"));
    }

    #[test]
    fn test_promo_codes_ignore_case() {
        let cfg = PricingConfig::default();
        let items = [Line(4000, 1)];
        let upper = calculate(&items, Some("SAVE10"), DeliveryTier::Standard, &cfg);
        for code in ["save10", "SaVe10"] {
            assert_eq!(calculate(&items, Some(code), DeliveryTier::Standard, &cfg), upper);
        }
        assert_eq!(upper.discount, money("4.000"));
        for code in ["SAVE100", "", "10SAVE"] {
            assert_eq!(calculate(&items, Some(code), DeliveryTier::Standard, &cfg).discount, Money::ZERO);
        }
        assert_eq!(calculate(&items, None, DeliveryTier::Standard, &cfg).discount, Money::ZERO);
    }

    #[test]
    fn test_free_shipping_flips_once() {
        let cfg = PricingConfig::default();
        let fees: Vec<Money> = (4990..=5020).step_by(5)
            .map(|minor| calculate(&[Line(minor, 1)], None, DeliveryTier::Express, &cfg).shipping_fee)
            .collect();
        let first_free = fees.iter().position(Money::is_zero).unwrap();
        assert!(fees[..first_free].iter().all(|f| *f == money("9.99")));
        assert!(fees[first_free..].iter().all(Money::is_zero));
        // 50.00 does not exceed the threshold
        assert_eq!(calculate(&[Line(5000, 1)], None, DeliveryTier::Express, &cfg).shipping_fee, money("9.99"));
    }

    #[test]
    fn test_threshold_basis_after_discount() {
        let mut cfg = PricingConfig::default();
        let items = [Line(1299, 2), Line(2499, 1)];
        assert_eq!(calculate(&items, Some("SAVE10"), DeliveryTier::Express, &cfg).shipping_fee, Money::ZERO);

        cfg.free_shipping = Some(FreeShipping { threshold: Money::from_minor(5000), basis: FreeShippingBasis::TaxableBase });
        let p = calculate(&items, Some("SAVE10"), DeliveryTier::Express, &cfg);
        assert_eq!(p.shipping_fee, money("9.99"));
        assert_eq!(p.total, money("59.53"));
    }

    #[test]
    fn test_no_threshold_always_charges() {
        let cfg = PricingConfig { free_shipping: None, ..PricingConfig::default() };
        assert_eq!(calculate(&[Line(100_000, 1)], None, DeliveryTier::SameDay, &cfg).shipping_fee, money("19.99"));
    }

    #[test]
    fn test_total_reconciles_with_fractional_cents() {
        let cfg = PricingConfig { tax_rate: Decimal::new(14, 2), ..PricingConfig::default() };
        let cases = [
            vec![Exact(Decimal::new(19995, 3), 1)],
            vec![Exact(Decimal::new(19995, 3), 3), Exact(Decimal::new(333, 2), 7)],
            vec![Exact(Decimal::new(1, 3), 9)],
        ];
        for items in &cases {
            for tier in [DeliveryTier::Standard, DeliveryTier::Express, DeliveryTier::SameDay] {
                for promo in [None, Some("save10")] {
                    let p = calculate(items, promo, tier, &cfg);
                    assert!(p.reconciles(), "{p:?}");
                    assert_eq!(p.total, p.subtotal.subtract(p.discount).add(p.tax).add(p.shipping_fee).round2());
                }
            }
        }
        assert_eq!(calculate(&cases[0], None, DeliveryTier::Standard, &cfg).subtotal, money("20.00"));
    }

    #[test]
    fn test_extreme_amounts_saturate() {
        let items = [Exact(Decimal::MAX, 5000), Exact(Decimal::MAX, 1)];
        let p = calculate(&items, Some("SAVE10"), DeliveryTier::Express, &PricingConfig::default());
        assert_eq!(p.subtotal, Money::new(Decimal::MAX));
        assert!(!p.total.is_negative());
    }
}
