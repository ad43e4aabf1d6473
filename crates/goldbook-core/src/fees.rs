//! # Fee Calculator
//!
//! Computes the base fee, discount and net fee of one purchase.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each supplier line:                                                │
//! │      g21 = grams21k + grams18k × 18/21          (unrounded)             │
//! │      base     += g21 × BASE_FEE_PER_GRAM                                │
//! │      discount += g21 × rate(supplier, 21k, monthlyTotal) / 100          │
//! │                                                                         │
//! │  totalFees = base − discount         (may go negative: store credit)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The discount always uses the supplier's **21k** schedule against the
//! 21k-equivalent quantity, whatever karat mix was delivered.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::karat::Karat;
use crate::tiers::SupplierDirectory;
use crate::types::{PricingPolicy, SupplierReceiptLine};

/// Fee figures for one purchase. Currency values are unrounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub base_fees: f64,
    pub total_discount: f64,
    pub total_fees: f64,
}

/// Whether a purchase dated `purchase_date` takes part in monthly discounts.
///
/// TODO: every date qualifies today; the business still has to decide which
/// months (e.g. only closed months) should be gated before this hardens.
pub fn should_apply_discount(_purchase_date: NaiveDate) -> bool {
    true
}

/// Prices a purchase's receipt lines against the month's cumulative total.
///
/// `monthly_total` is the 21k-equivalent sum over every purchase in the
/// purchase's calendar month, as produced by the recalculation engine.
///
/// ## Example
/// ```rust
/// use std::collections::BTreeMap;
/// use chrono::NaiveDate;
/// use goldbook_core::fees::calculate_purchase_fees;
/// use goldbook_core::{PricingPolicy, SupplierDirectory, SupplierReceiptLine};
///
/// let mut lines = BTreeMap::new();
/// lines.insert("EG18".to_string(), SupplierReceiptLine::new(0.0, 100.0));
///
/// // No supplier configuration: full base fee, no discount.
/// let fees = calculate_purchase_fees(
///     &lines,
///     NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
///     600.0,
///     &SupplierDirectory::new(),
///     &PricingPolicy::default(),
/// );
/// assert_eq!(fees.base_fees, 500.0);
/// assert_eq!(fees.total_fees, 500.0);
/// ```
pub fn calculate_purchase_fees(
    lines: &BTreeMap<String, SupplierReceiptLine>,
    purchase_date: NaiveDate,
    monthly_total: f64,
    directory: &SupplierDirectory,
    policy: &PricingPolicy,
) -> FeeBreakdown {
    let base_fees: f64 = lines
        .values()
        .map(|line| line.equivalent_21k() * policy.base_fee_per_gram)
        .sum();

    let total_discount: f64 = if should_apply_discount(purchase_date) {
        lines
            .iter()
            .map(|(code, line)| {
                let rate = directory.discount_rate(code, Karat::K21, monthly_total);
                line.equivalent_21k() * rate / 100.0
            })
            .sum()
    } else {
        0.0
    };

    FeeBreakdown {
        base_fees,
        total_discount,
        total_fees: base_fees - total_discount,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::{DiscountTier, KaratSchedule, Supplier};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 12).unwrap()
    }

    fn directory(tiers: Vec<DiscountTier>) -> SupplierDirectory {
        SupplierDirectory::from_suppliers([
            Supplier::new("EG18", "Egypt Gold").with_schedule(Karat::K21, KaratSchedule::new(tiers))
        ])
        .unwrap()
    }

    fn lines(grams_18k: f64, grams_21k: f64) -> BTreeMap<String, SupplierReceiptLine> {
        let mut lines = BTreeMap::new();
        lines.insert("EG18".to_string(), SupplierReceiptLine::new(grams_18k, grams_21k));
        lines
    }

    #[test]
    fn test_eg18_scenario() {
        let directory = directory(vec![
            DiscountTier::new("Base", 0, 20.0),
            DiscountTier::new("Silver", 500, 26.0),
            DiscountTier::new("Gold", 1000, 34.0),
        ]);
        let fees = calculate_purchase_fees(
            &lines(200.0, 0.0),
            date(),
            600.0,
            &directory,
            &PricingPolicy::default(),
        );

        assert!((fees.base_fees - 857.14).abs() < 0.01);
        assert!((fees.total_discount - 44.57).abs() < 0.01);
        assert!((fees.total_fees - 812.57).abs() < 0.01);
    }

    #[test]
    fn test_net_fee_can_go_negative() {
        // A 100% discount with a fee below the rate per gram leaves a credit.
        let directory = directory(vec![DiscountTier::new("Promo", 0, 100.0)]);
        let policy = PricingPolicy {
            base_fee_per_gram: 0.5,
            ..PricingPolicy::default()
        };
        let fees = calculate_purchase_fees(&lines(0.0, 10.0), date(), 10.0, &directory, &policy);

        assert_eq!(fees.base_fees, 5.0);
        assert_eq!(fees.total_discount, 10.0);
        assert_eq!(fees.total_fees, -5.0);
    }

    #[test]
    fn test_unknown_supplier_prices_without_discount() {
        let mut lines = lines(0.0, 100.0);
        lines.insert("XX".to_string(), SupplierReceiptLine::new(0.0, 50.0));
        let directory = directory(vec![DiscountTier::new("Base", 0, 10.0)]);

        let fees =
            calculate_purchase_fees(&lines, date(), 150.0, &directory, &PricingPolicy::default());
        assert_eq!(fees.base_fees, 750.0);
        assert_eq!(fees.total_discount, 10.0);
        assert_eq!(fees.total_fees, fees.base_fees - fees.total_discount);
    }

    #[test]
    fn test_empty_lines() {
        let fees = calculate_purchase_fees(
            &BTreeMap::new(),
            date(),
            0.0,
            &SupplierDirectory::new(),
            &PricingPolicy::default(),
        );
        assert_eq!(fees, FeeBreakdown::default());
    }
}
