//! # Recalculation Engine
//!
//! Keeps every purchase of a month priced against the month's cumulative
//! volume.
//!
//! ## Why the Whole Month?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  May, tiers {0: 20%, 500: 26%, 1000: 34%}                               │
//! │                                                                         │
//! │  Before:  P1 600g ─┐                                                    │
//! │           P2 600g ─┴─► month 1200g ─► both at 34%                       │
//! │                                                                         │
//! │  Add P3 600g ─► month 1800g ─► P1, P2 AND P3 re-priced                  │
//! │                                                                         │
//! │  Any add / edit / delete can move every sibling across a tier border,  │
//! │  so the whole month is re-priced, never just the changed purchase.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both passes are pure functions of their inputs: running a month twice
//! without a data change yields the same purchases.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::fees::calculate_purchase_fees;
use crate::status::refresh_status;
use crate::tiers::SupplierDirectory;
use crate::types::{PricingPolicy, Purchase};
use crate::units::round_grams;

// =============================================================================
// Month Aggregate
// =============================================================================

/// Volume figures of one calendar month. Computed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthAggregate {
    pub year: i32,
    /// 1-12.
    pub month: u32,
    pub purchase_ids: Vec<String>,
    /// 21k-equivalent grams over the month, one decimal.
    pub monthly_total_grams: f64,
    /// Monthly total reached the medium threshold.
    pub discount_eligible: bool,
}

/// Output of a full month pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthRecalculation {
    /// Every purchase passed in, in the original order.
    pub updated_purchases: Vec<Purchase>,
    pub aggregate: MonthAggregate,
}

/// Sums the month's 21k-equivalent grams.
///
/// Totals are re-derived from the receipt lines, so a stale `total_grams`
/// cannot leak into the tier lookup.
pub fn month_aggregate(
    purchases: &[Purchase],
    month: u32,
    year: i32,
    policy: &PricingPolicy,
) -> MonthAggregate {
    let in_month: Vec<&Purchase> = purchases
        .iter()
        .filter(|p| p.is_in_month(month, year))
        .collect();

    let monthly_total_grams = round_grams(in_month.iter().map(|p| p.derived_total_grams()).sum());

    MonthAggregate {
        year,
        month,
        purchase_ids: in_month.iter().map(|p| p.id.clone()).collect(),
        monthly_total_grams,
        discount_eligible: monthly_total_grams >= f64::from(policy.medium_threshold),
    }
}

/// Re-prices one purchase against `monthly_total` and refreshes its status.
///
/// Line totals, `total_grams`, the fee figures and the due date are all
/// re-derived; payments are left alone.
pub fn reprice_purchase(
    purchase: &Purchase,
    monthly_total: f64,
    directory: &SupplierDirectory,
    policy: &PricingPolicy,
    today: NaiveDate,
) -> Purchase {
    let mut updated = purchase.clone();

    for line in updated.suppliers.values_mut() {
        *line = line.refreshed();
    }
    updated.total_grams = updated.derived_total_grams();
    updated.due_date = policy.due_date(updated.date);

    let fees = calculate_purchase_fees(
        &updated.suppliers,
        updated.date,
        monthly_total,
        directory,
        policy,
    );
    updated.base_fees = fees.base_fees;
    updated.total_discount = fees.total_discount;
    updated.total_fees = fees.total_fees;

    refresh_status(&mut updated, today);
    updated
}

// =============================================================================
// Full Month Pass
// =============================================================================

/// Re-prices every purchase dated in `month`/`year`.
///
/// Run after a purchase is created, edited or deleted, with the month of
/// that purchase's date. Purchases of other months pass through unchanged.
pub fn recalculate_month(
    purchases: &[Purchase],
    month: u32,
    year: i32,
    directory: &SupplierDirectory,
    policy: &PricingPolicy,
    today: NaiveDate,
) -> MonthRecalculation {
    let aggregate = month_aggregate(purchases, month, year, policy);

    let updated_purchases = purchases
        .iter()
        .map(|purchase| {
            if purchase.is_in_month(month, year) {
                reprice_purchase(
                    purchase,
                    aggregate.monthly_total_grams,
                    directory,
                    policy,
                    today,
                )
            } else {
                purchase.clone()
            }
        })
        .collect();

    debug!(
        month,
        year,
        purchases = aggregate.purchase_ids.len(),
        monthly_total = aggregate.monthly_total_grams,
        eligible = aggregate.discount_eligible,
        "Month recalculated"
    );

    MonthRecalculation {
        updated_purchases,
        aggregate,
    }
}

/// Months a purchase change touches: the old date's and the new date's.
///
/// Returned as `(month, year)` pairs without duplicates.
pub fn affected_months(dates: &[NaiveDate]) -> Vec<(u32, i32)> {
    let mut months: Vec<(u32, i32)> = Vec::new();
    for date in dates {
        let key = (date.month(), date.year());
        if !months.contains(&key) {
            months.push(key);
        }
    }
    months
}

// =============================================================================
// Payment-Only Pass
// =============================================================================

/// Refreshes only the status of `purchase_id` after a payment change.
///
/// Fees are untouched: a payment moves progress, not the fee schedule.
pub fn recalculate_after_payment_change(
    purchases: &[Purchase],
    purchase_id: &str,
    today: NaiveDate,
) -> CoreResult<Vec<Purchase>> {
    if !purchases.iter().any(|p| p.id == purchase_id) {
        return Err(CoreError::PurchaseNotFound(purchase_id.to_string()));
    }

    Ok(purchases
        .iter()
        .map(|purchase| {
            let mut purchase = purchase.clone();
            if purchase.id == purchase_id {
                refresh_status(&mut purchase, today);
            }
            purchase
        })
        .collect())
}

// =============================================================================
// Unit Tests
// =============================================================================
