//! # Month Summary
//!
//! Dashboard figures for one calendar month.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::recalc::{month_aggregate, MonthAggregate};
use crate::status::derive_status;
use crate::types::{PricingPolicy, Purchase, PurchaseStatus};

/// Totals and status counts over the purchases of one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub aggregate: MonthAggregate,
    pub base_fees: f64,
    pub total_discount: f64,
    pub total_fees: f64,
    /// Positive grams still owed; overpayments do not offset other debts.
    pub outstanding_grams: f64,
    pub outstanding_fees: f64,
    pub pending: usize,
    pub partial: usize,
    pub paid: usize,
    pub overdue: usize,
}

/// Summarises `month`/`year` as of `today`.
///
/// Status is re-derived rather than read, so a summary taken days after the
/// last recalculation still counts newly overdue purchases.
pub fn summarize_month(
    purchases: &[Purchase],
    month: u32,
    year: i32,
    policy: &PricingPolicy,
    today: NaiveDate,
) -> MonthSummary {
    let mut summary = MonthSummary {
        aggregate: month_aggregate(purchases, month, year, policy),
        base_fees: 0.0,
        total_discount: 0.0,
        total_fees: 0.0,
        outstanding_grams: 0.0,
        outstanding_fees: 0.0,
        pending: 0,
        partial: 0,
        paid: 0,
        overdue: 0,
    };

    for purchase in purchases.iter().filter(|p| p.is_in_month(month, year)) {
        summary.base_fees += purchase.base_fees;
        summary.total_discount += purchase.total_discount;
        summary.total_fees += purchase.total_fees;
        summary.outstanding_grams += purchase.grams_due().max(0.0);
        summary.outstanding_fees += purchase.fees_due().max(0.0);

        match derive_status(purchase, today) {
            PurchaseStatus::Pending => summary.pending += 1,
            PurchaseStatus::Partial => summary.partial += 1,
            PurchaseStatus::Paid => summary.paid += 1,
            PurchaseStatus::Overdue => summary.overdue += 1,
        }
    }

    summary
}
