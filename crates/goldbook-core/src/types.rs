//! # Domain Types
//!
//! Core domain types used throughout Goldbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌─────────────────────┐                │
//! │  │      Purchase       │ 1    * │ SupplierReceiptLine │                │
//! │  │  ─────────────────  │───────►│  ─────────────────  │                │
//! │  │  id, date, storeId  │ by code│  grams18k           │                │
//! │  │  totalGrams (21k)   │        │  grams21k           │                │
//! │  │  baseFees, discount │        │  totalGrams21k      │                │
//! │  │  totalFees (net)    │        └─────────────────────┘                │
//! │  │  dueDate, status    │ 1    * ┌─────────────────────┐                │
//! │  │  payments (totals)  │───────►│      Payment        │                │
//! │  └─────────────────────┘ history│  gramsPaid + karat  │                │
//! │                                 │  feesPaid, note     │                │
//! │                                 └─────────────────────┘                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wire format is camelCase JSON, matching what the mobile frontend sends.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

use crate::karat::{convert, Karat};
use crate::status::days_left;
use crate::units::round_grams;
use crate::{BASE_FEE_PER_GRAM, DEFAULT_DUE_DAYS, HIGH_THRESHOLD, MEDIUM_THRESHOLD};

// =============================================================================
// Pricing Policy
// =============================================================================

/// Constants of the fee schedule that the engine is parameterised over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingPolicy {
    /// Fee per 21k-equivalent gram.
    pub base_fee_per_gram: f64,

    /// Payment term in days.
    pub due_days: i64,

    /// Monthly total at which a month becomes discount eligible.
    pub medium_threshold: u32,

    /// Monthly total at which the high band starts.
    pub high_threshold: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        PricingPolicy {
            base_fee_per_gram: BASE_FEE_PER_GRAM,
            due_days: DEFAULT_DUE_DAYS,
            medium_threshold: MEDIUM_THRESHOLD,
            high_threshold: HIGH_THRESHOLD,
        }
    }
}

impl PricingPolicy {
    /// Due date for a purchase made on `date`.
    ///
    /// A term that overflows the calendar falls back to `date` itself.
    pub fn due_date(&self, date: NaiveDate) -> NaiveDate {
        match Duration::try_days(self.due_days).and_then(|term| date.checked_add_signed(term)) {
            Some(due) => due,
            None => {
                warn!(due_days = self.due_days, %date, "Payment term out of range, due on purchase date");
                date
            }
        }
    }
}

// =============================================================================
// Purchase Status
// =============================================================================

/// Lifecycle status of a purchase, always derived from its totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Nothing paid yet, not past due.
    #[default]
    Pending,
    /// Some grams or fees paid, not past due.
    Partial,
    /// Grams and fees fully settled.
    Paid,
    /// Past the due date and not settled.
    Overdue,
}

// =============================================================================
// Supplier Receipt Line
// =============================================================================

/// Gold received from one supplier within one purchase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SupplierReceiptLine {
    pub grams_18k: f64,
    pub grams_21k: f64,
    /// `grams21k + convert(grams18k)`, rounded to one decimal.
    pub total_grams_21k: f64,
}

impl SupplierReceiptLine {
    /// Builds a line and derives its 21k-equivalent total.
    ///
    /// Invalid gram inputs are clamped to 0 by the converter.
    pub fn new(grams_18k: f64, grams_21k: f64) -> Self {
        let grams_18k = sanitize(grams_18k);
        let grams_21k = sanitize(grams_21k);
        let mut line = SupplierReceiptLine {
            grams_18k,
            grams_21k,
            total_grams_21k: 0.0,
        };
        line.total_grams_21k = round_grams(line.equivalent_21k());
        line
    }

    /// Unrounded 21k-equivalent grams; fee math runs on this value.
    pub fn equivalent_21k(&self) -> f64 {
        convert(self.grams_21k, Karat::K21) + convert(self.grams_18k, Karat::K18)
    }

    /// The same line with `total_grams_21k` re-derived from its parts.
    pub fn refreshed(&self) -> Self {
        SupplierReceiptLine::new(self.grams_18k, self.grams_21k)
    }

    pub fn is_empty(&self) -> bool {
        self.grams_18k <= 0.0 && self.grams_21k <= 0.0
    }
}

fn sanitize(grams: f64) -> f64 {
    if grams.is_finite() && grams >= 0.0 {
        grams
    } else {
        0.0
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Running payment totals of a purchase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTotals {
    /// 21k-equivalent grams paid.
    pub grams_paid: f64,
    pub fees_paid: f64,
}

impl PaymentTotals {
    pub fn has_payments(&self) -> bool {
        self.grams_paid > 0.0 || self.fees_paid > 0.0
    }
}

/// A single payment recorded against a purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Grams in `karat_type` purity, as handed over.
    pub grams_paid: f64,
    pub fees_paid: f64,
    pub karat_type: Karat,
    #[serde(default)]
    pub note: Option<String>,
}

impl Payment {
    /// Grams paid expressed in 21k-equivalent.
    #[inline]
    pub fn grams_21k(&self) -> f64 {
        convert(self.grams_paid, self.karat_type)
    }
}

/// Payment as submitted by the caller; absent amounts mean zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(default)]
    pub grams_paid: Option<f64>,
    #[serde(default)]
    pub fees_paid: Option<f64>,
    pub karat_type: Karat,
    #[serde(default)]
    pub note: Option<String>,
}

impl PaymentRequest {
    /// Turns the request into a payment with a fresh UUID v4 id.
    pub fn into_payment(self) -> Payment {
        Payment {
            id: Uuid::new_v4().to_string(),
            date: self.date,
            grams_paid: self.grams_paid.unwrap_or(0.0),
            fees_paid: self.fees_paid.unwrap_or(0.0),
            karat_type: self.karat_type,
            note: self
                .note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// A jewelry purchase made by a store from one or more suppliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub store_id: String,
    #[serde(default)]
    pub status: PurchaseStatus,
    /// 21k-equivalent grams over all receipt lines, one decimal.
    #[serde(default)]
    pub total_grams: f64,
    #[serde(default)]
    pub base_fees: f64,
    #[serde(default)]
    pub total_discount: f64,
    /// `base_fees - total_discount`; negative is a credit to the store.
    #[serde(default)]
    pub total_fees: f64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    /// Receipt lines keyed by supplier code.
    pub suppliers: BTreeMap<String, SupplierReceiptLine>,
    #[serde(default)]
    pub payments: PaymentTotals,
    #[serde(default)]
    pub payment_history: Vec<Payment>,
}

impl Purchase {
    /// Sum of the line totals, re-derived from the raw grams.
    pub fn derived_total_grams(&self) -> f64 {
        round_grams(
            self.suppliers
                .values()
                .map(|line| line.refreshed().total_grams_21k)
                .sum(),
        )
    }

    /// 21k-equivalent grams still owed.
    pub fn grams_due(&self) -> f64 {
        self.total_grams - self.payments.grams_paid
    }

    /// Fees still owed; negative means overpaid or credited.
    pub fn fees_due(&self) -> f64 {
        self.total_fees - self.payments.fees_paid
    }

    /// True when the purchase date falls in `month` (1-12) of `year`.
    pub fn is_in_month(&self, month: u32, year: i32) -> bool {
        self.date.month() == month && self.date.year() == year
    }

    pub fn dues(&self, today: NaiveDate) -> PurchaseDues {
        PurchaseDues {
            grams_due: self.grams_due(),
            fees_due: self.fees_due(),
            days_left: days_left(self.due_date, today),
        }
    }

    pub fn find_payment(&self, payment_id: &str) -> Option<&Payment> {
        self.payment_history.iter().find(|p| p.id == payment_id)
    }
}

/// What is still owed on a purchase, for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDues {
    pub grams_due: f64,
    pub fees_due: f64,
    /// Negative once the due date has passed.
    pub days_left: i64,
}

// =============================================================================
// Purchase Request
// =============================================================================

/// Grams received from one supplier, as entered in the purchase form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptInput {
    #[serde(default)]
    pub grams_18k: f64,
    #[serde(default)]
    pub grams_21k: f64,
    /// Client-side total; re-derived by the engine.
    #[serde(default)]
    pub total_grams_21k: Option<f64>,
}

/// A purchase-creation (or edit) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub store_id: String,
    pub suppliers: BTreeMap<String, ReceiptInput>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_receipt_line_total() {
        let line = SupplierReceiptLine::new(200.0, 50.0);
        assert_eq!(line.total_grams_21k, 221.4);
        assert!((line.equivalent_21k() - 221.428_571).abs() < 1e-5);
    }

    #[test]
    fn test_receipt_line_clamps_invalid() {
        let line = SupplierReceiptLine::new(-10.0, f64::NAN);
        assert_eq!(line.grams_18k, 0.0);
        assert_eq!(line.grams_21k, 0.0);
        assert!(line.is_empty());
    }

    #[test]
    fn test_receipt_line_camel_case() {
        let line = SupplierReceiptLine::new(21.0, 0.0);
        let json = serde_json::to_value(line).unwrap();
        assert_eq!(json["grams18k"], 21.0);
        assert_eq!(json["totalGrams21k"], 18.0);
    }

    #[test]
    fn test_policy_due_date() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.due_date(date(2025, 5, 10)), date(2025, 6, 9));
    }

    #[test]
    fn test_policy_due_date_out_of_range() {
        for due_days in [9_999_999_999_999, i64::MAX, i64::MIN] {
            let policy = PricingPolicy {
                due_days,
                ..PricingPolicy::default()
            };
            assert_eq!(policy.due_date(date(2025, 5, 1)), date(2025, 5, 1));
        }
    }

    #[test]
    fn test_payment_request_into_payment() {
        let request = PaymentRequest {
            date: date(2025, 5, 1),
            grams_paid: None,
            fees_paid: Some(100.0),
            karat_type: Karat::K21,
            note: Some("  ".to_string()),
        };
        let payment = request.into_payment();
        assert_eq!(payment.grams_paid, 0.0);
        assert_eq!(payment.fees_paid, 100.0);
        assert!(payment.note.is_none());
        assert_eq!(payment.id.len(), 36);
    }

    #[test]
    fn test_status_default() {
        assert_eq!(PurchaseStatus::default(), PurchaseStatus::Pending);
        assert_eq!(
            serde_json::to_string(&PurchaseStatus::Overdue).unwrap(),
            "\"overdue\""
        );
    }
}
