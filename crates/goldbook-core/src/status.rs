//! # Status Engine
//!
//! Derives the lifecycle status of a purchase from its current totals.
//!
//! ## Priority Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  gramsDue ≤ 0 AND feesDue ≤ 0 ──────────────────────────► PAID         │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │  daysLeft(dueDate) < 0 ─────────────────────────────────► OVERDUE      │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │  gramsPaid > 0 OR feesPaid > 0 ─────────────────────────► PARTIAL      │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │  PENDING                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is remembered between evaluations: reversing a payment on a paid
//! purchase simply yields a non-paid status on the next derivation.

use chrono::NaiveDate;

use crate::types::{Purchase, PurchaseStatus};
use crate::units::is_settled;

/// Whole days from `today` until `due_date`; negative once past due.
///
/// Both sides are calendar dates (midnight), so the ceiling of the
/// fractional difference is the plain day count.
#[inline]
pub fn days_left(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (due_date - today).num_days()
}

/// Derives the status of `purchase` as of `today`.
pub fn derive_status(purchase: &Purchase, today: NaiveDate) -> PurchaseStatus {
    if is_settled(purchase.grams_due()) && is_settled(purchase.fees_due()) {
        return PurchaseStatus::Paid;
    }

    if days_left(purchase.due_date, today) < 0 {
        return PurchaseStatus::Overdue;
    }

    if purchase.payments.has_payments() {
        PurchaseStatus::Partial
    } else {
        PurchaseStatus::Pending
    }
}

/// Re-derives and stores the status; returns it for convenience.
pub fn refresh_status(purchase: &mut Purchase, today: NaiveDate) -> PurchaseStatus {
    purchase.status = derive_status(purchase, today);
    purchase.status
}
