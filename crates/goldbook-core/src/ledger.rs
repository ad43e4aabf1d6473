//! # Settlement Ledger
//!
//! Applies and reverses payments against a purchase's running totals.
//!
//! ## Payment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PaymentRequest ──► validate_payment ──► history.push(payment)          │
//! │                         │                      │                        │
//! │                         ▼                      ▼                        │
//! │                  EmptyPayment /         totals = fold(history)          │
//! │                  ExceedsDue             (grams in 21k-equivalent)       │
//! │                                                │                        │
//! │                                                ▼                        │
//! │                                         refresh_status                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Running totals are always re-folded from the history in insertion order,
//! so they never drift from it and reversing the latest payment restores
//! the previous totals bit for bit.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::status::refresh_status;
use crate::types::{Payment, PaymentRequest, PaymentTotals, Purchase};
use crate::validation::validate_payment;

/// Totals implied by a payment history.
pub fn totals_from_history(history: &[Payment]) -> PaymentTotals {
    history
        .iter()
        .fold(PaymentTotals::default(), |mut totals, payment| {
            totals.grams_paid += payment.grams_21k();
            totals.fees_paid += payment.fees_paid;
            totals
        })
}

/// Records `payment` on `purchase` and refreshes its status.
///
/// ## Errors
/// - `ValidationError::EmptyPayment` when neither grams nor fees are paid
/// - `ValidationError::ExceedsDue` when grams exceed what is still owed
/// - `ValidationError::Duplicate` when the payment id is already recorded
///
/// The purchase is untouched on error.
pub fn apply_payment(purchase: &mut Purchase, payment: Payment, today: NaiveDate) -> CoreResult<()> {
    validate_payment(purchase, &payment)?;

    if purchase.find_payment(&payment.id).is_some() {
        return Err(ValidationError::Duplicate {
            field: "payment id".to_string(),
            value: payment.id,
        }
        .into());
    }

    info!(
        purchase_id = %purchase.id,
        payment_id = %payment.id,
        grams = payment.grams_paid,
        karat = %payment.karat_type,
        fees = payment.fees_paid,
        "Applying payment"
    );

    purchase.payment_history.push(payment);
    purchase.payments = totals_from_history(&purchase.payment_history);
    let status = refresh_status(purchase, today);

    debug!(purchase_id = %purchase.id, ?status, "Status after payment");
    Ok(())
}

/// Builds a payment from `request` and applies it.
///
/// Returns the recorded payment, including its generated id.
pub fn apply_payment_request(
    purchase: &mut Purchase,
    request: PaymentRequest,
    today: NaiveDate,
) -> CoreResult<Payment> {
    let payment = request.into_payment();
    apply_payment(purchase, payment.clone(), today)?;
    Ok(payment)
}

/// Removes payment `payment_id` from `purchase` and refreshes its status.
///
/// Returns the removed payment; `PaymentNotFound` leaves the purchase as is.
pub fn reverse_payment(
    purchase: &mut Purchase,
    payment_id: &str,
    today: NaiveDate,
) -> CoreResult<Payment> {
    let index = purchase
        .payment_history
        .iter()
        .position(|p| p.id == payment_id)
        .ok_or_else(|| CoreError::PaymentNotFound {
            purchase_id: purchase.id.clone(),
            payment_id: payment_id.to_string(),
        })?;

    let removed = purchase.payment_history.remove(index);
    purchase.payments = totals_from_history(&purchase.payment_history);
    let status = refresh_status(purchase, today);

    info!(
        purchase_id = %purchase.id,
        payment_id,
        ?status,
        "Payment reversed"
    );
    Ok(removed)
}

// =============================================================================
// Unit Tests
// =============================================================================
