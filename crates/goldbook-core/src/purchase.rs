//! # Purchase Builder
//!
//! Turns purchase-creation and edit requests into priced purchases.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE                                                              │
//! │     └── build_purchase(request) → Purchase { id: UUID v4, Pending }     │
//! │                                                                         │
//! │  2. RE-PRICE THE MONTH                                                  │
//! │     └── recalc::recalculate_month(month of purchase.date)               │
//! │                                                                         │
//! │  3. (OPTIONAL) EDIT                                                     │
//! │     └── edit_purchase(existing, request) → same id, same payments       │
//! │     └── re-price the old AND the new month                              │
//! │                                                                         │
//! │  4. (OPTIONAL) DELETE (caller) → re-price the month it left             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A freshly built purchase is priced against its own grams only; the month
//! pass that always follows puts it on the right tier.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::recalc::reprice_purchase;
use crate::tiers::SupplierDirectory;
use crate::types::{
    PaymentTotals, PricingPolicy, Purchase, PurchaseRequest, PurchaseStatus, SupplierReceiptLine,
};
use crate::units::round_grams;
use crate::validation::validate_purchase_request;

/// Derives receipt lines from a request, dropping empty ones.
///
/// A client-side `totalGrams21k` that disagrees with the derived total is
/// logged and overridden.
pub fn receipt_lines(request: &PurchaseRequest) -> BTreeMap<String, SupplierReceiptLine> {
    request
        .suppliers
        .iter()
        .map(|(code, input)| {
            let line = SupplierReceiptLine::new(input.grams_18k, input.grams_21k);
            if let Some(client_total) = input.total_grams_21k {
                if (round_grams(client_total) - line.total_grams_21k).abs() > 0.05 {
                    warn!(
                        supplier = %code,
                        client_total,
                        derived = line.total_grams_21k,
                        "Client 21k total disagrees, using derived value"
                    );
                }
            }
            (code.trim().to_string(), line)
        })
        .filter(|(_, line)| !line.is_empty())
        .collect()
}

/// Validates `request` and builds a new purchase with a fresh id.
pub fn build_purchase(
    request: &PurchaseRequest,
    directory: &SupplierDirectory,
    policy: &PricingPolicy,
    today: NaiveDate,
) -> CoreResult<Purchase> {
    validate_purchase_request(request, directory)?;

    let draft = Purchase {
        id: Uuid::new_v4().to_string(),
        date: request.date,
        store_id: request.store_id.trim().to_string(),
        status: PurchaseStatus::Pending,
        total_grams: 0.0,
        base_fees: 0.0,
        total_discount: 0.0,
        total_fees: 0.0,
        due_date: policy.due_date(request.date),
        suppliers: receipt_lines(request),
        payments: PaymentTotals::default(),
        payment_history: Vec::new(),
    };

    let own_total = draft.derived_total_grams();
    let purchase = reprice_purchase(&draft, own_total, directory, policy, today);
    debug!(id = %purchase.id, total_grams = purchase.total_grams, "Purchase built");
    Ok(purchase)
}

/// Applies an edit request to `existing`, keeping its id and payments.
pub fn edit_purchase(
    existing: &Purchase,
    request: &PurchaseRequest,
    directory: &SupplierDirectory,
    policy: &PricingPolicy,
    today: NaiveDate,
) -> CoreResult<Purchase> {
    validate_purchase_request(request, directory)?;

    let mut edited = existing.clone();
    edited.date = request.date;
    edited.store_id = request.store_id.trim().to_string();
    edited.suppliers = receipt_lines(request);

    let own_total = edited.derived_total_grams();
    Ok(reprice_purchase(&edited, own_total, directory, policy, today))
}

// =============================================================================
// Unit Tests
// =============================================================================
