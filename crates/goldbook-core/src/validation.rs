//! # Validation Module
//!
//! Input validation for purchases, payments and tier configuration.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Mobile frontend                                               │
//! │  ├── Basic format checks (empty, numeric)                               │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Business rules (grams due, tier uniqueness)                        │
//! │  └── Runs BEFORE any purchase or schedule is mutated                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: ValidationReport { valid, error } back to the dialog layer    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::tiers::{DiscountTier, SupplierDirectory};
use crate::types::{Payment, Purchase, PurchaseRequest};
use crate::units::round_grams;
use crate::SETTLEMENT_TOLERANCE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Validation Report
// =============================================================================

/// Caller-facing outcome of a validation, rendered as a dialog by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        ValidationReport {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ValidationReport {
            valid: false,
            error: Some(message.into()),
        }
    }
}

impl<T> From<&ValidationResult<T>> for ValidationReport {
    fn from(result: &ValidationResult<T>) -> Self {
        match result {
            Ok(_) => ValidationReport::ok(),
            Err(err) => ValidationReport::invalid(err.to_string()),
        }
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a gram or currency amount: finite and not negative.
///
/// ## Example
/// ```rust
/// use goldbook_core::validation::validate_amount;
///
/// assert!(validate_amount("grams18k", 12.5).is_ok());
/// assert!(validate_amount("grams18k", -1.0).is_err());
/// assert!(validate_amount("grams18k", f64::NAN).is_err());
/// ```
pub fn validate_amount(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a discount percentage (0-100 inclusive).
pub fn validate_percentage(value: f64) -> ValidationResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "discountPercentage".to_string(),
            min: 0.0,
            max: 100.0,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a store id: present after trimming.
pub fn validate_store_id(store_id: &str) -> ValidationResult<()> {
    if store_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "storeId".to_string(),
        });
    }

    Ok(())
}

/// Validates a supplier code.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use goldbook_core::validation::validate_supplier_code;
///
/// assert!(validate_supplier_code("EG18").is_ok());
/// assert!(validate_supplier_code("").is_err());
/// assert!(validate_supplier_code("has space").is_err());
/// ```
pub fn validate_supplier_code(code: &str) -> ValidationResult<()> {
    if code.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "supplier code".to_string(),
        });
    }

    if code.len() > 20 {
        return Err(ValidationError::InvalidFormat {
            field: "supplier code".to_string(),
            reason: "must be at most 20 characters".to_string(),
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "supplier code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Tier Validators
// =============================================================================

/// Validates `tier` against the other tiers of its schedule.
///
/// `replacing` is the index of the tier being edited, which is excluded from
/// the uniqueness checks.
pub fn validate_tier(
    tier: &DiscountTier,
    existing: &[DiscountTier],
    replacing: Option<usize>,
) -> ValidationResult<()> {
    if tier.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "tier name".to_string(),
        });
    }
    validate_percentage(tier.discount_percentage)?;

    let others = existing
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != replacing)
        .map(|(_, other)| other);

    for other in others {
        if other.name == tier.name {
            return Err(ValidationError::Duplicate {
                field: "tier name".to_string(),
                value: tier.name.clone(),
            });
        }
        if other.threshold == tier.threshold {
            return Err(ValidationError::Duplicate {
                field: "tier threshold".to_string(),
                value: tier.threshold.to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a whole tier set as loaded from configuration.
pub fn validate_tier_set(tiers: &[DiscountTier]) -> ValidationResult<()> {
    for (index, tier) in tiers.iter().enumerate() {
        validate_tier(tier, &tiers[..index], None)?;
    }
    Ok(())
}

// =============================================================================
// Purchase & Payment Validators
// =============================================================================

/// Validates a purchase-creation request.
///
/// ## Rules
/// - Store id present
/// - Every supplier code known to the directory
/// - Gram amounts finite and non-negative
/// - At least one line with grams
pub fn validate_purchase_request(
    request: &PurchaseRequest,
    directory: &SupplierDirectory,
) -> ValidationResult<()> {
    validate_store_id(&request.store_id)?;

    let mut has_grams = false;
    for (code, input) in &request.suppliers {
        validate_supplier_code(code)?;
        if !directory.contains(code) {
            return Err(ValidationError::InvalidFormat {
                field: "supplier".to_string(),
                reason: format!("unknown supplier '{}'", code),
            });
        }
        validate_amount("grams18k", input.grams_18k)?;
        validate_amount("grams21k", input.grams_21k)?;
        has_grams |= input.grams_18k > 0.0 || input.grams_21k > 0.0;
    }

    if !has_grams {
        return Err(ValidationError::EmptyPurchase);
    }

    Ok(())
}

/// Validates a payment against the purchase it settles.
///
/// ## Rules
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  gramsPaid == 0 AND feesPaid == 0   → EmptyPayment                     │
/// │  convert(gramsPaid) > gramsDue      → ExceedsDue (grams)               │
/// │  feesPaid > feesDue                 → ALLOWED (overpayment = credit)   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// `total_grams` is stored at one decimal, so the converted payment is
/// rounded the same way before the comparison. Repaying exactly the 18k
/// grams received (200g → 171.43g against a 171.4g total) is accepted.
pub fn validate_payment(purchase: &Purchase, payment: &Payment) -> ValidationResult<()> {
    validate_amount("gramsPaid", payment.grams_paid)?;
    validate_amount("feesPaid", payment.fees_paid)?;

    if payment.grams_paid <= 0.0 && payment.fees_paid <= 0.0 {
        return Err(ValidationError::EmptyPayment);
    }

    let grams = payment.grams_21k();
    let grams_due = purchase.grams_due().max(0.0);
    if round_grams(grams) > grams_due + SETTLEMENT_TOLERANCE {
        return Err(ValidationError::ExceedsDue {
            field: "gramsPaid".to_string(),
            requested: grams,
            due: grams_due,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::karat::Karat;
    use crate::tiers::{KaratSchedule, Supplier};
    use crate::types::{PaymentTotals, PurchaseStatus, ReceiptInput, SupplierReceiptLine};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 10).unwrap()
    }

    fn directory() -> SupplierDirectory {
        SupplierDirectory::from_suppliers([Supplier::new("EG18", "Egypt Gold")
            .with_schedule(Karat::K21, KaratSchedule::new(vec![DiscountTier::new("Base", 0, 20.0)]))])
        .unwrap()
    }

    fn purchase(total_grams: f64, grams_paid: f64) -> Purchase {
        let mut suppliers = BTreeMap::new();
        suppliers.insert("EG18".to_string(), SupplierReceiptLine::new(0.0, total_grams));
        Purchase {
            id: "p-1".to_string(),
            date: date(),
            store_id: "store-1".to_string(),
            status: PurchaseStatus::Pending,
            total_grams,
            base_fees: total_grams * 5.0,
            total_discount: 0.0,
            total_fees: total_grams * 5.0,
            due_date: date(),
            suppliers,
            payments: PaymentTotals {
                grams_paid,
                fees_paid: 0.0,
            },
            payment_history: Vec::new(),
        }
    }

    fn payment(grams: f64, fees: f64, karat: Karat) -> Payment {
        Payment {
            id: "pay-1".to_string(),
            date: date(),
            grams_paid: grams,
            fees_paid: fees,
            karat_type: karat,
            note: None,
        }
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage(0.0).is_ok());
        assert!(validate_percentage(100.0).is_ok());
        assert!(validate_percentage(100.1).is_err());
        assert!(validate_percentage(-1.0).is_err());
        assert!(validate_percentage(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_tier_uniqueness() {
        let existing = vec![DiscountTier::new("Base", 0, 20.0), DiscountTier::new("Silver", 500, 26.0)];

        assert!(validate_tier(&DiscountTier::new("Gold", 1000, 34.0), &existing, None).is_ok());
        assert!(validate_tier(&DiscountTier::new("Silver", 700, 30.0), &existing, None).is_err());
        assert!(validate_tier(&DiscountTier::new("Other", 500, 30.0), &existing, None).is_err());
        assert!(validate_tier(&DiscountTier::new("Silver", 550, 27.0), &existing, Some(1)).is_ok());
        assert!(validate_tier(&DiscountTier::new(" ", 700, 27.0), &existing, None).is_err());
    }

    #[test]
    fn test_validate_purchase_request() {
        let mut suppliers = BTreeMap::new();
        suppliers.insert(
            "EG18".to_string(),
            ReceiptInput {
                grams_18k: 200.0,
                ..Default::default()
            },
        );
        let mut request = PurchaseRequest {
            date: date(),
            store_id: "store-1".to_string(),
            suppliers,
        };
        assert!(validate_purchase_request(&request, &directory()).is_ok());

        request.store_id = "  ".to_string();
        assert!(matches!(
            validate_purchase_request(&request, &directory()),
            Err(ValidationError::Required { .. })
        ));

        request.store_id = "store-1".to_string();
        request.suppliers.insert("NOPE".to_string(), ReceiptInput::default());
        assert!(validate_purchase_request(&request, &directory()).is_err());

        request.suppliers.clear();
        assert!(matches!(
            validate_purchase_request(&request, &directory()),
            Err(ValidationError::EmptyPurchase)
        ));
    }

    #[test]
    fn test_validate_payment_rules() {
        let purchase = purchase(100.0, 60.0);

        assert!(matches!(
            validate_payment(&purchase, &payment(0.0, 0.0, Karat::K21)),
            Err(ValidationError::EmptyPayment)
        ));
        assert!(validate_payment(&purchase, &payment(40.0, 0.0, Karat::K21)).is_ok());
        assert!(matches!(
            validate_payment(&purchase, &payment(41.0, 0.0, Karat::K21)),
            Err(ValidationError::ExceedsDue { .. })
        ));
        // 46.6g of 18k is under 40g of 21k.
        assert!(validate_payment(&purchase, &payment(46.6, 0.0, Karat::K18)).is_ok());
        // Fees may exceed what is due.
        assert!(validate_payment(&purchase, &payment(0.0, 10_000.0, Karat::K21)).is_ok());
        assert!(validate_payment(&purchase, &payment(-1.0, 5.0, Karat::K21)).is_err());
    }

    #[test]
    fn test_validate_payment_matches_received_18k_grams() {
        // 200g of 18k was received and stored as 171.4g of 21k.
        let purchase = purchase(171.4, 0.0);
        assert!(validate_payment(&purchase, &payment(200.0, 0.0, Karat::K18)).is_ok());

        let err = validate_payment(&purchase, &payment(200.2, 0.0, Karat::K18));
        assert!(matches!(err, Err(ValidationError::ExceedsDue { .. })));
    }

    #[test]
    fn test_validation_report() {
        let ok: ValidationResult<()> = Ok(());
        assert_eq!(ValidationReport::from(&ok), ValidationReport::ok());

        let err: ValidationResult<()> = Err(ValidationError::EmptyPayment);
        let report = ValidationReport::from(&err);
        assert!(!report.valid);
        assert_eq!(report.error.as_deref(), Some("Payment must include grams or fees"));

        let json = serde_json::to_value(ValidationReport::ok()).unwrap();
        assert_eq!(json, serde_json::json!({ "valid": true }));
    }
}
