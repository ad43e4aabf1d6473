//! # Error Types
//!
//! Domain-specific error types for goldbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  goldbook-core errors (this file)                                      │
//! │  ├── CoreError        - Not-found and tier management failures         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  goldbook-service errors (separate crate)                              │
//! │  └── ServiceError     - Store / config failures, wraps CoreError       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → Frontend           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Missing discount configuration is deliberately NOT an error: pricing
//! degrades to "no discount" and logs a warning instead.

use thiserror::Error;

use crate::karat::Karat;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Purchase id is not in the current purchase set.
    #[error("Purchase not found: {0}")]
    PurchaseNotFound(String),

    /// Payment id is not in the purchase's payment history.
    #[error("Payment {payment_id} not found on purchase {purchase_id}")]
    PaymentNotFound {
        purchase_id: String,
        payment_id: String,
    },

    /// Supplier code is not configured.
    #[error("Supplier not found: {0}")]
    SupplierNotFound(String),

    /// Tier name is not part of the supplier's schedule for that karat.
    #[error("Tier '{name}' not found for supplier {supplier} ({karat}k)")]
    TierNotFound {
        supplier: String,
        karat: Karat,
        name: String,
    },

    /// Protected tiers may be edited but never removed.
    ///
    /// ## When This Occurs
    /// - Deleting the base (threshold 0) tier the UI seeds for every supplier
    /// - Deleting any tier flagged `isProtected`
    #[error("Tier '{name}' of supplier {supplier} is protected and cannot be deleted")]
    ProtectedTier { supplier: String, name: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are reported to the caller before any state is mutated.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// A payment carrying neither grams nor fees.
    #[error("Payment must include grams or fees")]
    EmptyPayment,

    /// A purchase without a single non-empty receipt line.
    #[error("Purchase must include at least one supplier receipt")]
    EmptyPurchase,

    /// Amount is larger than what is still owed.
    ///
    /// ## User Workflow
    /// ```text
    /// Grams due: 40.0 (21k)
    ///      │
    ///      ▼
    /// Pay 50g of 21k
    ///      │
    ///      ▼
    /// ExceedsDue { field: "gramsPaid", requested: 50.0, due: 40.0 }
    /// ```
    #[error("{field} ({requested:.2}) exceeds amount due ({due:.2})")]
    ExceedsDue {
        field: String,
        requested: f64,
        due: f64,
    },

    /// Invalid format (e.g., unknown karat code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., tier name within a schedule).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
