//! # goldbook-core: Pricing & Settlement Engine
//!
//! This crate is the **heart** of Goldbook. It turns mixed-karat gold
//! receipts into priced purchases, resolves supplier discount tiers from the
//! monthly cumulative volume, and keeps purchase status in step with the
//! payments recorded against it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Goldbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile Frontend                              │   │
//! │  │    Purchases ──► Payments ──► Suppliers/Tiers ──► Dashboard     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                goldbook-service (orchestration)                 │   │
//! │  │    create_purchase, add_payment, delete_payment, reprice_month  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ goldbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   karat ──► tiers ──► fees ──► status ──► recalc ◄── ledger     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO GLOBAL STATE • PURE FUNCTIONS          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`karat`] - Karat purity and conversion to the 21k-equivalent unit
//! - [`units`] - Rounding and display helpers for grams and currency
//! - [`tiers`] - Supplier discount schedules and tier resolution
//! - [`fees`] - Base fee, discount and net fee for one purchase
//! - [`status`] - Purchase lifecycle status derivation
//! - [`recalc`] - Month-wide re-pricing and payment-only refresh
//! - [`ledger`] - Applying and reversing payments
//! - [`purchase`] - Building purchases from creation requests
//! - [`summary`] - Month dashboard figures
//! - [`types`] - Domain types (Purchase, Payment, ...)
//! - [`validation`] - Input validation rules
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Explicit inputs**: the monthly total and "today" are always
//!    arguments, never read from ambient state
//! 2. **Graceful pricing**: missing tier configuration means "no discount",
//!    never a failed purchase
//! 3. **Typed errors**: validation and not-found failures are enum variants
//!
//! ## Example Usage
//!
//! ```rust
//! use goldbook_core::karat::{convert, Karat};
//!
//! // 21 grams of 18k gold carry as much gold as 18 grams of 21k.
//! assert_eq!(convert(21.0, Karat::K18), 18.0);
//! assert_eq!(convert(100.0, Karat::K21), 100.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fees;
pub mod karat;
pub mod ledger;
pub mod purchase;
pub mod recalc;
pub mod status;
pub mod summary;
pub mod tiers;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fees::FeeBreakdown;
pub use karat::Karat;
pub use recalc::{MonthAggregate, MonthRecalculation};
pub use summary::MonthSummary;
pub use tiers::{DiscountTier, KaratSchedule, Supplier, SupplierDirectory, ThreeBand};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Fee charged per 21k-equivalent gram in the reference configuration.
pub const BASE_FEE_PER_GRAM: f64 = 5.0;

/// Days between a purchase date and its due date.
pub const DEFAULT_DUE_DAYS: i64 = 30;

/// Longest payment term a configuration may set.
pub const MAX_DUE_DAYS: i64 = 3650;

/// Monthly volume (grams) where the low band starts.
pub const LOW_THRESHOLD: u32 = 0;

/// Monthly volume (grams) where the medium band starts.
///
/// A month at or above this total is reported as discount eligible.
pub const MEDIUM_THRESHOLD: u32 = 500;

/// Monthly volume (grams) where the high band starts.
pub const HIGH_THRESHOLD: u32 = 1000;

/// Slack used when comparing gram and currency amounts that went through
/// floating point sums.
pub const SETTLEMENT_TOLERANCE: f64 = 1e-6;
