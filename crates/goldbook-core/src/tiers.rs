//! # Discount Tiers
//!
//! Supplier discount schedules and tier resolution.
//!
//! ## Step Function
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Supplier EG18, 21k schedule                                            │
//! │                                                                         │
//! │   rate                                                                  │
//! │   34% ┤                              ●━━━━━━━━━━━━━━━                   │
//! │   26% ┤               ●━━━━━━━━━━━━━━○                                  │
//! │   20% ●━━━━━━━━━━━━━━━○                                                 │
//! │       └───────────────┬──────────────┬────────────► monthly grams       │
//! │       0              500           1000                                 │
//! │                                                                         │
//! │  The tier with the HIGHEST threshold not above the monthly total wins. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each supplier carries an independent schedule per karat, each with its
//! own `active` flag. Lookups never fail: an unknown supplier, an inactive
//! or empty schedule, or a malformed percentage all resolve to 0%.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::karat::Karat;
use crate::types::PricingPolicy;
use crate::validation::{validate_supplier_code, validate_tier, validate_tier_set};
use crate::LOW_THRESHOLD;

// =============================================================================
// Discount Tier
// =============================================================================

/// A `(threshold, percentage)` rule within one supplier+karat schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountTier {
    /// Unique within the schedule.
    pub name: String,
    /// Monthly 21k-equivalent grams needed for this tier.
    pub threshold: u32,
    /// Percentage in `[0, 100]`.
    pub discount_percentage: f64,
    /// Protected tiers can be edited but not deleted.
    #[serde(default)]
    pub is_protected: bool,
}

impl DiscountTier {
    pub fn new(name: impl Into<String>, threshold: u32, discount_percentage: f64) -> Self {
        DiscountTier {
            name: name.into(),
            threshold,
            discount_percentage,
            is_protected: false,
        }
    }

    pub fn protected(mut self) -> Self {
        self.is_protected = true;
        self
    }
}

/// Picks the tier with the highest threshold not exceeding `monthly_total`.
///
/// Returns `None` (the zero-discount sentinel) when no tier qualifies.
///
/// ## Example
/// ```rust
/// use goldbook_core::tiers::{resolve_tier, DiscountTier};
///
/// let tiers = vec![
///     DiscountTier::new("Base", 0, 20.0),
///     DiscountTier::new("Silver", 500, 26.0),
///     DiscountTier::new("Gold", 1000, 34.0),
/// ];
/// assert_eq!(resolve_tier(&tiers, 600.0).unwrap().name, "Silver");
/// assert!(resolve_tier(&[], 600.0).is_none());
/// ```
pub fn resolve_tier(tiers: &[DiscountTier], monthly_total: f64) -> Option<&DiscountTier> {
    tiers
        .iter()
        .filter(|tier| f64::from(tier.threshold) <= monthly_total)
        .max_by_key(|tier| tier.threshold)
}

// =============================================================================
// Three Band Shorthand
// =============================================================================

/// The fixed `{low, medium, high}` banding keyed on the policy thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ThreeBand {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl ThreeBand {
    /// Expands the bands into the equivalent generic tier set.
    ///
    /// The low tier sits at threshold 0 and is protected.
    pub fn into_tiers(self, policy: &PricingPolicy) -> Vec<DiscountTier> {
        vec![
            DiscountTier::new("low", LOW_THRESHOLD, self.low).protected(),
            DiscountTier::new("medium", policy.medium_threshold, self.medium),
            DiscountTier::new("high", policy.high_threshold, self.high),
        ]
    }
}

// =============================================================================
// Karat Schedule
// =============================================================================

/// Tier set of one supplier for one karat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct KaratSchedule {
    #[serde(default)]
    pub active: bool,
    /// Kept sorted by threshold.
    #[serde(default)]
    pub tiers: Vec<DiscountTier>,
}

impl KaratSchedule {
    pub fn new(tiers: Vec<DiscountTier>) -> Self {
        let mut schedule = KaratSchedule {
            active: true,
            tiers,
        };
        schedule.sort();
        schedule
    }

    pub fn inactive() -> Self {
        KaratSchedule::default()
    }

    pub fn resolve(&self, monthly_total: f64) -> Option<&DiscountTier> {
        resolve_tier(&self.tiers, monthly_total)
    }

    fn sort(&mut self) {
        self.tiers.sort_by_key(|tier| tier.threshold);
    }
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier and its per-karat discount schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub karat18: KaratSchedule,
    #[serde(default)]
    pub karat21: KaratSchedule,
}

impl Supplier {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Supplier {
            code: code.into(),
            name: name.into(),
            karat18: KaratSchedule::inactive(),
            karat21: KaratSchedule::inactive(),
        }
    }

    pub fn with_schedule(mut self, karat: Karat, schedule: KaratSchedule) -> Self {
        *self.schedule_mut(karat) = schedule;
        self
    }

    pub fn schedule(&self, karat: Karat) -> &KaratSchedule {
        match karat {
            Karat::K18 => &self.karat18,
            Karat::K21 => &self.karat21,
        }
    }

    pub fn schedule_mut(&mut self, karat: Karat) -> &mut KaratSchedule {
        match karat {
            Karat::K18 => &mut self.karat18,
            Karat::K21 => &mut self.karat21,
        }
    }

    /// Karats with an active schedule.
    pub fn active_karats(&self) -> Vec<Karat> {
        Karat::ALL
            .into_iter()
            .filter(|karat| self.schedule(*karat).active)
            .collect()
    }

    /// Enables or disables the schedule of one karat.
    pub fn set_schedule_active(&mut self, karat: Karat, active: bool) {
        self.schedule_mut(karat).active = active;
    }

    /// Adds a tier, rejecting duplicate names or thresholds.
    pub fn add_tier(&mut self, karat: Karat, tier: DiscountTier) -> CoreResult<()> {
        let schedule = self.schedule_mut(karat);
        validate_tier(&tier, &schedule.tiers, None)?;
        schedule.tiers.push(tier);
        schedule.sort();
        Ok(())
    }

    /// Replaces the tier named `name`.
    ///
    /// A protected tier stays protected whatever the update says.
    pub fn update_tier(&mut self, karat: Karat, name: &str, mut tier: DiscountTier) -> CoreResult<()> {
        let supplier = self.code.clone();
        let schedule = self.schedule_mut(karat);
        let index = schedule
            .tiers
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| CoreError::TierNotFound {
                supplier,
                karat,
                name: name.to_string(),
            })?;

        validate_tier(&tier, &schedule.tiers, Some(index))?;
        tier.is_protected |= schedule.tiers[index].is_protected;
        schedule.tiers[index] = tier;
        schedule.sort();
        Ok(())
    }

    /// Removes the tier named `name` unless it is protected.
    pub fn delete_tier(&mut self, karat: Karat, name: &str) -> CoreResult<DiscountTier> {
        let supplier = self.code.clone();
        let schedule = self.schedule_mut(karat);
        let index = schedule
            .tiers
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| CoreError::TierNotFound {
                supplier: supplier.clone(),
                karat,
                name: name.to_string(),
            })?;

        if schedule.tiers[index].is_protected {
            return Err(CoreError::ProtectedTier {
                supplier,
                name: name.to_string(),
            });
        }

        Ok(schedule.tiers.remove(index))
    }
}

// =============================================================================
// Supplier Directory
// =============================================================================

/// All configured suppliers keyed by code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierDirectory {
    suppliers: BTreeMap<String, Supplier>,
}

impl SupplierDirectory {
    pub fn new() -> Self {
        SupplierDirectory::default()
    }

    /// Builds a directory, validating codes and every tier set.
    pub fn from_suppliers(suppliers: impl IntoIterator<Item = Supplier>) -> CoreResult<Self> {
        let mut directory = SupplierDirectory::new();
        for supplier in suppliers {
            directory.insert(supplier)?;
        }
        Ok(directory)
    }

    /// Inserts or replaces a supplier.
    pub fn insert(&mut self, mut supplier: Supplier) -> CoreResult<()> {
        validate_supplier_code(&supplier.code)?;
        for karat in Karat::ALL {
            let schedule = supplier.schedule_mut(karat);
            validate_tier_set(&schedule.tiers)?;
            schedule.sort();
        }
        self.suppliers.insert(supplier.code.clone(), supplier);
        Ok(())
    }

    pub fn remove(&mut self, code: &str) -> CoreResult<Supplier> {
        self.suppliers
            .remove(code)
            .ok_or_else(|| CoreError::SupplierNotFound(code.to_string()))
    }

    pub fn get(&self, code: &str) -> Option<&Supplier> {
        self.suppliers.get(code)
    }

    pub fn get_mut(&mut self, code: &str) -> CoreResult<&mut Supplier> {
        self.suppliers
            .get_mut(code)
            .ok_or_else(|| CoreError::SupplierNotFound(code.to_string()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.suppliers.contains_key(code)
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Supplier> {
        self.suppliers.values()
    }

    /// Discount percentage for `supplier_code` at `monthly_total`.
    ///
    /// Degrades to 0 whenever the configuration cannot answer.
    pub fn discount_rate(&self, supplier_code: &str, karat: Karat, monthly_total: f64) -> f64 {
        let Some(supplier) = self.suppliers.get(supplier_code) else {
            warn!(supplier = supplier_code, "No discount configuration for supplier");
            return 0.0;
        };

        let schedule = supplier.schedule(karat);
        if !schedule.active || schedule.tiers.is_empty() {
            debug!(supplier = supplier_code, karat = %karat, "Schedule inactive or empty");
            return 0.0;
        }

        match schedule.resolve(monthly_total) {
            Some(tier) => {
                let rate = tier.discount_percentage;
                if rate.is_finite() && (0.0..=100.0).contains(&rate) {
                    rate
                } else {
                    warn!(
                        supplier = supplier_code,
                        tier = %tier.name,
                        rate,
                        "Malformed discount percentage, using 0"
                    );
                    0.0
                }
            }
            None => 0.0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
