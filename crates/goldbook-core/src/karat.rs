//! # Karat Module
//!
//! Converts karat-denominated gram quantities into the canonical
//! 21k-equivalent unit.
//!
//! ## Why a Canonical Unit?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Suppliers deliver a mix of 18k and 21k gold. Discount thresholds and   │
//! │  monthly totals must compare like with like, so every gram is scaled    │
//! │  to the amount of 21k gold holding the same fine gold:                  │
//! │                                                                         │
//! │    21k grams ──────────────► unchanged                                  │
//! │    18k grams ──► × 18/21 ──► 21k-equivalent                             │
//! │                                                                         │
//! │    21g of 18k  ==  18g of 21k                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Karat
// =============================================================================

/// Gold purity handled by the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Karat {
    #[serde(rename = "18")]
    K18,
    #[serde(rename = "21")]
    K21,
}

impl Karat {
    /// Both supported purities, lowest first.
    pub const ALL: [Karat; 2] = [Karat::K18, Karat::K21];

    /// Purity in karats.
    #[inline]
    pub const fn purity(&self) -> u32 {
        match self {
            Karat::K18 => 18,
            Karat::K21 => 21,
        }
    }

    /// Wire code used by the frontend (`"18"` / `"21"`).
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Karat::K18 => "18",
            Karat::K21 => "21",
        }
    }
}

impl fmt::Display for Karat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Karat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches(['k', 'K']) {
            "18" => Ok(Karat::K18),
            "21" => Ok(Karat::K21),
            other => Err(ValidationError::InvalidFormat {
                field: "karatType".to_string(),
                reason: format!("unknown karat '{}', expected 18 or 21", other),
            }),
        }
    }
}

// =============================================================================
// Grams Quantity
// =============================================================================

/// A gram amount tagged with the purity it was weighed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GramsQuantity {
    pub grams: f64,
    pub karat: Karat,
}

impl GramsQuantity {
    pub const fn new(grams: f64, karat: Karat) -> Self {
        GramsQuantity { grams, karat }
    }

    /// The same amount of fine gold expressed in 21k grams.
    #[inline]
    pub fn to_21k(&self) -> f64 {
        convert(self.grams, self.karat)
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Converts `grams` of `karat` gold into 21k-equivalent grams.
///
/// ## Rules
/// - 21k is returned unchanged
/// - 18k is scaled by 18/21
/// - Negative, NaN or infinite input is logged and treated as 0
///
/// ## Example
/// ```rust
/// use goldbook_core::karat::{convert, Karat};
///
/// assert_eq!(convert(21.0, Karat::K18), 18.0);
/// assert_eq!(convert(-3.0, Karat::K21), 0.0);
/// ```
pub fn convert(grams: f64, karat: Karat) -> f64 {
    if !grams.is_finite() || grams < 0.0 {
        warn!(grams, karat = %karat, "Invalid gram quantity, using 0");
        return 0.0;
    }

    match karat {
        Karat::K21 => grams,
        // Multiply first: 21 × 18 / 21 is exactly 18.
        Karat::K18 => grams * 18.0 / 21.0,
    }
}

/// Converts grams tagged with a raw karat code from an untyped boundary.
///
/// Unknown codes are logged and the grams are taken as already 21k. Callers
/// should validate the code upstream with [`Karat::from_str`].
pub fn convert_code(grams: f64, karat_code: &str) -> f64 {
    match karat_code.parse::<Karat>() {
        Ok(karat) => convert(grams, karat),
        Err(_) => {
            warn!(karat_code, "Unknown karat code, treating grams as 21k");
            convert(grams, Karat::K21)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_known_values() {
        assert_eq!(convert(21.0, Karat::K18), 18.0);
        assert_eq!(convert(100.0, Karat::K21), 100.0);
        assert!((convert(200.0, Karat::K18) - 171.428_571).abs() < 1e-5);
    }

    #[test]
    fn test_convert_rejects_invalid_grams() {
        assert_eq!(convert(-1.0, Karat::K18), 0.0);
        assert_eq!(convert(f64::NAN, Karat::K21), 0.0);
        assert_eq!(convert(f64::INFINITY, Karat::K18), 0.0);
    }

    #[test]
    fn test_convert_code_falls_back_to_21k() {
        assert_eq!(convert_code(10.0, "24"), 10.0);
        assert_eq!(convert_code(21.0, "18"), 18.0);
        assert_eq!(convert_code(-5.0, "bogus"), 0.0);
    }

    #[test]
    fn test_karat_parse_and_display() {
        assert_eq!("18".parse::<Karat>().unwrap(), Karat::K18);
        assert_eq!("21k".parse::<Karat>().unwrap(), Karat::K21);
        assert!("22".parse::<Karat>().is_err());
        assert_eq!(Karat::K18.to_string(), "18");
    }

    #[test]
    fn test_karat_serde_codes() {
        assert_eq!(serde_json::to_string(&Karat::K21).unwrap(), "\"21\"");
        let karat: Karat = serde_json::from_str("\"18\"").unwrap();
        assert_eq!(karat, Karat::K18);
    }

    #[test]
    fn test_grams_quantity_to_21k() {
        let quantity = GramsQuantity::new(42.0, Karat::K18);
        assert_eq!(quantity.to_21k(), 36.0);
    }
}
