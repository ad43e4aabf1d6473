//! # Units Module
//!
//! Rounding and display helpers for gram and currency amounts.
//!
//! ## Rounding Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Grams     → stored totals rounded to 1 decimal (171.428… → 171.4)     │
//! │  Currency  → NEVER rounded during calculation                           │
//! │              rounded to 2 decimals for display only (857.142… → 857.14) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding is half away from zero, the behavior of [`f64::round`].

/// Rounds a gram amount to one decimal place.
///
/// ## Example
/// ```rust
/// use goldbook_core::units::round_grams;
///
/// assert_eq!(round_grams(171.428_571), 171.4);
/// assert_eq!(round_grams(0.05), 0.1);
/// ```
#[inline]
pub fn round_grams(grams: f64) -> f64 {
    (grams * 10.0).round() / 10.0
}

/// Rounds a currency amount to two decimal places (display only).
#[inline]
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Formats grams for display, e.g. `"171.4g"`.
pub fn format_grams(grams: f64) -> String {
    format!("{:.1}g", round_grams(grams))
}

/// Formats a currency amount for display, e.g. `"-12.50"`.
///
/// Negative values are net credits to the store and keep their sign.
pub fn format_currency(amount: f64) -> String {
    let rounded = round_currency(amount);
    // Avoid printing "-0.00" for tiny negative remainders.
    if rounded == 0.0 {
        return "0.00".to_string();
    }
    format!("{:.2}", rounded)
}

/// True when `value` is zero or below, allowing for float noise.
#[inline]
pub fn is_settled(value: f64) -> bool {
    value <= crate::SETTLEMENT_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_grams() {
        assert_eq!(round_grams(171.428_571), 171.4);
        assert_eq!(round_grams(99.96), 100.0);
        assert_eq!(round_grams(0.0), 0.0);
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(857.142_857), 857.14);
        assert_eq!(round_currency(-44.571_4), -44.57);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_grams(171.428_571), "171.4g");
        assert_eq!(format_currency(812.571_428), "812.57");
        assert_eq!(format_currency(-12.5), "-12.50");
        assert_eq!(format_currency(-0.001), "0.00");
    }

    #[test]
    fn test_is_settled() {
        assert!(is_settled(0.0));
        assert!(is_settled(-3.0));
        assert!(is_settled(1e-12));
        assert!(!is_settled(0.1));
    }
}
