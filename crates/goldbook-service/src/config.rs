//! # Goldbook Configuration
//!
//! Pricing constants and supplier discount schedules.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     GOLDBOOK_BASE_FEE_PER_GRAM=5.5                                     │
//! │     GOLDBOOK_DUE_DAYS=45                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $GOLDBOOK_CONFIG, or                                               │
//! │     ~/.config/goldbook/goldbook.toml (Linux)                           │
//! │     ~/Library/Application Support/com.goldbook.goldbook/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     5.0 per gram, 30 day term, bands at 0 / 500 / 1000 g               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [pricing]
//! base_fee_per_gram = 5.0
//! due_days = 30
//! medium_threshold = 500
//! high_threshold = 1000
//!
//! [[suppliers]]
//! code = "EG18"
//! name = "Egypt Gold"
//!
//! [suppliers.karat21]
//! active = true
//! tiers = [
//!     { name = "Base", threshold = 0, percentage = 20.0, protected = true },
//!     { name = "Silver", threshold = 500, percentage = 26.0 },
//!     { name = "Gold", threshold = 1000, percentage = 34.0 },
//! ]
//!
//! [suppliers.karat18]
//! bands = { low = 10.0, medium = 15.0, high = 20.0 }
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use goldbook_core::{
    DiscountTier, Karat, KaratSchedule, PricingPolicy, Supplier, SupplierDirectory, ThreeBand,
    BASE_FEE_PER_GRAM, DEFAULT_DUE_DAYS, HIGH_THRESHOLD, MAX_DUE_DAYS, MEDIUM_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "GOLDBOOK_CONFIG";

// =============================================================================
// Pricing Settings
// =============================================================================

/// The `[pricing]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSettings {
    #[serde(default = "default_base_fee")]
    pub base_fee_per_gram: f64,

    #[serde(default = "default_due_days")]
    pub due_days: i64,

    /// Monthly grams where the medium band starts; also the eligibility line.
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: u32,

    #[serde(default = "default_high_threshold")]
    pub high_threshold: u32,
}

fn default_base_fee() -> f64 {
    BASE_FEE_PER_GRAM
}

fn default_due_days() -> i64 {
    DEFAULT_DUE_DAYS
}

fn default_medium_threshold() -> u32 {
    MEDIUM_THRESHOLD
}

fn default_high_threshold() -> u32 {
    HIGH_THRESHOLD
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            base_fee_per_gram: default_base_fee(),
            due_days: default_due_days(),
            medium_threshold: default_medium_threshold(),
            high_threshold: default_high_threshold(),
        }
    }
}

impl PricingSettings {
    pub fn policy(&self) -> PricingPolicy {
        PricingPolicy {
            base_fee_per_gram: self.base_fee_per_gram,
            due_days: self.due_days,
            medium_threshold: self.medium_threshold,
            high_threshold: self.high_threshold,
        }
    }
}

// =============================================================================
// Supplier Settings
// =============================================================================

/// One `[[suppliers]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierConfig {
    pub code: String,

    #[serde(default)]
    pub name: String,

    /// Absent means the 18k schedule is inactive.
    #[serde(default)]
    pub karat18: Option<ScheduleConfig>,

    #[serde(default)]
    pub karat21: Option<ScheduleConfig>,
}

/// A karat schedule, as explicit tiers or as the three-band shorthand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub tiers: Vec<TierConfig>,

    /// Mutually exclusive with `tiers`.
    #[serde(default)]
    pub bands: Option<ThreeBand>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    pub threshold: u32,
    pub percentage: f64,
    #[serde(default)]
    pub protected: bool,
}

impl ScheduleConfig {
    fn to_schedule(&self, policy: &PricingPolicy) -> Result<KaratSchedule, ConfigError> {
        let tiers = match (&self.bands, self.tiers.is_empty()) {
            (Some(_), false) => {
                return Err(ConfigError::Invalid(
                    "a schedule takes either `tiers` or `bands`, not both".into(),
                ))
            }
            (Some(bands), true) => bands.into_tiers(policy),
            (None, _) => self
                .tiers
                .iter()
                .map(|t| {
                    let tier = DiscountTier::new(t.name.clone(), t.threshold, t.percentage);
                    if t.protected {
                        tier.protected()
                    } else {
                        tier
                    }
                })
                .collect(),
        };

        let mut schedule = KaratSchedule::new(tiers);
        schedule.active = self.active;
        Ok(schedule)
    }
}

impl SupplierConfig {
    /// Converts the entry into an engine supplier.
    pub fn to_supplier(&self, policy: &PricingPolicy) -> Result<Supplier, ConfigError> {
        let mut supplier = Supplier::new(self.code.trim(), self.name.clone());
        for (karat, schedule) in [(Karat::K18, &self.karat18), (Karat::K21, &self.karat21)] {
            if let Some(schedule) = schedule {
                let schedule = schedule.to_schedule(policy).map_err(|e| {
                    ConfigError::Invalid(format!("supplier {} ({}k): {}", self.code, karat, e))
                })?;
                supplier = supplier.with_schedule(karat, schedule);
            }
        }
        Ok(supplier)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Goldbook configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoldbookConfig {
    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub suppliers: Vec<SupplierConfig>,
}

impl GoldbookConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, `$GOLDBOOK_CONFIG`, platform dir)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading goldbook config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load goldbook config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Goldbook config saved");
        Ok(())
    }

    /// Validates the configuration, including every tier set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pricing = &self.pricing;
        if !pricing.base_fee_per_gram.is_finite() || pricing.base_fee_per_gram <= 0.0 {
            return Err(ConfigError::Invalid(
                "base_fee_per_gram must be a positive number".into(),
            ));
        }
        if !(0..=MAX_DUE_DAYS).contains(&pricing.due_days) {
            return Err(ConfigError::Invalid(format!(
                "due_days must be between 0 and {}, got {}",
                MAX_DUE_DAYS, pricing.due_days
            )));
        }
        if pricing.medium_threshold > pricing.high_threshold {
            return Err(ConfigError::Invalid(format!(
                "medium_threshold ({}) must not exceed high_threshold ({})",
                pricing.medium_threshold, pricing.high_threshold
            )));
        }

        let mut seen = HashSet::new();
        for supplier in &self.suppliers {
            if !seen.insert(supplier.code.trim()) {
                return Err(ConfigError::Invalid(format!(
                    "supplier {} is configured twice",
                    supplier.code
                )));
            }
        }

        self.directory().map(|_| ())
    }

    /// Applies overrides read through `var`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(fee) = var("GOLDBOOK_BASE_FEE_PER_GRAM") {
            match fee.parse::<f64>() {
                Ok(fee) => {
                    debug!(fee, "Overriding base fee from environment");
                    self.pricing.base_fee_per_gram = fee;
                }
                Err(_) => warn!(value = %fee, "Ignoring unparseable GOLDBOOK_BASE_FEE_PER_GRAM"),
            }
        }

        if let Some(days) = var("GOLDBOOK_DUE_DAYS") {
            match days.parse::<i64>() {
                Ok(days) => {
                    debug!(days, "Overriding payment term from environment");
                    self.pricing.due_days = days;
                }
                Err(_) => warn!(value = %days, "Ignoring unparseable GOLDBOOK_DUE_DAYS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "goldbook", "goldbook")
            .map(|dirs| dirs.config_dir().join("goldbook.toml"))
    }

    // =========================================================================
    // Engine Inputs
    // =========================================================================

    pub fn policy(&self) -> PricingPolicy {
        self.pricing.policy()
    }

    /// Builds the supplier directory the pricing engine reads.
    pub fn directory(&self) -> Result<SupplierDirectory, ConfigError> {
        let policy = self.policy();
        let suppliers = self
            .suppliers
            .iter()
            .map(|s| s.to_supplier(&policy))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SupplierDirectory::from_suppliers(suppliers)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
[pricing]
base_fee_per_gram = 5.0
medium_threshold = 400

[[suppliers]]
code = "EG18"
name = "Egypt Gold"

[suppliers.karat21]
tiers = [
    { name = "Base", threshold = 0, percentage = 20.0, protected = true },
    { name = "Gold", threshold = 1000, percentage = 34.0 },
    { name = "Silver", threshold = 500, percentage = 26.0 },
]

[suppliers.karat18]
active = false
bands = { low = 10.0, medium = 15.0, high = 20.0 }
"#;

    #[test]
    fn test_default_config() {
        let config = GoldbookConfig::default();
        assert_eq!(config.policy(), PricingPolicy::default());
        assert!(config.suppliers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = GoldbookConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.pricing.medium_threshold, 400);
        assert_eq!(config.pricing.due_days, 30);
        config.validate().unwrap();

        let directory = config.directory().unwrap();
        let eg18 = directory.get("EG18").unwrap();
        assert_eq!(eg18.name, "Egypt Gold");
        assert!(eg18.karat21.active);
        assert_eq!(eg18.karat21.tiers[1].name, "Silver");
        assert!(eg18.karat21.tiers[0].is_protected);
        assert_eq!(directory.discount_rate("EG18", Karat::K21, 600.0), 26.0);

        // Bands expand on the configured thresholds but stay inactive.
        assert!(!eg18.karat18.active);
        assert_eq!(eg18.karat18.tiers[1].threshold, 400);
        assert_eq!(directory.discount_rate("EG18", Karat::K18, 600.0), 0.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = GoldbookConfig::default();
        config.pricing.base_fee_per_gram = 0.0;
        assert!(config.validate().is_err());

        let mut config = GoldbookConfig::default();
        config.pricing.medium_threshold = 2000;
        assert!(config.validate().is_err());

        let duplicate_tier = r#"
[[suppliers]]
code = "EG18"
[suppliers.karat21]
tiers = [
    { name = "Base", threshold = 0, percentage = 20.0 },
    { name = "Other", threshold = 0, percentage = 25.0 },
]
"#;
        let config = GoldbookConfig::from_toml(duplicate_tier).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let out_of_range = r#"
[[suppliers]]
code = "EG18"
[suppliers.karat21]
tiers = [{ name = "Base", threshold = 0, percentage = 120.0 }]
"#;
        let config = GoldbookConfig::from_toml(out_of_range).unwrap();
        assert!(config.validate().is_err());

        let both = r#"
[[suppliers]]
code = "EG18"
[suppliers.karat21]
tiers = [{ name = "Base", threshold = 0, percentage = 20.0 }]
bands = { low = 1.0, medium = 2.0, high = 3.0 }
"#;
        let config = GoldbookConfig::from_toml(both).unwrap();
        assert!(config.validate().is_err());

        let twice = r#"
[[suppliers]]
code = "EG18"
[[suppliers]]
code = "EG18"
"#;
        let config = GoldbookConfig::from_toml(twice).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GOLDBOOK_BASE_FEE_PER_GRAM", "6.5"),
            ("GOLDBOOK_DUE_DAYS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = GoldbookConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.pricing.base_fee_per_gram, 6.5);
        assert_eq!(config.pricing.due_days, 30);
    }

    #[test]
    fn test_oversized_due_days_rejected() {
        let mut config = GoldbookConfig::default();
        config.apply_overrides(|key| (key == "GOLDBOOK_DUE_DAYS").then(|| "9999999999999".to_string()));
        assert_eq!(config.pricing.due_days, 9_999_999_999_999);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.pricing.due_days = MAX_DUE_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GoldbookConfig::load_or_default(Some(dir.path().join("absent.toml")));
        assert_eq!(config.pricing, PricingSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("goldbook.toml");

        let config = GoldbookConfig::from_toml(SAMPLE).unwrap();
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let reloaded = GoldbookConfig::from_toml(&contents).unwrap();
        assert_eq!(reloaded.suppliers, config.suppliers);
        assert_eq!(reloaded.pricing.medium_threshold, 400);
    }
}
