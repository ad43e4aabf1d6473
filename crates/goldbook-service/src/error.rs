//! # Service Error Types
//!
//! Errors raised while loading configuration, talking to the purchase
//! store or running an engine operation.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Service Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Store       │  │       Engine            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  LoadFailed     │  │  Unavailable    │  │  CoreError              │ │
//! │  │  Invalid        │  │  Serialization  │  │  (not found, tiers,     │ │
//! │  │  SaveFailed     │  │                 │  │   validation)           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │                 ▼ ApiError { code, message } ▼                         │
//! │              (what the mobile frontend receives)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use goldbook_core::CoreError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// Config parsed but describes an impossible setup.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Config could not be written back.
    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

impl From<CoreError> for ConfigError {
    fn from(err: CoreError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// Purchase store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not complete the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be encoded or decoded.
    #[error("Store serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Any failure of a service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// =============================================================================
// Caller-Facing Error
// =============================================================================

/// Error shape returned to clients.
///
/// ```json
/// { "code": "NOT_FOUND", "message": "Purchase not found: 8c1e..." }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    /// Tier rules such as deleting a protected tier.
    BusinessLogic,
    StoreError,
    ConfigError,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Core(core) => {
                let code = match &core {
                    CoreError::PurchaseNotFound(_)
                    | CoreError::PaymentNotFound { .. }
                    | CoreError::SupplierNotFound(_)
                    | CoreError::TierNotFound { .. } => ErrorCode::NotFound,
                    CoreError::ProtectedTier { .. } => ErrorCode::BusinessLogic,
                    CoreError::Validation(_) => ErrorCode::ValidationError,
                };
                ApiError::new(code, core.to_string())
            }
            ServiceError::Store(e) => {
                // Store internals stay in the log.
                tracing::error!("Store operation failed: {}", e);
                ApiError::new(ErrorCode::StoreError, "Purchase store operation failed")
            }
            ServiceError::Config(e) => ApiError::new(ErrorCode::ConfigError, e.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
