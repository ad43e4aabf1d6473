//! # goldbook-service: Orchestration for the Goldbook Engine
//!
//! Loads pricing configuration, serializes mutations over a purchase store
//! and runs the pure engine from `goldbook-core` on every change.
//!
//! ## Modules
//!
//! - [`config`] - `goldbook.toml` + environment configuration
//! - [`store`] - The `PurchaseStore` seam and an in-memory implementation
//! - [`service`] - `PurchaseService`, one method per business operation
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - Service errors and the client-facing `ApiError`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use goldbook_service::{GoldbookConfig, InMemoryStore, PurchaseService};
//!
//! # async fn run() -> Result<(), goldbook_service::ServiceError> {
//! let config = GoldbookConfig::load(None)?;
//! let service = PurchaseService::from_config(InMemoryStore::new(), &config)?;
//!
//! let today = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
//! let summary = service.month_summary(5, 2025, today).await?;
//! println!("{} purchases", summary.aggregate.purchase_ids.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod telemetry;

pub use config::GoldbookConfig;
pub use error::{ApiError, ConfigError, ErrorCode, ServiceError, ServiceResult, StoreError};
pub use service::PurchaseService;
pub use store::{InMemoryStore, PurchaseStore};
