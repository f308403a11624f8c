//! # API Shared
//!
//! Shared utilities and definitions for the discharge summary surfaces.
//!
//! Contains:
//! - Wire types (`types` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and `discharge-cli` for common functionality.

pub mod health;
pub mod types;

pub use health::HealthService;
pub use types::*;
