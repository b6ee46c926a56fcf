//! Configuration module for feed crawling
//!
//! This module provides the `SpiderConfig` struct and its type-safe builder
//! with validation and defaults matching the feed's pacing.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{ASSETS_DIR_ENV, SpiderConfigBuilder, WithAssetsDir};
pub use types::SpiderConfig;
