//! Configuration module for mirror crawls and the reverse proxy
//!
//! This module provides the `CrawlConfig` struct and its type-safe builder
//! for configuring crawl sessions with validation and sensible defaults, plus
//! the serde-friendly `ProxyConfig`.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{CrawlConfigBuilder, WithStartUrl, WithStorageDir};
pub use types::{CrawlConfig, ProxyConfig};
