//! Core types and traits for mirror crawling.
//!
//! This module contains the error types, queue items, per-page states, the
//! session report and the main Crawler trait.

use serde::Serialize;

use crate::runtime::CrawlRequest;
use crate::utils::{CanonicalUrl, UrlError};

/// Error type for a crawl session as a whole
#[derive(Debug, Clone, thiserror::Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Crawl operation was cancelled")]
    Cancelled,
    #[error("Crawl error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        // Use {:#} to preserve full error chain with context
        Self::Other(format!("{err:#}"))
    }
}

impl From<UrlError> for CrawlError {
    fn from(err: UrlError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// Convenience alias for Result with `CrawlError`
pub type CrawlResult<T> = Result<T, CrawlError>;

/// Failure to obtain bytes for one URL. Never fatal to a session.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Fetching {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("Body of {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },

    #[error("Fetching {url} failed: {message}")]
    Other { url: String, message: String },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Request { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

/// An item in the crawl queue with depth tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlQueue {
    pub url: CanonicalUrl,
    pub depth: u8,
}

/// Lifecycle of one admitted page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    Fetching,
    Rewriting,
    Persisting,
    Persisted,
    Failed,
}

impl PageState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Persisted | Self::Failed)
    }
}

/// Outcome of a finished crawl session
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub pages_persisted: usize,
    /// `(url, reason)` for every page that ended `Failed`, sorted by URL
    pub pages_failed: Vec<(String, String)>,
    pub resources_saved: usize,
    pub resources_failed: usize,
    /// Distinct page URLs admitted to the session
    pub visited: usize,
    pub cancelled: bool,
}

/// A trait defining the interface for mirror crawlers.
pub trait Crawler {
    /// Create a new crawler with the given configuration.
    fn new(config: crate::config::CrawlConfig) -> Self;

    /// Crawl from the configured seed and write the mirror.
    /// Returns a `CrawlRequest` that can be awaited for the final report.
    fn crawl(&self) -> CrawlRequest;
}
