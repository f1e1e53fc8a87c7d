//! Crawl Engine Module
//!
//! This module contains the mirror crawl scheduler and the pieces it drives:
//! fetching, per-page preparation, timeouts and progress reporting.

// Sub-modules
pub mod core;
pub mod crawl_types;
pub mod crawler;
pub mod fetcher;
pub mod link_processor;
pub mod page_timeout;
pub mod progress;

// Re-exports for public API
pub use core::{CrawlCancellation, CrawlContext, CrawlScheduler};
pub use crawler::{MirrorCrawler, run_crawl, should_visit_url};
pub use fetcher::{FetchedResource, Fetcher, HttpFetcher};
pub use link_processor::{PreparedPage, prepare_page};
pub use progress::{LogProgress, NoOpProgress, ProgressReporter};

// Re-export crawl types
pub use crawl_types::{
    CrawlError, CrawlQueue, CrawlReport, CrawlResult, Crawler, FetchError, PageState,
};
