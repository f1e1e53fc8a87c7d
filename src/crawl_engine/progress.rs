//! Progress reporting abstraction for crawl sessions
//!
//! Defines the `ProgressReporter` trait for per-page lifecycle events and
//! provides a no-op and a logging implementation.

use std::path::Path;

use super::crawl_types::CrawlReport;

/// Trait for reporting crawl progress at key lifecycle events
///
/// Implementations can send updates to channels, log to console, update UI, etc.
/// Reporters are shared by every page task of a session.
pub trait ProgressReporter: Send + Sync {
    /// Report that a session started from `seed`
    fn report_started(&self, seed: &str);

    /// Report that a page fetch has started
    fn report_fetching(&self, url: &str, depth: u8);

    /// Report that a page was written to the mirror
    fn report_page_persisted(&self, url: &str, path: &Path);

    /// Report that a page ended in the failed state
    fn report_page_failed(&self, url: &str, error: &str);

    /// Report that a resource was written to the mirror
    fn report_resource_saved(&self, url: &str, path: &Path);

    /// Report that the session finished
    fn report_completed(&self, report: &CrawlReport);
}

/// Progress reporter that does nothing
///
/// All methods are no-ops and will be inlined away by the compiler.
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_started(&self, _seed: &str) {}

    #[inline(always)]
    fn report_fetching(&self, _url: &str, _depth: u8) {}

    #[inline(always)]
    fn report_page_persisted(&self, _url: &str, _path: &Path) {}

    #[inline(always)]
    fn report_page_failed(&self, _url: &str, _error: &str) {}

    #[inline(always)]
    fn report_resource_saved(&self, _url: &str, _path: &Path) {}

    #[inline(always)]
    fn report_completed(&self, _report: &CrawlReport) {}
}

/// Progress reporter that writes through the `log` facade
#[derive(Debug, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report_started(&self, seed: &str) {
        log::info!(target: "sitemirror::crawl", "Mirroring {seed}");
    }

    fn report_fetching(&self, url: &str, depth: u8) {
        log::info!(target: "sitemirror::crawl", "Crawling [depth {depth}]: {url}");
    }

    fn report_page_persisted(&self, url: &str, path: &Path) {
        log::info!(target: "sitemirror::crawl", "Saved {url} -> {}", path.display());
    }

    fn report_page_failed(&self, url: &str, error: &str) {
        log::warn!(target: "sitemirror::crawl", "Failed {url}: {error}");
    }

    fn report_resource_saved(&self, url: &str, path: &Path) {
        log::debug!(target: "sitemirror::crawl", "Resource {url} -> {}", path.display());
    }

    fn report_completed(&self, report: &CrawlReport) {
        log::info!(
            target: "sitemirror::crawl",
            "Crawl finished: {} pages saved, {} failed, {} resources saved, {} resource failures",
            report.pages_persisted,
            report.pages_failed.len(),
            report.resources_saved,
            report.resources_failed
        );
    }
}
