//! Shared configuration constants for sitemirror
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default number of pages fetched concurrently in one crawl session
///
/// The crawl is I/O bound; a small pool keeps load on the origin modest while
/// still overlapping network waits.
pub const DEFAULT_MAX_CONCURRENT_PAGES: usize = 4;

/// Default per-fetch timeout in seconds
///
/// A fetch that exceeds it is treated exactly like a failed fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Largest resource body the crawler will buffer and mirror (50 MB)
pub const DEFAULT_MAX_RESOURCE_BYTES: usize = 50 * 1024 * 1024;

/// Default mirror output directory
pub const DEFAULT_OUTPUT_DIR: &str = "sites";

/// Default location of the URL pattern registry
pub const DEFAULT_PATTERN_REGISTRY: &str = "url_patterns.json";

/// Default bind address for the reverse proxy
pub const DEFAULT_PROXY_BIND: &str = "0.0.0.0:8000";

/// Chrome user agent string sent on upstream requests
///
/// Some origins serve reduced markup to unknown clients, so the crawler and the
/// proxy identify as a current desktop Chrome.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
