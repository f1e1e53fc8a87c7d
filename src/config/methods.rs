//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use std::path::PathBuf;

use super::builder::CrawlConfigBuilder;

impl<State> CrawlConfigBuilder<State> {
    /// Limit how many links away from the seed the crawl may go
    ///
    /// The seed is depth 0. Links found on a page at `max_depth` are not followed.
    ///
    /// # Example
    /// ```rust
    /// # use kodegen_tools_sitemirror::config::CrawlConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = CrawlConfig::builder()
    ///     .storage_dir("./sites")
    ///     .start_url("https://example.com")
    ///     .max_depth(2)
    ///     .build()?;
    /// assert_eq!(config.max_depth(), Some(2));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn max_depth(mut self, depth: u8) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Stop admitting pages once this many have been admitted
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn max_concurrent_pages(mut self, pages: usize) -> Self {
        self.max_concurrent_pages = pages;
        self
    }

    /// Timeout applied to every page and resource fetch
    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn download_resources(mut self, download: bool) -> Self {
        self.download_resources = download;
        self
    }

    #[must_use]
    pub fn max_resource_bytes(mut self, bytes: usize) -> Self {
        self.max_resource_bytes = bytes;
        self
    }

    #[must_use]
    pub fn strip_base_element(mut self, strip: bool) -> Self {
        self.strip_base_element = strip;
        self
    }

    /// Normalize discovered links through the pattern registry at `path`
    #[must_use]
    pub fn pattern_registry(mut self, path: impl Into<PathBuf>) -> Self {
        self.pattern_registry = Some(path.into());
        self
    }

    /// Glob patterns (`*` wildcard) of URLs never to crawl
    #[must_use]
    pub fn excluded_patterns(mut self, patterns: Vec<String>) -> Self {
        self.excluded_patterns = Some(patterns);
        self
    }
}
