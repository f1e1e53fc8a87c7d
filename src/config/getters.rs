//! Getter methods for `CrawlConfig`
//!
//! This module provides all the accessor methods for retrieving configuration
//! values from a `CrawlConfig` instance.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::CrawlConfig;

impl CrawlConfig {
    #[must_use]
    pub fn storage_dir(&self) -> &PathBuf {
        &self.storage_dir
    }

    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<u8> {
        self.max_depth
    }

    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    #[must_use]
    pub fn max_concurrent_pages(&self) -> usize {
        self.max_concurrent_pages
    }

    #[must_use]
    pub fn fetch_timeout_secs(&self) -> u64 {
        self.fetch_timeout_secs
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn download_resources(&self) -> bool {
        self.download_resources
    }

    #[must_use]
    pub fn max_resource_bytes(&self) -> usize {
        self.max_resource_bytes
    }

    #[must_use]
    pub fn strip_base_element(&self) -> bool {
        self.strip_base_element
    }

    #[must_use]
    pub fn pattern_registry(&self) -> Option<&Path> {
        self.pattern_registry.as_deref()
    }

    #[must_use]
    pub fn excluded_patterns(&self) -> Option<&Vec<String>> {
        self.excluded_patterns.as_ref()
    }

    #[must_use]
    pub fn excluded_patterns_compiled(&self) -> &[regex::Regex] {
        &self.excluded_patterns_compiled
    }

    /// Whether `url` matches any excluded pattern
    #[must_use]
    pub fn is_excluded(&self, url: &str) -> bool {
        self.excluded_patterns_compiled
            .iter()
            .any(|regex| regex.is_match(url))
    }
}
