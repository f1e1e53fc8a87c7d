//! Type-safe builder for `CrawlConfig` using the typestate pattern
//!
//! This module provides a fluent builder interface with compile-time validation
//! ensuring that required fields are set before building a `CrawlConfig`.

use crate::utils::{
    CHROME_USER_AGENT, CanonicalUrl, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_PAGES,
    DEFAULT_MAX_RESOURCE_BYTES,
};
use anyhow::{Result, anyhow};
use regex::Regex;
use std::marker::PhantomData;
use std::path::PathBuf;
use url::Url;

use super::types::CrawlConfig;

/// Compile a glob pattern into a regex
///
/// Converts glob patterns (where * matches any sequence) into proper regex patterns.
/// Everything else in the pattern is matched literally.
///
/// # Errors
///
/// Returns an error if the resulting regex pattern is invalid.
pub(crate) fn compile_glob_pattern(pattern: &str) -> Result<Regex> {
    let regex_pattern = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    // Anchor pattern to match full string
    let anchored = format!("^{regex_pattern}$");

    Regex::new(&anchored).map_err(|e| anyhow!("Invalid glob pattern '{pattern}': {e}"))
}

// Type states for the builder
pub struct WithStorageDir;
pub struct WithStartUrl;

pub struct CrawlConfigBuilder<State = ()> {
    pub(crate) storage_dir: Option<PathBuf>,
    pub(crate) start_url: Option<String>,
    pub(crate) max_depth: Option<u8>,
    pub(crate) limit: Option<usize>,
    pub(crate) max_concurrent_pages: usize,
    pub(crate) fetch_timeout_secs: u64,
    pub(crate) user_agent: String,
    pub(crate) download_resources: bool,
    pub(crate) max_resource_bytes: usize,
    pub(crate) strip_base_element: bool,
    pub(crate) pattern_registry: Option<PathBuf>,
    pub(crate) excluded_patterns: Option<Vec<String>>,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for CrawlConfigBuilder<()> {
    fn default() -> Self {
        Self {
            storage_dir: None,
            start_url: None,
            max_depth: None,
            limit: None,
            max_concurrent_pages: DEFAULT_MAX_CONCURRENT_PAGES,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            user_agent: CHROME_USER_AGENT.to_string(),
            download_resources: true,
            max_resource_bytes: DEFAULT_MAX_RESOURCE_BYTES,
            strip_base_element: false,
            pattern_registry: None,
            excluded_patterns: None,
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfig {
    /// Create a builder for configuring a `CrawlConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CrawlConfigBuilder<()> {
        CrawlConfigBuilder::default()
    }
}

impl<State> CrawlConfigBuilder<State> {
    fn into_state<Next>(self) -> CrawlConfigBuilder<Next> {
        CrawlConfigBuilder {
            storage_dir: self.storage_dir,
            start_url: self.start_url,
            max_depth: self.max_depth,
            limit: self.limit,
            max_concurrent_pages: self.max_concurrent_pages,
            fetch_timeout_secs: self.fetch_timeout_secs,
            user_agent: self.user_agent,
            download_resources: self.download_resources,
            max_resource_bytes: self.max_resource_bytes,
            strip_base_element: self.strip_base_element,
            pattern_registry: self.pattern_registry,
            excluded_patterns: self.excluded_patterns,
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfigBuilder<()> {
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> CrawlConfigBuilder<WithStorageDir> {
        self.storage_dir = Some(dir.into());
        self.into_state()
    }
}

impl CrawlConfigBuilder<WithStorageDir> {
    pub fn start_url(mut self, url: impl Into<String>) -> CrawlConfigBuilder<WithStartUrl> {
        let url_string = url.into();
        self.start_url = Some(with_default_scheme(url_string.trim()));
        self.into_state()
    }
}

/// Add `https://` to bare hosts such as `example.com` or `localhost:8080`.
///
/// Values that already parse with a scheme are kept as written, so
/// `mailto:` and friends are rejected by `build` instead of being read as
/// credentials.
fn with_default_scheme(raw: &str) -> String {
    match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) => format!("https://{raw}"),
        // `host:port` parses as a cannot-be-a-base URL with the port as its path
        Ok(url)
            if url.cannot_be_a_base()
                && url
                    .path()
                    .split('/')
                    .next()
                    .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())) =>
        {
            format!("https://{raw}")
        }
        _ => raw.to_string(),
    }
}

// Build method only available when all required fields are set
impl CrawlConfigBuilder<WithStartUrl> {
    pub fn build(self) -> Result<CrawlConfig> {
        let start_url = self
            .start_url
            .ok_or_else(|| anyhow!("start_url is required"))?;
        CanonicalUrl::parse(&start_url)
            .map_err(|e| anyhow!("Invalid start URL '{start_url}': {e}"))?;

        if self.max_concurrent_pages == 0 {
            return Err(anyhow!("max_concurrent_pages must be at least 1"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(anyhow!("fetch_timeout_secs must be at least 1"));
        }

        // Compile excluded patterns once at config creation
        let excluded_patterns_compiled = if let Some(ref patterns) = self.excluded_patterns {
            patterns
                .iter()
                .map(|p| compile_glob_pattern(p))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(CrawlConfig {
            storage_dir: self
                .storage_dir
                .ok_or_else(|| anyhow!("storage_dir is required"))?,
            start_url,
            max_depth: self.max_depth,
            limit: self.limit,
            max_concurrent_pages: self.max_concurrent_pages,
            fetch_timeout_secs: self.fetch_timeout_secs,
            user_agent: self.user_agent,
            download_resources: self.download_resources,
            max_resource_bytes: self.max_resource_bytes,
            strip_base_element: self.strip_base_element,
            pattern_registry: self.pattern_registry,
            excluded_patterns: self.excluded_patterns,
            excluded_patterns_compiled,
        })
    }
}
