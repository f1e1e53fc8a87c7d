//! Core configuration types
//!
//! `CrawlConfig` drives a mirror crawl session, `ProxyConfig` the reverse proxy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::{
    CHROME_USER_AGENT, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_PROXY_BIND,
};

/// Configuration of one mirror crawl session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Mirror output root; every page and resource is written below it
    pub(crate) storage_dir: PathBuf,
    /// Seed URL. Its origin bounds the whole session.
    pub(crate) start_url: String,
    /// Maximum link depth from the seed; `None` is unlimited
    pub(crate) max_depth: Option<u8>,
    /// Maximum number of pages admitted for fetching
    pub(crate) limit: Option<usize>,
    pub(crate) max_concurrent_pages: usize,
    /// Per-fetch timeout; expiry counts as a fetch failure
    pub(crate) fetch_timeout_secs: u64,
    pub(crate) user_agent: String,
    /// Mirror same-origin stylesheets, scripts, images and media next to pages
    pub(crate) download_resources: bool,
    /// Largest page or resource body buffered, in bytes
    pub(crate) max_resource_bytes: usize,
    /// Remove `<base>` elements from mirrored pages
    pub(crate) strip_base_element: bool,
    /// Pattern registry used to normalize discovered links before enqueueing
    pub(crate) pattern_registry: Option<PathBuf>,
    pub(crate) excluded_patterns: Option<Vec<String>>,

    /// Compiled regex patterns from `excluded_patterns`
    /// Pre-compiled at config creation to avoid hot-path regex compilation
    #[serde(skip)]
    pub(crate) excluded_patterns_compiled: Vec<regex::Regex>,
}

/// Configuration of the link-rewriting reverse proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listen address, `host:port`
    pub bind: String,
    /// Prefix the proxy is mounted under, as seen by clients (`""` for the root)
    pub route_prefix: String,
    /// User agent sent upstream
    pub user_agent: String,
    pub upstream_timeout_secs: u64,
    /// Origin proxied from startup, before any `/set-target` call
    pub initial_target: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_PROXY_BIND.to_string(),
            route_prefix: String::new(),
            user_agent: CHROME_USER_AGENT.to_string(),
            upstream_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            initial_target: None,
        }
    }
}
