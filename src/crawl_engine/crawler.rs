use std::sync::Arc;
use tokio::sync::oneshot;

use super::core::{CrawlCancellation, CrawlContext, CrawlScheduler};
use super::crawl_types::{CrawlError, CrawlReport, CrawlResult, Crawler};
use super::fetcher::HttpFetcher;
use super::progress::{LogProgress, ProgressReporter};
use crate::config::CrawlConfig;
use crate::patterns::PatternLearner;
use crate::runtime::CrawlRequest;
use crate::utils::{CanonicalUrl, Origin};

/// Crawler that mirrors a site over plain HTTP
pub struct MirrorCrawler {
    config: CrawlConfig,
    cancellation: CrawlCancellation,
    progress: Arc<dyn ProgressReporter>,
}

impl MirrorCrawler {
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Handle that stops the crawl from admitting further pages
    pub fn cancellation(&self) -> CrawlCancellation {
        self.cancellation.clone()
    }
}

impl Crawler for MirrorCrawler {
    fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            cancellation: CrawlCancellation::new(),
            progress: Arc::new(LogProgress),
        }
    }

    fn crawl(&self) -> CrawlRequest {
        // Create a channel for the result
        let (tx, rx) = oneshot::channel();

        let config = self.config.clone();
        let cancellation = self.cancellation.clone();
        let progress = Arc::clone(&self.progress);

        tokio::spawn(async move {
            let result = run_crawl(config, progress, cancellation).await;
            let _ = tx.send(result);
        });

        CrawlRequest::new(rx)
    }
}

/// Wire up an HTTP fetcher and the optional pattern registry, then run one
/// session to completion
pub async fn run_crawl(
    config: CrawlConfig,
    progress: Arc<dyn ProgressReporter>,
    cancellation: CrawlCancellation,
) -> CrawlResult<CrawlReport> {
    let fetcher = HttpFetcher::from_config(&config)
        .map_err(|e| CrawlError::NetworkError(format!("Failed to build HTTP client: {e}")))?;

    let patterns = match config.pattern_registry() {
        Some(path) => Some(Arc::new(PatternLearner::open(path).await)),
        None => None,
    };

    let mut context = CrawlContext::new(config, fetcher).with_progress(progress);
    if let Some(patterns) = patterns {
        context = context.with_patterns(patterns);
    }

    CrawlScheduler::new(context)?
        .with_cancellation(cancellation)
        .crawl()
        .await
}

/// A discovered URL is followed only when it shares the session origin and
/// matches no excluded pattern
#[must_use]
pub fn should_visit_url(url: &CanonicalUrl, origin: &Origin, config: &CrawlConfig) -> bool {
    if !url.is_same_origin(origin) {
        return false;
    }

    if config.is_excluded(url.as_str()) {
        log::debug!(target: "sitemirror::links", "Excluded by pattern: {url}");
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_visit_url() {
        let config = CrawlConfig::builder()
            .storage_dir("/tmp/mirror")
            .start_url("https://example.com/")
            .excluded_patterns(vec!["*/private/*".to_string()])
            .build()
            .unwrap();
        let origin = Origin::parse("https://example.com").unwrap();

        let visit = |raw: &str| should_visit_url(&CanonicalUrl::parse(raw).unwrap(), &origin, &config);

        assert!(visit("https://example.com/docs"));
        assert!(!visit("https://example.com/private/keys"));
        assert!(!visit("https://example.com:8443/docs"));
        // Network location only; the scheme is not compared
        assert!(visit("http://example.com/docs"));
        assert!(!visit("https://sub.example.com/docs"));
    }
}
