pub mod config;
pub mod content_saver;
pub mod crawl_engine;
pub mod link_rewriter;
pub mod patterns;
pub mod proxy;
pub mod runtime;
pub mod utils;

pub use config::{CrawlConfig, ProxyConfig};
pub use crawl_engine::{
    CrawlCancellation, CrawlContext, CrawlError, CrawlQueue, CrawlReport, CrawlResult,
    CrawlScheduler, Crawler, FetchError, Fetcher, HttpFetcher, MirrorCrawler,
};
pub use link_rewriter::{Document, LinkRewriter, RewriteStats, RewriteTarget};
pub use patterns::{PatternLearner, PatternSnapshot, RegistryError, UrlPattern, UrlTemplate};
pub use proxy::{ProxyContentTransformer, ProxyContext, ProxyError};
pub use runtime::CrawlRequest;
pub use utils::{CanonicalUrl, MirrorPath, Origin, UrlError, to_mirror_path};

/// Mirror the site described by `config` over HTTP, logging progress
pub async fn crawl(config: CrawlConfig) -> CrawlResult<CrawlReport> {
    MirrorCrawler::new(config).crawl().await
}
