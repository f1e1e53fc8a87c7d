//! Core crawling logic
//!
//! [`CrawlScheduler`] drives one mirror session: fetch, rewrite, persist,
//! enqueue newly discovered same-origin links. Up to `max_concurrent_pages`
//! pages are in flight at once; the visited set is claimed before a fetch is
//! issued, so every URL is fetched at most once per session.

use dashmap::{DashMap, DashSet};
use futures::StreamExt;
use futures::stream::{self, FuturesUnordered};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify, Semaphore};

use super::crawl_types::{CrawlQueue, CrawlReport, CrawlResult, PageState};
use super::crawler::should_visit_url;
use super::fetcher::Fetcher;
use super::link_processor::prepare_page;
use super::page_timeout::with_fetch_timeout;
use super::progress::{NoOpProgress, ProgressReporter};
use crate::config::CrawlConfig;
use crate::content_saver;
use crate::link_rewriter::{LinkRewriter, RewriteTarget};
use crate::patterns::PatternLearner;
use crate::utils::{CanonicalUrl, Origin};

/// Resource downloads in flight per page
const RESOURCE_CONCURRENCY: usize = 4;

/// Everything a crawl session depends on, passed in explicitly
pub struct CrawlContext<F: Fetcher> {
    pub config: CrawlConfig,
    pub fetcher: Arc<F>,
    /// Registry used to normalize discovered links, when attached
    pub patterns: Option<Arc<PatternLearner>>,
    pub progress: Arc<dyn ProgressReporter>,
}

impl<F: Fetcher> CrawlContext<F> {
    pub fn new(config: CrawlConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher: Arc::new(fetcher),
            patterns: None,
            progress: Arc::new(NoOpProgress),
        }
    }

    #[must_use]
    pub fn with_patterns(mut self, patterns: Arc<PatternLearner>) -> Self {
        self.patterns = Some(patterns);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable handle that stops a session from admitting new pages.
///
/// Pages already in flight run to completion (or time out) before the session
/// returns its report.
#[derive(Debug, Clone, Default)]
pub struct CrawlCancellation {
    state: Arc<CancelState>,
}

impl CrawlCancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::SeqCst) {
            info!(target: "sitemirror::crawl", "Crawl cancellation requested");
        }
        self.state.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Shared state of one session, owned by the scheduler and its page tasks
struct Session<F: Fetcher> {
    config: CrawlConfig,
    fetcher: Arc<F>,
    patterns: Option<Arc<PatternLearner>>,
    progress: Arc<dyn ProgressReporter>,
    origin: Origin,
    rewriter: LinkRewriter,
    queue: Mutex<VecDeque<CrawlQueue>>,
    /// Every URL ever pushed onto `queue`
    queued: DashSet<CanonicalUrl>,
    visited: DashSet<CanonicalUrl>,
    resources: DashSet<CanonicalUrl>,
    failures: DashMap<CanonicalUrl, String>,
    pages_persisted: AtomicUsize,
    resources_saved: AtomicUsize,
    resources_failed: AtomicUsize,
}

/// Tracks one admitted page until it reaches a terminal state.
///
/// Dropping the guard early (task cancelled or panicked) records the page as
/// failed, so every admitted page ends `Persisted` or `Failed`.
struct PageGuard<F: Fetcher> {
    session: Arc<Session<F>>,
    url: CanonicalUrl,
    state: PageState,
}

impl<F: Fetcher> PageGuard<F> {
    fn new(session: Arc<Session<F>>, url: CanonicalUrl) -> Self {
        Self {
            session,
            url,
            state: PageState::Fetching,
        }
    }

    fn advance(&mut self, state: PageState) {
        debug!(target: "sitemirror::crawl", "{}: {:?} -> {state:?}", self.url, self.state);
        self.state = state;
    }

    fn persisted(&mut self, path: &Path) {
        self.session.pages_persisted.fetch_add(1, Ordering::Relaxed);
        self.session
            .progress
            .report_page_persisted(self.url.as_str(), path);
        self.state = PageState::Persisted;
    }

    fn fail(&mut self, reason: String) {
        self.session.record_failure(&self.url, reason);
        self.state = PageState::Failed;
    }
}

impl<F: Fetcher> Drop for PageGuard<F> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            let reason = format!("page task ended while {:?}", self.state);
            self.session.record_failure(&self.url, reason);
        }
    }
}

impl<F: Fetcher> Session<F> {
    fn record_failure(&self, url: &CanonicalUrl, reason: String) {
        self.progress.report_page_failed(url.as_str(), &reason);
        self.failures.insert(url.clone(), reason);
    }

    async fn process_page(session: Arc<Self>, item: CrawlQueue) {
        let timeout_secs = session.config.fetch_timeout_secs();
        let output_root = session.config.storage_dir().clone();
        let mut page = PageGuard::new(Arc::clone(&session), item.url.clone());

        session.progress.report_fetching(item.url.as_str(), item.depth);
        let fetched = match with_fetch_timeout(
            session.fetcher.fetch(&item.url),
            timeout_secs,
            &item.url,
        )
        .await
        {
            Ok(fetched) => fetched,
            Err(e) => {
                page.fail(e.to_string());
                return;
            }
        };

        if !fetched.is_html() {
            page.advance(PageState::Persisting);
            match content_saver::save_resource(&fetched.body, &item.url, &output_root).await {
                Ok(path) => page.persisted(&path),
                Err(e) => page.fail(format!("{e:#}")),
            }
            return;
        }

        page.advance(PageState::Rewriting);
        let patterns = match &session.patterns {
            Some(learner) => Some(learner.snapshot().await),
            None => None,
        };
        // Relative references resolve against where the page ended up
        let served_from = fetched.final_url.as_ref().unwrap_or(&item.url);
        if served_from != &item.url {
            debug!(target: "sitemirror::crawl", "{} was served from {served_from}", item.url);
        }
        let prepared = match prepare_page(
            &fetched.body,
            served_from,
            &session.origin,
            &session.rewriter,
            patterns.as_ref(),
        ) {
            Ok(prepared) => prepared,
            Err(e) => {
                page.fail(e.to_string());
                return;
            }
        };

        if session.config.download_resources() {
            session.download_resources(&prepared.resources).await;
        }

        page.advance(PageState::Persisting);
        match content_saver::save_html_content(prepared.html, &item.url, &output_root).await {
            Ok(path) => page.persisted(&path),
            Err(e) => {
                page.fail(format!("{e:#}"));
                return;
            }
        }

        session.enqueue_links(&item, prepared.links).await;
    }

    /// Materialize same-origin resources, each at most once per session
    async fn download_resources(&self, resources: &[CanonicalUrl]) {
        let timeout_secs = self.config.fetch_timeout_secs();
        let output_root = self.config.storage_dir();

        stream::iter(resources)
            .for_each_concurrent(RESOURCE_CONCURRENCY, |url| async move {
                // A URL admitted as a page owns its mirror path
                if self.visited.contains(url) || !self.resources.insert(url.clone()) {
                    return;
                }

                let fetched =
                    match with_fetch_timeout(self.fetcher.fetch(url), timeout_secs, url).await {
                        Ok(fetched) => fetched,
                        Err(e) => {
                            self.resources_failed.fetch_add(1, Ordering::Relaxed);
                            warn!(target: "sitemirror::crawl", "Resource skipped: {e}");
                            return;
                        }
                    };

                match content_saver::save_resource(&fetched.body, url, output_root).await {
                    Ok(path) => {
                        self.resources_saved.fetch_add(1, Ordering::Relaxed);
                        self.progress.report_resource_saved(url.as_str(), &path);
                    }
                    Err(e) => {
                        self.resources_failed.fetch_add(1, Ordering::Relaxed);
                        warn!(target: "sitemirror::crawl", "Failed to save resource {url}: {e:#}");
                    }
                }
            })
            .await;
    }

    async fn enqueue_links(&self, parent: &CrawlQueue, links: Vec<CanonicalUrl>) {
        if self
            .config
            .max_depth()
            .is_some_and(|max_depth| parent.depth >= max_depth)
        {
            debug!(target: "sitemirror::links", "Max depth reached at {}, not following links", parent.url);
            return;
        }

        let depth = parent.depth.saturating_add(1);
        let mut fresh = Vec::with_capacity(links.len());
        for link in links {
            if self.visited.contains(&link) || !should_visit_url(&link, &self.origin, &self.config) {
                continue;
            }
            if self.queued.insert(link.clone()) {
                fresh.push(CrawlQueue { url: link, depth });
            }
        }

        let added = fresh.len();
        self.queue.lock().await.extend(fresh);

        debug!(target: "sitemirror::links", "Queued {added} new links from {}", parent.url);
    }

    fn report(&self, cancelled: bool) -> CrawlReport {
        let mut pages_failed: Vec<(String, String)> = self
            .failures
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().clone()))
            .collect();
        pages_failed.sort();

        CrawlReport {
            pages_persisted: self.pages_persisted.load(Ordering::Relaxed),
            pages_failed,
            resources_saved: self.resources_saved.load(Ordering::Relaxed),
            resources_failed: self.resources_failed.load(Ordering::Relaxed),
            visited: self.visited.len(),
            cancelled,
        }
    }
}

/// Drives a single mirror crawl session
pub struct CrawlScheduler<F: Fetcher> {
    session: Arc<Session<F>>,
    seed: CanonicalUrl,
    cancellation: CrawlCancellation,
}

impl<F: Fetcher> CrawlScheduler<F> {
    /// Build a scheduler seeded from the configured start URL
    pub fn new(context: CrawlContext<F>) -> CrawlResult<Self> {
        let CrawlContext {
            config,
            fetcher,
            patterns,
            progress,
        } = context;

        let seed = CanonicalUrl::parse(config.start_url())?;
        let origin = seed.origin()?;
        let rewriter = LinkRewriter::new(RewriteTarget::Mirror)
            .with_strip_base(config.strip_base_element());

        let session = Session {
            config,
            fetcher,
            patterns,
            progress,
            origin,
            rewriter,
            queue: Mutex::new(VecDeque::new()),
            queued: DashSet::new(),
            visited: DashSet::new(),
            resources: DashSet::new(),
            failures: DashMap::new(),
            pages_persisted: AtomicUsize::new(0),
            resources_saved: AtomicUsize::new(0),
            resources_failed: AtomicUsize::new(0),
        };

        Ok(Self {
            session: Arc::new(session),
            seed,
            cancellation: CrawlCancellation::new(),
        })
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CrawlCancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> CrawlCancellation {
        self.cancellation.clone()
    }

    pub fn origin(&self) -> &Origin {
        &self.session.origin
    }

    pub fn seed(&self) -> &CanonicalUrl {
        &self.seed
    }

    /// Run the session until the queue drains, the page limit is hit, or the
    /// session is cancelled. Single-page failures never abort the session.
    pub async fn crawl(self) -> CrawlResult<CrawlReport> {
        let session = self.session;
        session.progress.report_started(self.seed.as_str());

        session.queued.insert(self.seed.clone());
        session.queue.lock().await.push_back(CrawlQueue {
            url: self.seed.clone(),
            depth: 0,
        });

        let concurrency = session.config.max_concurrent_pages();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut active_tasks = FuturesUnordered::new();
        let mut admitted = 0usize;

        loop {
            // Fill up to concurrency limit
            while active_tasks.len() < concurrency && !self.cancellation.is_cancelled() {
                let next = session.queue.lock().await.pop_front();
                let Some(item) = next else {
                    break;
                };

                if let Some(limit) = session.config.limit()
                    && admitted >= limit
                {
                    info!(target: "sitemirror::crawl", "Reached page limit of {limit}");
                    session.queue.lock().await.clear();
                    break;
                }

                if !item.url.is_same_origin(&session.origin) {
                    continue;
                }

                // Claim before fetching: the sole de-duplication guard
                if !session.visited.insert(item.url.clone()) {
                    continue;
                }
                admitted += 1;

                let permit = if let Ok(p) = semaphore.clone().acquire_owned().await {
                    p
                } else {
                    error!(target: "sitemirror::crawl", "Semaphore closed unexpectedly");
                    break;
                };

                let task_session = Arc::clone(&session);
                active_tasks.push(tokio::spawn(async move {
                    let _permit = permit; // Hold until task completes
                    Session::process_page(task_session, item).await;
                }));
            }

            // Wait for at least one task to complete
            match active_tasks.next().await {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    error!(target: "sitemirror::crawl", "Page task panicked: {e}");
                }
                None => break,
            }
        }

        let report = session.report(self.cancellation.is_cancelled());
        session.progress.report_completed(&report);
        Ok(report)
    }
}
