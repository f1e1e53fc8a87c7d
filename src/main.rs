// Site mirroring crawler and link-rewriting reverse proxy.
//
// `crawl` writes a static mirror of one origin, `proxy` serves an origin live
// with rewritten links, `patterns` manages the URL pattern registry.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use kodegen_tools_sitemirror::config::{CrawlConfig, ProxyConfig};
use kodegen_tools_sitemirror::crawl_engine::{Crawler, MirrorCrawler};
use kodegen_tools_sitemirror::patterns::PatternLearner;
use kodegen_tools_sitemirror::proxy::run_proxy;
use kodegen_tools_sitemirror::utils::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_PAGES, DEFAULT_OUTPUT_DIR,
    DEFAULT_PATTERN_REGISTRY, DEFAULT_PROXY_BIND,
};

#[derive(Parser, Debug)]
#[command(name = "kodegen-sitemirror", version, about = "Mirror a site or proxy it with rewritten links")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one origin and write a static mirror
    Crawl {
        /// Seed URL; `https://` is assumed when no scheme is given
        url: String,

        /// Mirror output directory
        #[arg(long, short, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        #[arg(long)]
        max_depth: Option<u8>,

        /// Maximum number of pages to admit
        #[arg(long)]
        limit: Option<usize>,

        /// Pages fetched concurrently
        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_PAGES)]
        concurrency: usize,

        /// Per-fetch timeout in seconds
        #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
        timeout: u64,

        /// Pattern registry used to normalize discovered links
        #[arg(long)]
        patterns: Option<PathBuf>,

        /// Glob of URLs never to follow (repeatable)
        #[arg(long = "exclude")]
        excluded: Vec<String>,

        /// Mirror pages only, skip stylesheets, scripts and media
        #[arg(long)]
        no_resources: bool,

        /// Remove `<base>` elements from mirrored pages
        #[arg(long)]
        strip_base: bool,
    },

    /// Serve an origin through a link-rewriting reverse proxy
    Proxy {
        #[arg(long, default_value = DEFAULT_PROXY_BIND)]
        bind: String,

        /// Overrides the port of `--bind`
        #[arg(long)]
        port: Option<u16>,

        /// Route prefix the proxy serves under; rewritten links carry it
        #[arg(long, default_value = "")]
        prefix: String,

        /// Origin to proxy from startup
        #[arg(long)]
        target: Option<String>,
    },

    /// Learn or apply URL patterns
    Patterns {
        #[command(subcommand)]
        action: PatternsAction,
    },
}

#[derive(Subcommand, Debug)]
enum PatternsAction {
    /// Record the template relating a stale URL to its replacement
    Learn {
        old: String,
        new: String,
        #[arg(long, default_value = DEFAULT_PATTERN_REGISTRY)]
        registry: PathBuf,
    },

    /// Print the replacement for a URL, or the URL itself when nothing matches
    Normalize {
        url: String,
        #[arg(long, default_value = DEFAULT_PATTERN_REGISTRY)]
        registry: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Crawl {
            url,
            output,
            max_depth,
            limit,
            concurrency,
            timeout,
            patterns,
            excluded,
            no_resources,
            strip_base,
        } => {
            let mut builder = CrawlConfig::builder()
                .storage_dir(output)
                .start_url(url)
                .max_concurrent_pages(concurrency)
                .fetch_timeout_secs(timeout)
                .download_resources(!no_resources)
                .strip_base_element(strip_base);
            if let Some(max_depth) = max_depth {
                builder = builder.max_depth(max_depth);
            }
            if let Some(limit) = limit {
                builder = builder.limit(limit);
            }
            if let Some(patterns) = patterns {
                builder = builder.pattern_registry(patterns);
            }
            if !excluded.is_empty() {
                builder = builder.excluded_patterns(excluded);
            }
            let config = builder.build()?;

            let crawler = MirrorCrawler::new(config);
            let cancellation = crawler.cancellation();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancellation.cancel();
                }
            });

            let report = crawler.crawl().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Proxy {
            bind,
            port,
            prefix,
            target,
        } => {
            let bind = match port {
                Some(port) => {
                    let mut addr: SocketAddr = bind
                        .parse()
                        .with_context(|| format!("Invalid bind address '{bind}'"))?;
                    addr.set_port(port);
                    addr.to_string()
                }
                None => bind,
            };

            run_proxy(ProxyConfig {
                bind,
                route_prefix: prefix,
                initial_target: target,
                ..ProxyConfig::default()
            })
            .await?;
        }

        Command::Patterns { action } => match action {
            PatternsAction::Learn { old, new, registry } => {
                let learner = PatternLearner::open(&registry).await;
                let Some(template) = learner.learn(&old, &new).await else {
                    anyhow::bail!("'{old}' and '{new}' have different path shapes; nothing learned");
                };
                learner
                    .save()
                    .await
                    .with_context(|| format!("Failed to save {}", registry.display()))?;
                println!("{template}");
            }
            PatternsAction::Normalize { url, registry } => {
                let learner = PatternLearner::open(&registry).await;
                println!("{}", learner.normalize(&url).await);
            }
        },
    }

    Ok(())
}
