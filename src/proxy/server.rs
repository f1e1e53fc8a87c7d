//! HTTP surface of the link-rewriting reverse proxy
//!
//! Axum-based server: `/set-target` selects the upstream origin, every other
//! path is fetched from it and relayed back with same-origin references routed
//! through the proxy.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use super::state::{ProxyContext, ProxyError};
use super::transformer::BodyHandling;
use crate::config::ProxyConfig;

#[derive(Debug, Deserialize)]
struct SetTargetParams {
    url: Option<String>,
}

/// Build the proxy router over a shared context.
///
/// Proxied routes answer both with and without the configured route prefix,
/// so links rewritten to `{prefix}/path` land on upstream `/path`.
pub fn create_router(context: Arc<ProxyContext>) -> Router {
    Router::new()
        .route("/set-target", get(set_target))
        .route("/", get(proxy_root))
        .route("/{*path}", get(proxy_path))
        .layer(CorsLayer::permissive())
        .with_state(context)
}

async fn set_target(
    State(context): State<Arc<ProxyContext>>,
    Query(params): Query<SetTargetParams>,
) -> Result<Json<Value>, ProxyError> {
    let url = params
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or(ProxyError::MissingTargetUrl)?;

    context.set_target(&url).await?;

    Ok(Json(json!({ "status": "success", "target": url })))
}

async fn proxy_root(
    State(context): State<Arc<ProxyContext>>,
    RawQuery(query): RawQuery,
) -> Result<Response, ProxyError> {
    forward(&context, "", query.as_deref()).await
}

async fn proxy_path(
    State(context): State<Arc<ProxyContext>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, ProxyError> {
    let upstream_path = context.strip_route_prefix(&path);
    forward(&context, upstream_path, query.as_deref()).await
}

/// Fetch `path` from the active origin and relay it.
///
/// Status and content type pass through. HTML is rewritten; other text,
/// script and JSON bodies are buffered as-is; everything else is streamed.
async fn forward(context: &ProxyContext, path: &str, query: Option<&str>) -> Result<Response, ProxyError> {
    let origin = context.target().await.ok_or(ProxyError::TargetNotSet)?;
    let upstream = ProxyContext::upstream_url(&origin, path, query);

    debug!(target: "sitemirror::proxy", "GET {upstream}");
    let response = context.client().get(upstream).send().await?;

    let status = response.status();
    let content_type = response.headers().get(CONTENT_TYPE).cloned();
    let content_type_str = content_type
        .as_ref()
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    // Redirects are followed upstream: relative references resolve against
    // where the page ended up, same-origin still means the active target
    let page_url = response.url().clone();

    let body = match BodyHandling::for_content_type(content_type_str.as_deref()) {
        BodyHandling::Stream => Body::from_stream(response.bytes_stream()),
        BodyHandling::Buffer => Body::from(response.bytes().await?),
        BodyHandling::Rewrite => {
            let bytes = response.bytes().await?;
            let rewritten = context.transformer().transform(
                bytes,
                content_type_str.as_deref(),
                &origin,
                &page_url,
            )?;
            Body::from(rewritten)
        }
    };

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    Ok(builder.body(body)?)
}

/// Serve the proxy on an already bound listener until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    context: Arc<ProxyContext>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(context);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Proxy server error")?;
    Ok(())
}

/// Bind `config.bind` and run the proxy until Ctrl-C
pub async fn run_proxy(config: ProxyConfig) -> Result<()> {
    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("Invalid proxy bind address '{}'", config.bind))?;

    let context = Arc::new(ProxyContext::new(config).context("Failed to create proxy context")?);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind proxy on {addr}"))?;

    info!(target: "sitemirror::proxy", "Proxy listening on http://{addr}");
    if let Some(origin) = context.target().await {
        info!(target: "sitemirror::proxy", "Proxying {origin}");
    } else {
        info!(target: "sitemirror::proxy", "No target yet; call /set-target?url=... first");
    }

    serve(listener, context, async {
        let _ = tokio::signal::ctrl_c().await;
        info!(target: "sitemirror::proxy", "Proxy shutting down");
    })
    .await
}
