//! Shared proxy state and the errors surfaced on the HTTP boundary.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::sync::RwLock;
use url::Url;

use super::transformer::ProxyContentTransformer;
use crate::config::ProxyConfig;
use crate::link_rewriter::ParseError;
use crate::utils::{Origin, UrlError};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Target not set. Please use /set-target?url=... first")]
    TargetNotSet,

    #[error("Missing 'url' query parameter")]
    MissingTargetUrl,

    #[error("Invalid target URL: {0}")]
    InvalidTarget(#[from] UrlError),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Failed to rewrite upstream response: {0}")]
    Rewrite(#[from] ParseError),

    #[error("Failed to build response: {0}")]
    Response(#[from] axum::http::Error),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TargetNotSet | Self::MissingTargetUrl | Self::InvalidTarget(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Rewrite(_) | Self::Response(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::warn!(target: "sitemirror::proxy", "{self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Everything the proxy handlers share.
///
/// The upstream client is reused by every request; the active origin is the
/// only mutable state.
pub struct ProxyContext {
    client: reqwest::Client,
    target: RwLock<Option<Origin>>,
    transformer: ProxyContentTransformer,
    config: ProxyConfig,
}

impl ProxyContext {
    /// Build the shared upstream client from `config`
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;
        Self::with_client(client, config)
    }

    /// Use an existing client; `initial_target`, when set, must be a valid origin
    pub fn with_client(client: reqwest::Client, config: ProxyConfig) -> Result<Self, ProxyError> {
        let target = config
            .initial_target
            .as_deref()
            .map(Origin::parse)
            .transpose()?;

        Ok(Self {
            client,
            target: RwLock::new(target),
            transformer: ProxyContentTransformer::new(config.route_prefix.as_str()),
            config,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn transformer(&self) -> &ProxyContentTransformer {
        &self.transformer
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub async fn target(&self) -> Option<Origin> {
        self.target.read().await.clone()
    }

    /// Replace the active origin for all subsequent requests
    pub async fn set_target(&self, raw: &str) -> Result<Origin, ProxyError> {
        let origin = Origin::parse(raw)?;
        log::info!(target: "sitemirror::proxy", "Proxy target set to {origin}");
        *self.target.write().await = Some(origin.clone());
        Ok(origin)
    }

    /// Upstream path for a proxied request path (no leading `/`).
    ///
    /// A leading route prefix is removed; paths outside it pass unchanged.
    pub fn strip_route_prefix<'a>(&self, path: &'a str) -> &'a str {
        let prefix = self.transformer.route_prefix().trim_start_matches('/');
        if prefix.is_empty() {
            return path;
        }
        match path.strip_prefix(prefix) {
            Some("") => "",
            Some(rest) => rest.strip_prefix('/').unwrap_or(path),
            None => path,
        }
    }

    /// `{origin}/{path}?{query}` with the query forwarded verbatim
    pub fn upstream_url(origin: &Origin, path: &str, query: Option<&str>) -> Url {
        let mut url = origin.base_url().clone();
        url.set_path(&format!("/{}", path.trim_start_matches('/')));
        url.set_query(query.filter(|q| !q.is_empty()));
        url
    }
}
