//! Response-time rewriting for the reverse proxy.

use bytes::Bytes;
use url::Url;

use crate::crawl_engine::fetcher::media_type;
use crate::link_rewriter::{Document, LinkRewriter, ParseError, RewriteTarget};
use crate::utils::Origin;

/// How the proxy treats an upstream body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyHandling {
    /// Streamed to the client unmodified, never buffered
    Stream,
    /// Buffered and passed through unchanged
    Buffer,
    /// Buffered, parsed and rewritten onto proxy routes
    Rewrite,
}

impl BodyHandling {
    /// Classify by media type; parameters such as `charset` are ignored.
    ///
    /// Text, script and JSON bodies are buffered. A missing content type is
    /// treated as opaque bytes.
    pub fn for_content_type(content_type: Option<&str>) -> Self {
        let Some(media) = content_type.map(media_type) else {
            return Self::Stream;
        };

        if media == "text/html" {
            Self::Rewrite
        } else if media.starts_with("text/")
            || media == "application/javascript"
            || media == "application/json"
        {
            Self::Buffer
        } else {
            Self::Stream
        }
    }
}

/// Rewrites upstream HTML so every same-origin reference routes back through
/// the proxy.
///
/// Holds no per-request state; one instance serves all requests.
#[derive(Debug, Clone)]
pub struct ProxyContentTransformer {
    rewriter: LinkRewriter,
}

impl ProxyContentTransformer {
    /// `<base>` elements are always removed so a page cannot redirect
    /// resolution away from its proxy route.
    pub fn new(route_prefix: impl Into<String>) -> Self {
        Self {
            rewriter: LinkRewriter::new(RewriteTarget::proxy(route_prefix)).with_strip_base(true),
        }
    }

    pub fn route_prefix(&self) -> &str {
        match self.rewriter.target() {
            RewriteTarget::Proxy { route_prefix } => route_prefix.as_str(),
            RewriteTarget::Mirror => "",
        }
    }

    /// Transform one upstream body.
    ///
    /// Same-origin means `origin`, the active proxy target. `page_url` is the
    /// upstream URL the body was served from (after redirects) and only anchors
    /// relative resolution. Anything that is not `text/html` comes back
    /// untouched.
    pub fn transform(
        &self,
        body: Bytes,
        content_type: Option<&str>,
        origin: &Origin,
        page_url: &Url,
    ) -> Result<Bytes, ParseError> {
        if BodyHandling::for_content_type(content_type) != BodyHandling::Rewrite {
            return Ok(body);
        }

        let document = Document::parse_bytes(&body);
        let stats = self.rewriter.rewrite_for_origin(&document, page_url, origin);
        if stats.is_unchanged() {
            return Ok(body);
        }

        log::debug!(
            target: "sitemirror::proxy",
            "Rewrote {} references in {page_url}",
            stats.total()
        );
        Ok(Bytes::from(document.serialize()?))
    }
}
