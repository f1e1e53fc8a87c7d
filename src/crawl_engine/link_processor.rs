//! Page preparation and link discovery
//!
//! All document work for one page happens here, synchronously: parse, collect
//! references in their pre-rewrite form, rewrite for the mirror, serialize.
//! Only plain data leaves this module, so no document tree is ever held across
//! an await point.

use std::collections::HashSet;

use log::debug;

use crate::link_rewriter::{
    Document, LinkRewriter, ParseError, ReferenceRole, RewriteStats, collect_references,
};
use crate::patterns::PatternSnapshot;
use crate::utils::{CanonicalUrl, Origin, Resolution, resolve};

/// A rewritten page plus the same-origin URLs it references
#[derive(Debug, Clone)]
pub struct PreparedPage {
    pub html: String,
    /// Anchor and iframe targets, de-duplicated, in document order
    pub links: Vec<CanonicalUrl>,
    /// Stylesheets, scripts, images and media, de-duplicated, in document order
    pub resources: Vec<CanonicalUrl>,
    pub stats: RewriteStats,
}

/// Parse `body`, discover same-origin references, and rewrite the document.
///
/// `page_url` is where the body was actually served from (the redirect
/// target, if any) and anchors relative resolution; `origin` stays the
/// session origin. Navigation targets matching a learned template are
/// replaced by their normalized form in both the rewritten page and the
/// returned links.
pub fn prepare_page(
    body: &[u8],
    page_url: &CanonicalUrl,
    origin: &Origin,
    rewriter: &LinkRewriter,
    patterns: Option<&PatternSnapshot>,
) -> Result<PreparedPage, ParseError> {
    let document = Document::parse_bytes(body);
    let navigate = |url: CanonicalUrl| normalize_link(url, patterns);

    let mut links = Vec::new();
    let mut resources = Vec::new();
    let mut seen_links = HashSet::new();
    let mut seen_resources = HashSet::new();

    for reference in collect_references(&document) {
        let (bucket, seen) = match reference.role {
            ReferenceRole::Navigation => (&mut links, &mut seen_links),
            ReferenceRole::Resource => (&mut resources, &mut seen_resources),
            ReferenceRole::Other => continue,
        };

        match resolve(&reference.raw_value, page_url.as_url()) {
            Ok(Resolution::Url(url)) if url.is_same_origin(origin) => {
                let url = if reference.role == ReferenceRole::Navigation {
                    navigate(url)
                } else {
                    url
                };
                if url.is_same_origin(origin) && seen.insert(url.clone()) {
                    bucket.push(url);
                }
            }
            Ok(_) => {}
            Err(e) => {
                debug!(
                    target: "sitemirror::links",
                    "Ignoring unresolvable {} on {page_url}: {e}",
                    reference.attribute
                );
            }
        }
    }

    let stats = rewriter.rewrite_navigating(&document, page_url.as_url(), origin, navigate);
    let html = document.serialize()?;

    debug!(
        target: "sitemirror::links",
        "Prepared {page_url}: {} links, {} resources, {} references rewritten",
        links.len(),
        resources.len(),
        stats.total()
    );

    Ok(PreparedPage {
        html,
        links,
        resources,
        stats,
    })
}

/// Map `url` onto the stored example of the first template it fits.
///
/// Relative examples resolve against `url`; unusable ones leave it as is.
fn normalize_link(url: CanonicalUrl, patterns: Option<&PatternSnapshot>) -> CanonicalUrl {
    let Some(normalized) = patterns.and_then(|patterns| patterns.normalize(url.as_str())) else {
        return url;
    };
    if normalized == url.as_str() {
        return url;
    }

    match resolve(normalized, url.as_url()) {
        Ok(Resolution::Url(target)) => {
            debug!(target: "sitemirror::links", "Normalized {url} to {target}");
            target
        }
        _ => url,
    }
}
