//! Structural link rewriting over parsed HTML documents.
//!
//! One resolution and classification procedure serves both outputs:
//! 1. Static mirrors, where same-origin references become root-relative paths
//!    that a file server maps onto the mirror tree
//! 2. The reverse proxy, where same-origin references become routes under the
//!    proxy's prefix (query preserved)
//!
//! Cross-origin and opaque (`data:`, `javascript:`, fragment-only, ...) values
//! are never modified. Rewriting is idempotent for a fixed target.

pub mod document;
pub mod srcset;
pub mod style_urls;

use url::Url;

pub use document::{Document, Element, ElementKind, ParseError};

use crate::utils::{CanonicalUrl, Origin, Resolution, mirror_reference, proxy_route, resolve};

/// Attributes read on every link-bearing element
pub const LINK_ATTRIBUTES: &[&str] = &["href", "src", "action", "data-src"];

/// `rel` tokens that make a `<link>` a materialized resource rather than metadata
const RESOURCE_LINK_RELS: &[&str] = &[
    "stylesheet",
    "icon",
    "shortcut",
    "apple-touch-icon",
    "mask-icon",
    "manifest",
    "preload",
    "prefetch",
    "modulepreload",
];

/// Output form for rewritten references
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteTarget {
    /// Static mirror. References are root-relative paths and do not depend on
    /// where the mirror tree lives on disk.
    Mirror,
    /// Reverse proxy serving the origin under `route_prefix` (may be empty)
    Proxy { route_prefix: String },
}

impl RewriteTarget {
    /// A trailing `/` on the prefix is dropped; `"/"` and `""` are equivalent
    pub fn proxy(route_prefix: impl Into<String>) -> Self {
        let prefix: String = route_prefix.into();
        Self::Proxy {
            route_prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Reference written for a same-origin URL
    pub fn reference_for(&self, url: &CanonicalUrl) -> String {
        match self {
            Self::Mirror => mirror_reference(url),
            Self::Proxy { route_prefix } => proxy_route(url, route_prefix),
        }
    }

    /// Whether `raw` is already in this target's output form.
    ///
    /// Only a non-empty proxy prefix makes this detectable; for the other
    /// targets re-resolution already maps outputs onto themselves.
    fn already_rewritten(&self, raw: &str) -> bool {
        match self {
            Self::Proxy { route_prefix } if !route_prefix.is_empty() => {
                let raw = raw.trim();
                raw == route_prefix
                    || raw
                        .strip_prefix(route_prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
            }
            _ => false,
        }
    }
}

/// Counts of what one rewrite pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// `href`/`src`/`action`/`data-src` values replaced
    pub attributes: usize,
    /// Individual `srcset` candidates replaced
    pub srcset_candidates: usize,
    /// `url()` values replaced in inline styles and `<style>` blocks
    pub style_urls: usize,
    /// `<base>` elements removed
    pub base_elements_removed: usize,
}

impl RewriteStats {
    pub fn total(&self) -> usize {
        self.attributes + self.srcset_candidates + self.style_urls + self.base_elements_removed
    }

    pub fn is_unchanged(&self) -> bool {
        self.total() == 0
    }
}

/// How a discovered reference is used by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceRole {
    /// Anchor or iframe target: a document the crawler may visit
    Navigation,
    /// Stylesheet, script, image or media: mirrored as raw bytes
    Resource,
    /// Form actions and metadata links: rewritten but never fetched
    Other,
}

/// A raw reference found by [`collect_references`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    pub owner: ElementKind,
    /// Attribute the value came from; `"#text"` for `<style>` contents
    pub attribute: &'static str,
    pub raw_value: String,
    pub role: ReferenceRole,
}

/// Rewrites same-origin references in a [`Document`] for one [`RewriteTarget`]
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    target: RewriteTarget,
    strip_base: bool,
}

impl LinkRewriter {
    /// `<base>` elements are stripped by default for proxy targets only
    pub fn new(target: RewriteTarget) -> Self {
        let strip_base = matches!(target, RewriteTarget::Proxy { .. });
        Self { target, strip_base }
    }

    #[must_use]
    pub fn with_strip_base(mut self, strip_base: bool) -> Self {
        self.strip_base = strip_base;
        self
    }

    pub fn target(&self) -> &RewriteTarget {
        &self.target
    }

    /// Rewrite every same-origin reference in `document`.
    ///
    /// `base` is the URL the document was served from (or the origin root); it
    /// defines both relative resolution and which references count as
    /// same-origin.
    pub fn rewrite(&self, document: &Document, base: &Url) -> RewriteStats {
        match Origin::from_url(base) {
            Ok(origin) => self.rewrite_for_origin(document, base, &origin),
            Err(e) => {
                log::warn!(target: "sitemirror::links", "Not rewriting document with unusable base {base}: {e}");
                RewriteStats::default()
            }
        }
    }

    /// Like [`rewrite`](Self::rewrite), with the same-origin test pinned to
    /// `origin` while relative values still resolve against `base`.
    ///
    /// Used when the document was served from somewhere other than the
    /// session origin, such as after an upstream redirect.
    pub fn rewrite_for_origin(&self, document: &Document, base: &Url, origin: &Origin) -> RewriteStats {
        self.rewrite_navigating(document, base, origin, |url| url)
    }

    /// Rewrite with anchor and iframe targets passed through `navigate` first.
    ///
    /// The crawler uses this to point stale links at their normalized form,
    /// so the written reference and the URL it follows agree.
    pub fn rewrite_navigating(
        &self,
        document: &Document,
        base: &Url,
        origin: &Origin,
        navigate: impl Fn(CanonicalUrl) -> CanonicalUrl,
    ) -> RewriteStats {
        let mut stats = RewriteStats::default();

        if self.strip_base {
            for base_element in document.elements_of(ElementKind::Base) {
                base_element.detach();
                stats.base_elements_removed += 1;
            }
        }

        for element in document.elements() {
            let kind = element.kind();

            if kind.carries_links() {
                for &attribute in LINK_ATTRIBUTES {
                    let Some(value) = element.get_attribute(attribute) else {
                        continue;
                    };
                    let new_value = if attribute_role(kind, attribute, &element)
                        == ReferenceRole::Navigation
                    {
                        self.rewrite_value_with(&value, base, origin, &navigate)
                    } else {
                        self.rewrite_value(&value, base, origin)
                    };
                    if let Some(new_value) = new_value
                        && new_value != value
                    {
                        element.set_attribute(attribute, &new_value);
                        stats.attributes += 1;
                    }
                }
            }

            if kind.carries_srcset()
                && let Some(value) = element.get_attribute("srcset")
            {
                let (new_value, changed) =
                    srcset::rewrite_srcset(&value, |url| self.rewrite_value(url, base, origin));
                if changed > 0 {
                    element.set_attribute("srcset", &new_value);
                    stats.srcset_candidates += changed;
                }
            }

            if let Some(style) = element.get_attribute("style") {
                let (new_style, changed) =
                    style_urls::rewrite_style_urls(&style, |url| self.rewrite_value(url, base, origin));
                if changed > 0 {
                    element.set_attribute("style", &new_style);
                    stats.style_urls += changed;
                }
            }

            if kind == ElementKind::Style {
                let css = element.text();
                let (new_css, changed) =
                    style_urls::rewrite_style_urls(&css, |url| self.rewrite_value(url, base, origin));
                if changed > 0 {
                    element.set_text(&new_css);
                    stats.style_urls += changed;
                }
            }
        }

        log::debug!(
            target: "sitemirror::links",
            "Rewrote {} references in document from {base}",
            stats.total()
        );

        stats
    }

    /// Rewrite a single raw value; `None` means leave it as written
    pub fn rewrite_value(&self, raw: &str, base: &Url, origin: &Origin) -> Option<String> {
        self.rewrite_value_with(raw, base, origin, |url| url)
    }

    fn rewrite_value_with(
        &self,
        raw: &str,
        base: &Url,
        origin: &Origin,
        map: impl Fn(CanonicalUrl) -> CanonicalUrl,
    ) -> Option<String> {
        if self.target.already_rewritten(raw) {
            return None;
        }

        match resolve(raw, base) {
            Ok(Resolution::Url(url)) if url.is_same_origin(origin) => {
                let url = map(url);
                if url.is_same_origin(origin) {
                    Some(self.target.reference_for(&url))
                } else {
                    Some(url.to_string())
                }
            }
            Ok(_) => None,
            Err(e) => {
                log::debug!(target: "sitemirror::links", "Leaving unresolvable reference {raw:?}: {e}");
                None
            }
        }
    }
}

fn link_role(element: &Element) -> ReferenceRole {
    let rel = element.get_attribute("rel").unwrap_or_default().to_ascii_lowercase();
    if rel
        .split_whitespace()
        .any(|token| RESOURCE_LINK_RELS.contains(&token))
    {
        ReferenceRole::Resource
    } else {
        ReferenceRole::Other
    }
}

fn attribute_role(kind: ElementKind, attribute: &str, element: &Element) -> ReferenceRole {
    match (kind, attribute) {
        (ElementKind::Anchor, "href") | (ElementKind::Iframe, "src") => ReferenceRole::Navigation,
        (ElementKind::Link, "href") => link_role(element),
        (ElementKind::Script | ElementKind::Image | ElementKind::MediaSource, _) => {
            ReferenceRole::Resource
        }
        _ => ReferenceRole::Other,
    }
}

/// Every raw reference in `document`, in document order.
///
/// Values are reported as written; resolution and origin filtering are left to
/// the caller. `srcset` candidates and `url()` values are reported one by one.
pub fn collect_references(document: &Document) -> Vec<ResourceReference> {
    let mut references = Vec::new();

    for element in document.elements() {
        let kind = element.kind();

        if kind.carries_links() {
            for &attribute in LINK_ATTRIBUTES {
                if let Some(value) = element.get_attribute(attribute) {
                    references.push(ResourceReference {
                        owner: kind,
                        attribute,
                        raw_value: value,
                        role: attribute_role(kind, attribute, &element),
                    });
                }
            }
        }

        if kind.carries_srcset()
            && let Some(value) = element.get_attribute("srcset")
        {
            references.extend(srcset::parse_srcset(&value).into_iter().map(|candidate| {
                ResourceReference {
                    owner: kind,
                    attribute: "srcset",
                    raw_value: candidate.url.to_string(),
                    role: ReferenceRole::Resource,
                }
            }));
        }

        if let Some(style) = element.get_attribute("style") {
            references.extend(style_urls::root_relative_urls(&style).into_iter().map(|url| {
                ResourceReference {
                    owner: kind,
                    attribute: "style",
                    raw_value: url,
                    role: ReferenceRole::Resource,
                }
            }));
        }

        if kind == ElementKind::Style {
            references.extend(style_urls::root_relative_urls(&element.text()).into_iter().map(
                |url| ResourceReference {
                    owner: kind,
                    attribute: "#text",
                    raw_value: url,
                    role: ReferenceRole::Resource,
                },
            ));
        }
    }

    references
}
