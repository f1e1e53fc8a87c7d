//! URL canonicalization for mirroring and proxying.
//!
//! This module resolves raw attribute values against a base URL, decides whether a
//! reference stays on the session origin, and maps canonical URLs onto the two
//! output addressing schemes: mirror paths on disk and proxy routes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

/// Errors produced while canonicalizing URLs
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("Failed to parse URL '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("Unsupported scheme '{scheme}' in {url}")]
    UnsupportedScheme { scheme: String, url: String },
}

/// Prefixes of references that are never resolved or rewritten.
const OPAQUE_PREFIXES: &[&str] = &["data:", "javascript:", "mailto:", "tel:", "blob:", "about:"];

fn is_opaque(raw: &str) -> bool {
    OPAQUE_PREFIXES.iter().any(|prefix| {
        raw.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}

fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// `{scheme, host}` of a crawl or proxy session.
///
/// Immutable once built. The explicit port, when present, is part of the host
/// identity so `localhost:8080` and `localhost:9090` are distinct origins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
    base: Url,
}

impl Origin {
    /// Parse the origin of an absolute http(s) URL
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let input = input.trim();
        let url = Url::parse(input).map_err(|source| UrlError::Parse {
            url: input.to_string(),
            source,
        })?;
        Self::from_url(&url)
    }

    pub fn from_url(url: &Url) -> Result<Self, UrlError> {
        if !is_web_scheme(url) {
            return Err(UrlError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                url: url.to_string(),
            });
        }
        let host = url
            .host_str()
            .ok_or_else(|| UrlError::MissingHost(url.to_string()))?
            .to_ascii_lowercase();

        let mut base = url.clone();
        base.set_path("/");
        base.set_query(None);
        base.set_fragment(None);
        // Credentials never belong to an origin; both setters only fail on
        // cannot-be-a-base URLs, which http(s) URLs never are.
        let _ = base.set_username("");
        let _ = base.set_password(None);

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port(),
            base,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// `host[:port]`, the network location compared by same-origin checks
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        }
    }

    /// Root URL of the origin (`scheme://host[:port]/`), used as a resolution base
    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority())
    }
}

/// An absolute http(s) URL with its fragment removed.
///
/// Cheap to clone; equality and hashing use the serialized form, which makes it
/// the unit of de-duplication for a crawl session.
#[derive(Clone, Debug)]
pub struct CanonicalUrl {
    url: Arc<Url>,
}

impl CanonicalUrl {
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let input = input.trim();
        let url = Url::parse(input).map_err(|source| UrlError::Parse {
            url: input.to_string(),
            source,
        })?;
        Self::from_url(url)
    }

    pub fn from_url(mut url: Url) -> Result<Self, UrlError> {
        if !is_web_scheme(&url) {
            return Err(UrlError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                url: url.to_string(),
            });
        }
        if url.host_str().is_none() {
            return Err(UrlError::MissingHost(url.to_string()));
        }
        url.set_fragment(None);
        Ok(Self { url: Arc::new(url) })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    pub fn origin(&self) -> Result<Origin, UrlError> {
        Origin::from_url(&self.url)
    }

    pub fn is_same_origin(&self, origin: &Origin) -> bool {
        url_is_same_origin(&self.url, origin)
    }

    /// Path followed by `?query` when the URL carries one
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{query}", self.url.path()),
            None => self.url.path().to_string(),
        }
    }
}

impl PartialEq for CanonicalUrl {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for CanonicalUrl {}

impl Hash for CanonicalUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::str::FromStr for CanonicalUrl {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Outcome of resolving a raw reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The reference resolved to an absolute http(s) URL
    Url(CanonicalUrl),
    /// `data:`, `javascript:`, fragment-only, empty and other values that are never rewritten
    Opaque,
}

impl Resolution {
    #[must_use]
    pub fn into_url(self) -> Option<CanonicalUrl> {
        match self {
            Self::Url(url) => Some(url),
            Self::Opaque => None,
        }
    }

    #[must_use]
    pub fn is_rewritable(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

/// Resolve a raw attribute value against `base`.
///
/// `base` is either an origin root or the URL of the document the value was found
/// in. Protocol-relative values inherit the base scheme, root-relative values the
/// base scheme and host, and anything else relative is joined onto the base path.
pub fn resolve(raw: &str, base: &Url) -> Result<Resolution, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || is_opaque(raw) {
        return Ok(Resolution::Opaque);
    }

    let joined = base.join(raw).map_err(|source| UrlError::Parse {
        url: raw.to_string(),
        source,
    })?;

    if !is_web_scheme(&joined) {
        return Ok(Resolution::Opaque);
    }

    CanonicalUrl::from_url(joined).map(Resolution::Url)
}

/// Resolve a raw value against the root of `origin`
pub fn resolve_against_origin(raw: &str, origin: &Origin) -> Result<Resolution, UrlError> {
    resolve(raw, origin.base_url())
}

/// True when a raw reference points at `origin`.
///
/// A value without a host (root- or path-relative) already implies the current
/// origin. Opaque values are never same-origin.
pub fn is_same_origin(raw: &str, origin: &Origin) -> bool {
    let raw = raw.trim();
    if raw.is_empty() || is_opaque(raw) {
        return false;
    }

    if let Some(rest) = raw.strip_prefix("//") {
        return match Url::parse(&format!("{}://{rest}", origin.scheme())) {
            Ok(url) => url_is_same_origin(&url, origin),
            Err(_) => false,
        };
    }

    match Url::parse(raw) {
        Ok(url) => url_is_same_origin(&url, origin),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

/// Host and explicit port comparison; the scheme is not part of the check
pub fn url_is_same_origin(url: &Url, origin: &Origin) -> bool {
    if !is_web_scheme(url) {
        return false;
    }
    match url.host_str() {
        Some(host) => host.eq_ignore_ascii_case(origin.host()) && url.port() == origin.port(),
        None => false,
    }
}

/// Filesystem-relative location of a mirrored URL (always `/`-separated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MirrorPath(String);

impl MirrorPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute location of this mirror path below `root`
    pub fn under(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }
}

impl fmt::Display for MirrorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a canonical URL to its mirror path.
///
/// Scheme and host are stripped along with the leading slash. Directory-like
/// paths (empty, `/`-terminated, or a final segment without an extension) get
/// `index.html` appended. Query strings are dropped, so URLs that differ only by
/// query share one mirror file and the last write wins.
pub fn to_mirror_path(url: &CanonicalUrl) -> MirrorPath {
    mirror_path_for(url.path())
}

fn mirror_path_for(path: &str) -> MirrorPath {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return MirrorPath("index.html".to_string());
    }
    if trimmed.ends_with('/') {
        return MirrorPath(format!("{trimmed}index.html"));
    }

    let last_segment = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if last_segment.contains('.') {
        MirrorPath(trimmed.to_string())
    } else {
        MirrorPath(format!("{trimmed}/index.html"))
    }
}

/// Root-relative reference written into mirrored documents.
///
/// The query is dropped like in [`to_mirror_path`]; a static file server maps the
/// result onto the mirror path through its directory-index rule.
pub fn mirror_reference(url: &CanonicalUrl) -> String {
    url.path().to_string()
}

/// Route under a proxy prefix; the query string is preserved
pub fn proxy_route(url: &CanonicalUrl, route_prefix: &str) -> String {
    format!("{}{}", route_prefix.trim_end_matches('/'), url.path_and_query())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Origin {
        Origin::parse("http://x.com").unwrap()
    }

    fn resolved(raw: &str) -> String {
        resolve_against_origin(raw, &origin())
            .unwrap()
            .into_url()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_resolve_root_relative() {
        assert_eq!(resolved("/a/b"), "http://x.com/a/b");
    }

    #[test]
    fn test_resolve_protocol_relative() {
        assert_eq!(resolved("//x.com/p"), "http://x.com/p");

        let https = Origin::parse("https://x.com/some/page").unwrap();
        let url = resolve_against_origin("//cdn.y.com/lib.js", &https)
            .unwrap()
            .into_url()
            .unwrap();
        assert_eq!(url.as_str(), "https://cdn.y.com/lib.js");
    }

    #[test]
    fn test_resolve_relative_against_page() {
        let page = Url::parse("http://x.com/docs/guide/intro").unwrap();
        let url = resolve("next", &page).unwrap().into_url().unwrap();
        assert_eq!(url.as_str(), "http://x.com/docs/guide/next");
    }

    #[test]
    fn test_resolve_strips_fragment() {
        assert_eq!(resolved("/page#section"), "http://x.com/page");
    }

    #[test]
    fn test_resolve_opaque_values() {
        for raw in [
            "data:image/png;base64,AAAA",
            "javascript:void(0)",
            "JavaScript:alert(1)",
            "mailto:someone@x.com",
            "#top",
            "",
            "   ",
        ] {
            assert_eq!(
                resolve_against_origin(raw, &origin()).unwrap(),
                Resolution::Opaque,
                "{raw} should be opaque"
            );
        }
    }

    #[test]
    fn test_resolve_non_web_scheme_is_opaque() {
        assert_eq!(
            resolve_against_origin("ftp://x.com/file", &origin()).unwrap(),
            Resolution::Opaque
        );
    }

    #[test]
    fn test_is_same_origin() {
        let origin = origin();
        assert!(is_same_origin("/relative/path", &origin));
        assert!(is_same_origin("sibling.html", &origin));
        assert!(is_same_origin("http://x.com/a", &origin));
        assert!(is_same_origin("https://X.com/a", &origin));
        assert!(is_same_origin("//x.com/a", &origin));
        assert!(!is_same_origin("data:image/png;base64,AAAA", &origin));
        assert!(!is_same_origin("http://cdn.other.com/a.png", &origin));
        assert!(!is_same_origin("//cdn.other.com/a.png", &origin));
        assert!(!is_same_origin("http://x.com:8080/a", &origin));
    }

    #[test]
    fn test_relative_path_same_origin_regardless_of_declared_origin() {
        let elsewhere = Origin::parse("https://unrelated.org").unwrap();
        assert!(is_same_origin("/relative/path", &elsewhere));
    }

    #[test]
    fn test_mirror_paths() {
        let cases = [
            ("http://x.com/", "index.html"),
            ("http://x.com", "index.html"),
            ("http://x.com/a/", "a/index.html"),
            ("http://x.com/a/b.png", "a/b.png"),
            ("http://x.com/page2?x=1", "page2/index.html"),
            ("http://x.com/docs/guide", "docs/guide/index.html"),
            ("http://x.com/docs/v1.2/", "docs/v1.2/index.html"),
        ];
        for (url, expected) in cases {
            let url = CanonicalUrl::parse(url).unwrap();
            assert_eq!(to_mirror_path(&url).as_str(), expected, "mirror path for {url}");
        }
    }

    #[test]
    fn test_query_variants_share_mirror_path() {
        let a = CanonicalUrl::parse("http://x.com/list?page=1").unwrap();
        let b = CanonicalUrl::parse("http://x.com/list?page=2").unwrap();
        assert_eq!(to_mirror_path(&a), to_mirror_path(&b));
    }

    #[test]
    fn test_mirror_path_under_root() {
        let url = CanonicalUrl::parse("http://x.com/a/b.png").unwrap();
        let path = to_mirror_path(&url).under(Path::new("site"));
        assert_eq!(path, Path::new("site").join("a").join("b.png"));
    }

    #[test]
    fn test_reference_forms() {
        let url = CanonicalUrl::parse("http://example.com/page2?x=1").unwrap();
        assert_eq!(mirror_reference(&url), "/page2");
        assert_eq!(proxy_route(&url, ""), "/page2?x=1");
        assert_eq!(proxy_route(&url, "/p/"), "/p/page2?x=1");
    }

    #[test]
    fn test_origin_display_and_authority() {
        let origin = Origin::parse("http://user:pw@Example.com:8080/path?q#f").unwrap();
        assert_eq!(origin.host(), "example.com");
        assert_eq!(origin.authority(), "example.com:8080");
        assert_eq!(origin.to_string(), "http://example.com:8080");
        assert_eq!(origin.base_url().as_str(), "http://example.com:8080/");
    }
}
