//! Fetch capability consumed by the crawl scheduler.
//!
//! [`Fetcher`] is the seam between scheduling and the network: the scheduler
//! only ever sees `{status, content_type, body}` or a [`FetchError`].

use std::future::Future;

use bytes::{Bytes, BytesMut};

use super::crawl_types::FetchError;
use crate::config::CrawlConfig;
use crate::utils::CanonicalUrl;

/// A successfully fetched body
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    /// Where the body was served from, when redirects led away from the
    /// requested URL
    pub final_url: Option<CanonicalUrl>,
}

impl FetchedResource {
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(media_type)
    }

    /// HTML by declared type; untyped bodies are sniffed for a leading `<`
    pub fn is_html(&self) -> bool {
        match self.media_type() {
            Some(media) => media == "text/html" || media == "application/xhtml+xml",
            None => self
                .body
                .iter()
                .find(|b| !b.is_ascii_whitespace())
                .is_some_and(|&b| b == b'<'),
        }
    }
}

/// Media type of a `Content-Type` value, lowercased and without parameters
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Obtains the bytes behind a URL
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        url: &CanonicalUrl,
    ) -> impl Future<Output = Result<FetchedResource, FetchError>> + Send;
}

/// reqwest-backed fetcher; one client shared by every task of a session
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, max_body_bytes: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(client, max_body_bytes))
    }

    pub fn with_client(client: reqwest::Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.user_agent(), config.max_resource_bytes())
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedResource, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(too_large());
        }

        let final_url = CanonicalUrl::from_url(response.url().clone())
            .ok()
            .filter(|served| served != url);
        if let Some(served) = &final_url {
            log::debug!(target: "sitemirror::fetch", "{url} redirected to {served}");
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(request_error)? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        log::debug!(
            target: "sitemirror::fetch",
            "Fetched {url} ({} bytes, {})",
            body.len(),
            content_type.as_deref().unwrap_or("no content type")
        );

        Ok(FetchedResource {
            status: status.as_u16(),
            content_type,
            body: body.freeze(),
            final_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(content_type: Option<&str>, body: &'static str) -> FetchedResource {
        FetchedResource {
            status: 200,
            content_type: content_type.map(str::to_string),
            body: Bytes::from_static(body.as_bytes()),
            final_url: None,
        }
    }

    #[test]
    fn test_html_detection() {
        assert!(resource(Some("text/html; charset=utf-8"), "").is_html());
        assert!(resource(Some("Application/XHTML+XML"), "").is_html());
        assert!(!resource(Some("text/css"), "<not html>").is_html());
        assert!(resource(None, "  \n<!doctype html>").is_html());
        assert!(!resource(None, "\u{89}PNG").is_html());
    }

    #[tokio::test]
    async fn test_http_fetcher_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<p>hi</p>")
            .create_async()
            .await;
        let missing = server.mock("GET", "/missing").with_status(404).create_async().await;

        let fetcher = HttpFetcher::new("test-agent", 1024).unwrap();
        let base = server.url();

        let ok = fetcher
            .fetch(&CanonicalUrl::parse(&format!("{base}/page")).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status, 200);
        assert_eq!(&ok.body[..], b"<p>hi</p>");
        assert!(ok.is_html());
        assert!(ok.final_url.is_none());

        let err = fetcher
            .fetch(&CanonicalUrl::parse(&format!("{base}/missing")).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));

        page.assert_async().await;
        missing.assert_async().await;
    }

    #[tokio::test]
    async fn test_body_limit_enforced() {
        let mut server = mockito::Server::new_async().await;
        let _big = server
            .mock("GET", "/big")
            .with_status(200)
            .with_body(vec![b'x'; 4096])
            .create_async()
            .await;

        let fetcher = HttpFetcher::new("test-agent", 1024).unwrap();
        let err = fetcher
            .fetch(&CanonicalUrl::parse(&format!("{}/big", server.url())).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn test_redirect_target_recorded() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _moved = server
            .mock("GET", "/docs")
            .with_status(301)
            .with_header("location", &format!("{base}/docs/"))
            .create_async()
            .await;
        let _index = server
            .mock("GET", "/docs/")
            .with_header("content-type", "text/html")
            .with_body("<p>docs</p>")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new("test-agent", 1024).unwrap();
        let fetched = fetcher
            .fetch(&CanonicalUrl::parse(&format!("{base}/docs")).unwrap())
            .await
            .unwrap();

        assert_eq!(
            fetched.final_url.map(|url| url.to_string()),
            Some(format!("{base}/docs/"))
        );
    }
}
