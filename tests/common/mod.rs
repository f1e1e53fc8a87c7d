//! Test utilities and helper functions for the sitemirror test suite

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use kodegen_tools_sitemirror::crawl_engine::{FetchError, FetchedResource, Fetcher};
use kodegen_tools_sitemirror::utils::CanonicalUrl;

/// Creates a test HTML document with specified content
#[allow(dead_code)]
pub fn create_test_html(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
</head>
<body>
    {body}
</body>
</html>"#
    )
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
enum Canned {
    Body {
        content_type: &'static str,
        body: Bytes,
    },
    Status(u16),
    Hang,
}

/// In-memory site served through the `Fetcher` seam, counting every fetch
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FakeSite {
    responses: HashMap<String, Canned>,
    hits: DashMap<String, usize>,
}

#[allow(dead_code)]
impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(self, url: &str, body: impl Into<String>) -> Self {
        self.with(url, "text/html; charset=utf-8", Bytes::from(body.into()))
    }

    pub fn file(self, url: &str, content_type: &'static str, body: &'static [u8]) -> Self {
        self.with(url, content_type, Bytes::from_static(body))
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Canned::Status(status));
        self
    }

    /// Never answers; only a fetch timeout ends the request
    pub fn hang(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), Canned::Hang);
        self
    }

    fn with(mut self, url: &str, content_type: &'static str, body: Bytes) -> Self {
        self.responses
            .insert(url.to_string(), Canned::Body { content_type, body });
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.get(url).map_or(0, |count| *count)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.iter().map(|entry| *entry.value()).sum()
    }
}

impl Fetcher for FakeSite {
    async fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedResource, FetchError> {
        *self.hits.entry(url.to_string()).or_insert(0) += 1;

        match self.responses.get(url.as_str()).cloned() {
            Some(Canned::Body { content_type, body }) => Ok(FetchedResource {
                status: 200,
                content_type: Some(content_type.to_string()),
                body,
                final_url: None,
            }),
            Some(Canned::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Some(Canned::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::Other {
                    url: url.to_string(),
                    message: "hung fetch returned".to_string(),
                })
            }
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
