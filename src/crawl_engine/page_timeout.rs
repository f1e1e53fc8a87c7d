//! Timeout utilities for fetch operations
//!
//! Every page and resource fetch goes through [`with_fetch_timeout`] so a
//! stalled origin can never hang a crawl session.

use std::future::Future;
use std::time::Duration;

use super::crawl_types::FetchError;
use crate::utils::CanonicalUrl;

/// Wrap a fetch with an externally enforced timeout
///
/// An expired timeout is reported as [`FetchError::Timeout`] and is handled
/// by callers exactly like any other fetch failure.
///
/// # Arguments
/// * `operation` - The fetch future
/// * `timeout_secs` - Timeout duration in seconds
/// * `url` - URL being fetched, for the error message
pub async fn with_fetch_timeout<F, T>(
    operation: F,
    timeout_secs: u64,
    url: &CanonicalUrl,
) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            secs: timeout_secs,
        }),
    }
}
