use crate::feed::error::FeedError;
use crate::feed::parser::{normalize_feed, NormalizedItem};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONCURRENCY: usize = 8;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching and normalizing one feed.
///
/// Every variant is scoped to a single feed. Failed fetches are not retried.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, invalid URL, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was fetched but is not a usable RSS or Atom document
    #[error("Parse error: {0}")]
    Feed(#[from] FeedError),
}

/// Knobs for a round of fetches.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Items kept per feed; 0 keeps all.
    pub limit: usize,
    /// Applies to each request independently.
    pub timeout: Duration,
    /// Maximum number of requests in flight.
    pub concurrency: usize,
    pub max_body_bytes: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            max_body_bytes: MAX_FEED_SIZE,
        }
    }
}

/// Result of a single feed fetch operation.
///
/// Carries the feed URL for diagnostics and either the normalized items or
/// the error that occurred.
#[derive(Debug)]
pub struct FetchResult {
    pub url: String,
    pub result: Result<Vec<NormalizedItem>, FetchError>,
}

/// Fetches and normalizes all feeds concurrently.
///
/// At most `options.concurrency` requests run at once, each under its own
/// timeout. Results come back in input order so the merge stage sees feeds
/// in the order they were configured. A failing feed only affects its own
/// [`FetchResult`].
pub async fn fetch_all(
    client: &reqwest::Client,
    urls: &[String],
    options: &FetchOptions,
) -> Vec<FetchResult> {
    if urls.is_empty() {
        return Vec::new();
    }

    stream::iter(urls.iter())
        .map(|url| async move {
            let result = fetch_feed(client, url, options).await;
            FetchResult {
                url: url.clone(),
                result,
            }
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await
}

/// Fetches one feed and normalizes its entries.
///
/// The source label of every item is derived from `url`.
///
/// # Errors
///
/// - [`FetchError::Network`] - Connection, TLS or URL errors
/// - [`FetchError::Timeout`] - Request exceeded `options.timeout`
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - Body exceeded `options.max_body_bytes`
/// - [`FetchError::Feed`] - Body is not a usable RSS/Atom document
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<Vec<NormalizedItem>, FetchError> {
    let response = tokio::time::timeout(options.timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    // The timeout covers the body as well as the headers
    let bytes = tokio::time::timeout(
        options.timeout,
        read_limited_bytes(response, options.max_body_bytes),
    )
    .await
    .map_err(|_| FetchError::Timeout)??;

    let items = normalize_feed(&bytes, url, options.limit)?;
    tracing::debug!(feed = %url, bytes = bytes.len(), items = items.len(), "Normalized feed");
    Ok(items)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
