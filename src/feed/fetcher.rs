use crate::util::{validate_proxy_base, validate_url, UrlValidationError};
use futures::StreamExt;
use thiserror::Error;
use url::Url;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a feed through the proxy.
///
/// Every variant is a network-kind failure from the caller's point of view;
/// none of them is retried here.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("Network response was not ok: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// The feed URL or proxy base was rejected before any request was sent
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
}

/// Fetches raw feed documents through a CORS-style proxy.
///
/// The proxy receives the target feed as a percent-encoded `url` query
/// parameter and relays the document body unchanged.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    proxy_base: Url,
}

impl FeedFetcher {
    /// Creates a fetcher for the given proxy endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the proxy base is not HTTPS
    /// (plain HTTP is accepted for localhost only).
    pub fn new(client: reqwest::Client, proxy_base: &str) -> Result<Self, FetchError> {
        let proxy_base = validate_proxy_base(proxy_base)?;
        Ok(Self { client, proxy_base })
    }

    /// Builds `<proxy-base>?url=<encoded feed URL>`, keeping any query pairs
    /// already present on the proxy base.
    pub fn proxy_url(&self, feed_url: &Url) -> Url {
        let mut url = self.proxy_base.clone();
        url.query_pairs_mut().append_pair("url", feed_url.as_str());
        url
    }

    /// Performs a single GET for `feed_url` and returns the body as text.
    ///
    /// No timeout, retry, or backoff is applied: one call is one request.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] - feed URL is not a public http(s) URL
    /// - [`FetchError::Network`] - connection, TLS or body read failure
    /// - [`FetchError::HttpStatus`] - non-2xx response
    /// - [`FetchError::ResponseTooLarge`] - body exceeded 10MB
    pub async fn fetch(&self, feed_url: &str) -> Result<String, FetchError> {
        let target = validate_url(feed_url)?;
        let request_url = self.proxy_url(&target);

        tracing::debug!(feed = %target, proxy = %self.proxy_base, "Fetching feed through proxy");

        let response = self.client.get(request_url).send().await?;

        if !response.status().is_success() {
            tracing::warn!(feed = %target, status = %response.status(), "Proxy returned error status");
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
        tracing::debug!(feed = %target, bytes = bytes.len(), "Feed downloaded");

        // Only UTF-8 is supported: the `encoding=` declaration and the
        // Content-Type charset are ignored, and invalid bytes become U+FFFD.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
