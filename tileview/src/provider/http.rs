//! HTTP fetcher using reqwest.
//!
//! Layout of a dataset served over HTTP:
//!
//! | Resource | URL | Body |
//! |---|---|---|
//! | dataset header | `{source}/header` | JSON [`Header`] |
//! | tile header | `{source}/{tile-id}/header` | JSON [`Header`] |
//! | tile content | `{source}/{tile-id}` | raw bytes |

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use super::types::{BoxFuture, FetchError, TileContentFetcher};
use crate::tile::{Header, TileContent, TileRequest};

/// Default request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Fetcher for datasets served over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a new HttpFetcher with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT_SECS)
    }

    /// Creates a new HttpFetcher with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(format!("Failed to read response: {}", e)))
    }

    async fn get_header(&self, url: &str) -> Result<Header, FetchError> {
        let body = self.get(url).await?;
        decode_header(&body)
    }
}

/// URL of the header document under `base`.
fn header_url(base: &str) -> String {
    format!("{}/header", base.trim_end_matches('/'))
}

fn decode_header(body: &[u8]) -> Result<Header, FetchError> {
    serde_json::from_slice(body).map_err(|e| FetchError::Decode(format!("Invalid header: {}", e)))
}

impl TileContentFetcher for HttpFetcher {
    fn load_metadata<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<Header, FetchError>> {
        Box::pin(async move { self.get_header(&header_url(source)).await })
    }

    fn fetch_header<'a>(
        &'a self,
        request: &'a TileRequest,
    ) -> BoxFuture<'a, Result<Header, FetchError>> {
        Box::pin(async move { self.get_header(&header_url(request.url())).await })
    }

    fn fetch_content<'a>(
        &'a self,
        request: &'a TileRequest,
        _header: &'a Header,
    ) -> BoxFuture<'a, Result<TileContent, FetchError>> {
        Box::pin(async move { self.get(request.url()).await.map(TileContent::new) })
    }

    fn name(&self) -> &str {
        "http"
    }
}
