//! Fetcher trait and error types.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::tile::{Header, TileContent, TileId, TileRequest};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors produced by a [`TileContentFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A phase did not finish within its deadline.
    #[error("Timed out after {}ms fetching {tile}", elapsed.as_millis())]
    Timeout { tile: TileId, elapsed: Duration },

    /// Failure injected by a simulated fetcher.
    #[error("Injected failure: {0}")]
    Injected(String),

    /// The fetch was cancelled during shutdown.
    #[error("Fetch cancelled")]
    Cancelled,
}

/// Strategy for loading tile contents.
///
/// Each tile is loaded in two phases: a cheap header phase producing
/// metadata (enough to describe and render the tile) and a heavier content
/// phase producing the payload. The cache only depends on this shape, never
/// on a wire format.
///
/// # Dyn Compatibility
///
/// Async methods return [`BoxFuture`] so fetchers can be shared as
/// `Arc<dyn TileContentFetcher>` across loader tasks.
pub trait TileContentFetcher: Send + Sync {
    /// Load the top-level dataset header from `source`.
    fn load_metadata<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<Header, FetchError>>;

    /// Run the header phase for one tile.
    fn fetch_header<'a>(&'a self, request: &'a TileRequest)
        -> BoxFuture<'a, Result<Header, FetchError>>;

    /// Run the content phase for one tile whose header is known.
    fn fetch_content<'a>(
        &'a self,
        request: &'a TileRequest,
        header: &'a Header,
    ) -> BoxFuture<'a, Result<TileContent, FetchError>>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
