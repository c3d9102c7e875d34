//! Tile content fetchers.
//!
//! The cache never knows how tile contents are produced. It hands a
//! [`TileRequest`](crate::tile::TileRequest) to a [`TileContentFetcher`] and
//! receives a header and then a content payload back.
//!
//! # Implementations
//!
//! - [`EmptyFetcher`]: simulated backend with no content, configurable
//!   latency, manual release and failure injection
//! - [`HttpFetcher`]: reqwest-based fetcher for datasets served over HTTP
//!
//! ```ignore
//! use std::sync::Arc;
//! use tileview::provider::{HttpFetcher, TileContentFetcher};
//!
//! let fetcher: Arc<dyn TileContentFetcher> = Arc::new(HttpFetcher::new()?);
//! ```

mod empty;
mod factory;
mod http;
mod types;

pub use empty::{EmptyFetcher, DEFAULT_CONTENT_DELAY, DEFAULT_HEADER_DELAY};
pub use factory::FetcherKind;
pub use http::{HttpFetcher, DEFAULT_HTTP_TIMEOUT_SECS};
pub use types::{BoxFuture, FetchError, TileContentFetcher};
