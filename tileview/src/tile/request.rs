//! Tile fetch request types.
//!
//! Provides the `TileRequest` type that carries everything a
//! [`TileContentFetcher`](crate::provider::TileContentFetcher) needs to load
//! one tile, without exposing cache internals.

use crate::coord::{Bounds, TimeRange};

use super::TileId;

/// Request to fetch one tile.
///
/// The URL is the dataset source followed by the tile identity, e.g.
/// `http://example.com/tiles/0,0,2.8125,1.40625`.
///
/// # Example
///
/// ```
/// use tileview::coord::Bounds;
/// use tileview::tile::{TileId, TileRequest};
///
/// let bounds = Bounds::new(0.0, 0.0, 2.8125, 1.40625);
/// let request = TileRequest::new(TileId::from_bounds(&bounds), bounds, "http://example.com/tiles");
/// assert_eq!(request.url(), "http://example.com/tiles/0,0,2.8125,1.40625");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    id: TileId,
    bounds: Bounds,
    url: String,
    time: Option<TimeRange>,
}

impl TileRequest {
    /// Create a new tile request for the tile `id` under `source`.
    pub fn new(id: TileId, bounds: Bounds, source: &str) -> Self {
        let url = format!("{}/{}", source.trim_end_matches('/'), id);
        Self {
            id,
            bounds,
            url,
            time: None,
        }
    }

    /// Restrict the request to a time range.
    pub fn with_time(mut self, time: Option<TimeRange>) -> Self {
        self.time = time;
        self
    }

    pub fn id(&self) -> &TileId {
        &self.id
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// The tile URL, `{source}/{left,bottom,right,top}`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn time(&self) -> Option<&TimeRange> {
        self.time.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_source_and_identity() {
        let bounds = Bounds::new(-180.0, 0.0, -174.375, 2.8125);
        let request = TileRequest::new(TileId::from_bounds(&bounds), bounds, "http://example.com/");
        assert_eq!(request.url(), "http://example.com/-180,0,-174.375,2.8125");
        assert!(request.time().is_none());
    }

    #[test]
    fn test_with_time() {
        let time: TimeRange = "1970-01-01T00:00:00,1970-01-02T00:00:00".parse().unwrap();
        let bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
        let request =
            TileRequest::new(TileId::from_bounds(&bounds), bounds, "mem://").with_time(Some(time));
        assert_eq!(request.time(), Some(&time));
    }
}
