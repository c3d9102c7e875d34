//! Tile identity and lifecycle types.
//!
//! A [`Tile`] is one addressable cell of the world grid. Its identity is
//! derived solely from its bounds, so two tiles with equal bounds are the
//! same cache entry.
//!
//! # Lifecycle
//!
//! ```text
//! Requested ──► HeaderLoaded ──► ContentLoaded
//!     │              │
//!     └──► Failed ◄──┘
//! ```
//!
//! Transitions are monotonic; a tile never moves backwards.

mod request;

pub use request::TileRequest;

use std::borrow::Borrow;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::coord::Bounds;

/// Canonical tile identity: the `left,bottom,right,top` encoding of its bounds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(String);

impl TileId {
    /// Derive the identity of the tile with the given bounds.
    pub fn from_bounds(bounds: &Bounds) -> Self {
        Self(bounds.to_string())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Bounds> for TileId {
    fn from(bounds: &Bounds) -> Self {
        Self::from_bounds(bounds)
    }
}

impl Borrow<str> for TileId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic token identifying one `zoom_to` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// The generation before any zoom.
    pub const INITIAL: Generation = Generation(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The generation following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Load lifecycle of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    /// Fetch issued, header not yet available.
    Requested,
    /// Header phase complete; enough to describe and render.
    HeaderLoaded,
    /// Content phase complete.
    ContentLoaded,
    /// Either phase failed.
    Failed,
}

impl TileState {
    /// Whether moving from `self` to `next` respects the lifecycle order.
    pub fn can_transition_to(self, next: TileState) -> bool {
        matches!(
            (self, next),
            (TileState::Requested, TileState::HeaderLoaded)
                | (TileState::Requested, TileState::Failed)
                | (TileState::HeaderLoaded, TileState::ContentLoaded)
                | (TileState::HeaderLoaded, TileState::Failed)
        )
    }

    /// True once the header is available (and the tile has not failed).
    pub fn has_header(self) -> bool {
        matches!(self, TileState::HeaderLoaded | TileState::ContentLoaded)
    }
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TileState::Requested => "requested",
            TileState::HeaderLoaded => "header-loaded",
            TileState::ContentLoaded => "content-loaded",
            TileState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lightweight metadata produced by a header phase.
///
/// Used both for the tileset-level header returned by a metadata load and
/// for individual tile headers. The cache never inspects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Number of rows in the tile or dataset.
    #[serde(default)]
    pub length: u64,
    /// Column names available in the content.
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Opaque payload produced by a content phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileContent {
    data: Bytes,
}

impl TileContent {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// A content handle with no payload.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One cell of the grid together with its load state.
#[derive(Debug, Clone)]
pub struct Tile {
    id: TileId,
    bounds: Bounds,
    state: TileState,
    /// Generation whose `zoom_to` issued the fetch for this tile.
    generation: Generation,
    header: Option<Header>,
    content: Option<TileContent>,
}

impl Tile {
    /// A freshly requested tile.
    pub fn requested(bounds: Bounds, generation: Generation) -> Self {
        Self {
            id: TileId::from_bounds(&bounds),
            bounds,
            state: TileState::Requested,
            generation,
            header: None,
            content: None,
        }
    }

    pub fn id(&self) -> &TileId {
        &self.id
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn content(&self) -> Option<&TileContent> {
        self.content.as_ref()
    }

    /// Record a completed header phase. Returns `false` if the transition
    /// is not allowed from the current state.
    pub fn set_header(&mut self, header: Header) -> bool {
        if !self.transition(TileState::HeaderLoaded) {
            return false;
        }
        self.header = Some(header);
        true
    }

    /// Record a completed content phase. Returns `false` if the transition
    /// is not allowed from the current state.
    pub fn set_content(&mut self, content: TileContent) -> bool {
        if !self.transition(TileState::ContentLoaded) {
            return false;
        }
        self.content = Some(content);
        true
    }

    /// Mark the tile as failed. Returns `false` if it already failed or
    /// finished loading.
    pub fn set_failed(&mut self) -> bool {
        self.transition(TileState::Failed)
    }

    /// A request for fetching this tile from `source`.
    pub fn request(&self, source: &str) -> TileRequest {
        TileRequest::new(self.id.clone(), self.bounds, source)
    }

    fn transition(&mut self, next: TileState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tile() -> Tile {
        Tile::requested(Bounds::new(0.0, 0.0, 2.8125, 1.40625), Generation::new(1))
    }

    #[test]
    fn test_tile_id_from_bounds() {
        let tile = make_tile();
        assert_eq!(tile.id().as_str(), "0,0,2.8125,1.40625");
        assert_eq!(tile.state(), TileState::Requested);
    }

    #[test]
    fn test_equal_bounds_share_identity() {
        let a = TileId::from_bounds(&Bounds::new(174.375, 0.0, 180.0, 2.8125));
        let b: TileId = (&"174.375,0,180,2.8125".parse::<Bounds>().unwrap()).into();
        assert_eq!(a, b);
    }

    #[test]
    fn test_forward_lifecycle() {
        let mut tile = make_tile();
        assert!(tile.set_header(Header::default()));
        assert_eq!(tile.state(), TileState::HeaderLoaded);
        assert!(tile.set_content(TileContent::new(vec![1, 2, 3])));
        assert_eq!(tile.state(), TileState::ContentLoaded);
        assert_eq!(tile.content().map(TileContent::len), Some(3));
    }

    #[test]
    fn test_no_backward_transitions() {
        let mut tile = make_tile();
        assert!(!tile.set_content(TileContent::empty()), "content before header");
        assert!(tile.set_header(Header::default()));
        assert!(!tile.set_header(Header::default()), "header twice");
        assert!(tile.set_content(TileContent::empty()));
        assert!(!tile.set_failed(), "failure after content");
        assert_eq!(tile.state(), TileState::ContentLoaded);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut tile = make_tile();
        assert!(tile.set_failed());
        assert!(!tile.set_header(Header::default()));
        assert_eq!(tile.state(), TileState::Failed);
        assert!(!tile.state().has_header());
    }

    #[test]
    fn test_generation_ordering() {
        let first = Generation::INITIAL.next();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 2);
        assert_eq!(second.to_string(), "gen#2");
    }

    #[test]
    fn test_header_deserializes_with_defaults() {
        let header: Header = serde_json::from_str(r#"{"length": 12}"#).unwrap();
        assert_eq!(header.length, 12);
        assert!(header.columns.is_empty());
    }
}
