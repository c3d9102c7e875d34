//! Format lifecycle states, errors and events.

use std::fmt;

use thiserror::Error;

use crate::provider::FetchError;
use crate::tile::{Generation, Header, TileId};

/// Lifecycle of a [`TiledFormat`](super::TiledFormat).
///
/// ```text
/// Uninitialized ──load()──► Loading ──ok──► Ready ──zoom_to()──► Ready
///                              │
///                              └──err──► Failed
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

impl fmt::Display for FormatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by a tiled format.
///
/// Asynchronous failures reach consumers only as [`FormatEvent::Error`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("Invalid source URL '{url}': {reason}")]
    InvalidSource { url: String, reason: String },

    #[error("Failed to load dataset header: {0}")]
    Metadata(FetchError),

    #[error("Format is not ready (state: {0})")]
    NotReady(FormatState),

    #[error("Format has already been loaded")]
    AlreadyLoaded,

    #[error("Tile {tile} failed: {source}")]
    Tile { tile: TileId, source: FetchError },
}

/// Notifications broadcast to every subscriber of a format.
#[derive(Debug, Clone)]
pub enum FormatEvent {
    /// The dataset header arrived; the format is ready.
    Load(Header),

    /// A tile of `generation` reached HeaderLoaded and is visible.
    Header {
        tile: TileId,
        generation: Generation,
        header: Header,
    },

    /// A visible tile reached ContentLoaded.
    Content { tile: TileId, generation: Generation },

    /// `generation` became resident; `tiles` is the complete cache.
    All {
        generation: Generation,
        tiles: Vec<TileId>,
    },

    /// Something failed. No `All` follows for the affected generation.
    Error(FormatError),
}

impl FormatEvent {
    /// Short event name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Header { .. } => "header",
            Self::Content { .. } => "content",
            Self::All { .. } => "all",
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Bounds;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FormatError::NotReady(FormatState::Uninitialized).to_string(),
            "Format is not ready (state: uninitialized)"
        );

        let err = FormatError::Tile {
            tile: TileId::from_bounds(&Bounds::new(0.0, 0.0, 2.8125, 1.40625)),
            source: FetchError::Injected("boom".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Tile 0,0,2.8125,1.40625 failed: Injected failure: boom"
        );
    }

    #[test]
    fn test_event_names() {
        assert_eq!(FormatEvent::Load(Header::default()).name(), "load");
        assert_eq!(
            FormatEvent::Error(FormatError::AlreadyLoaded).name(),
            "error"
        );
    }
}
