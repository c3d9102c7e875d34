//! Asynchronous per-tile fetch lifecycle.
//!
//! The [`TileLoader`] spawns one task per requested tile. Each task runs the
//! header phase, reports it, and on success runs the content phase and
//! reports that too:
//!
//! ```text
//! fetch(requests, gen)
//!   ├─► task(tile A) ── header ──► LoaderEvent::Header ── content ──► LoaderEvent::Content
//!   ├─► task(tile B) ── header ──► LoaderEvent::Header ── ...
//!   └─► ...
//!                                      │
//!                                      ▼
//!                         mpsc ──► control task (TiledFormat)
//! ```
//!
//! Tasks never touch the cache. Every event carries the generation that
//! issued the fetch so the control task can discard stale completions.
//! Superseded generations keep running; only their effects are suppressed.
//! The shutdown token stops every task still in flight.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::provider::{FetchError, TileContentFetcher};
use crate::tile::{Generation, Header, TileContent, TileId, TileRequest};

/// Loader deadlines. `None` waits indefinitely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Deadline for the header phase of one tile.
    pub header_timeout: Option<Duration>,

    /// Deadline for the content phase of one tile.
    pub content_timeout: Option<Duration>,
}

/// Completion reported by a loader task.
#[derive(Debug, Clone)]
pub enum LoaderEvent {
    Header {
        tile: TileId,
        generation: Generation,
        result: Result<Header, FetchError>,
    },
    Content {
        tile: TileId,
        generation: Generation,
        result: Result<TileContent, FetchError>,
    },
}

impl LoaderEvent {
    pub fn tile(&self) -> &TileId {
        match self {
            Self::Header { tile, .. } | Self::Content { tile, .. } => tile,
        }
    }

    pub fn generation(&self) -> Generation {
        match self {
            Self::Header { generation, .. } | Self::Content { generation, .. } => *generation,
        }
    }
}

/// Spawns fetch tasks and forwards their completions.
pub struct TileLoader {
    fetcher: Arc<dyn TileContentFetcher>,
    config: LoaderConfig,
    events: mpsc::UnboundedSender<LoaderEvent>,
    shutdown: CancellationToken,
}

impl TileLoader {
    /// Creates a loader and the receiver its completions arrive on.
    pub fn new(
        fetcher: Arc<dyn TileContentFetcher>,
        config: LoaderConfig,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<LoaderEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let loader = Self {
            fetcher,
            config,
            events,
            shutdown,
        };
        (loader, receiver)
    }

    /// Start fetching every request, tagged with `generation`.
    ///
    /// Must be called from within a tokio runtime. Returns the number of
    /// tasks spawned.
    pub fn fetch(&self, requests: Vec<TileRequest>, generation: Generation) -> usize {
        let count = requests.len();
        debug!(
            fetcher = self.fetcher.name(),
            %generation,
            tiles = count,
            "Dispatching tile fetches"
        );

        for request in requests {
            tokio::spawn(run_tile(
                Arc::clone(&self.fetcher),
                self.config.clone(),
                request,
                generation,
                self.events.clone(),
                self.shutdown.clone(),
            ));
        }
        count
    }
}

async fn run_tile(
    fetcher: Arc<dyn TileContentFetcher>,
    config: LoaderConfig,
    request: TileRequest,
    generation: Generation,
    events: mpsc::UnboundedSender<LoaderEvent>,
    shutdown: CancellationToken,
) {
    let tile = request.id().clone();

    let header = tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            trace!(%tile, "Header fetch cancelled");
            return;
        }
        result = with_deadline(config.header_timeout, &tile, fetcher.fetch_header(&request)) => result,
    };

    let loaded = header.as_ref().ok().cloned();
    let sent = events.send(LoaderEvent::Header {
        tile: tile.clone(),
        generation,
        result: header,
    });
    let (Ok(()), Some(header)) = (sent, loaded) else {
        return;
    };

    let content = tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            trace!(%tile, "Content fetch cancelled");
            return;
        }
        result = with_deadline(
            config.content_timeout,
            &tile,
            fetcher.fetch_content(&request, &header),
        ) => result,
    };

    // The receiver is gone only during shutdown.
    let _ = events.send(LoaderEvent::Content {
        tile,
        generation,
        result: content,
    });
}

async fn with_deadline<T>(
    deadline: Option<Duration>,
    tile: &TileId,
    phase: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, phase)
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::Timeout {
                    tile: tile.clone(),
                    elapsed: limit,
                })
            }),
        None => phase.await,
    }
}
