//! The tiled format controller.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::types::{FormatError, FormatEvent, FormatState};
use crate::config::FormatConfig;
use crate::coord::{Bounds, View};
use crate::grid::{GridLevel, GridResolver, Resolution};
use crate::loader::{LoaderEvent, TileLoader};
use crate::provider::{FetchError, TileContentFetcher};
use crate::store::{FailureOutcome, TileStore};
use crate::tile::{Generation, Header, Tile, TileId, TileRequest};

/// Tiled view of one dataset.
///
/// Owns the resident [`TileStore`] and is its only writer: loader
/// completions arrive over a channel and are applied by
/// [`handle_loader_event`](Self::handle_loader_event), driven either by the
/// caller ([`process_next`](Self::process_next),
/// [`wait_for_cutover`](Self::wait_for_cutover)) or by a
/// [`FormatService`](super::FormatService).
///
/// Dropping the format cancels every fetch still in flight.
pub struct TiledFormat {
    config: FormatConfig,
    fetcher: Arc<dyn TileContentFetcher>,
    resolver: GridResolver,
    store: TileStore,
    loader: TileLoader,
    completions: mpsc::UnboundedReceiver<LoaderEvent>,
    events: broadcast::Sender<FormatEvent>,
    state: FormatState,
    generation: Generation,
    view: Option<View>,
    resolution: Option<Resolution>,
    metadata: Option<Header>,
    pending_error: Option<FormatError>,
    shutdown: CancellationToken,
}

impl TiledFormat {
    pub fn new(config: FormatConfig, fetcher: Arc<dyn TileContentFetcher>) -> Self {
        let shutdown = CancellationToken::new();
        let (loader, completions) =
            TileLoader::new(Arc::clone(&fetcher), config.loader.clone(), shutdown.clone());
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            resolver: config.resolver(),
            config,
            fetcher,
            store: TileStore::new(),
            loader,
            completions,
            events,
            state: FormatState::Uninitialized,
            generation: Generation::INITIAL,
            view: None,
            resolution: None,
            metadata: None,
            pending_error: None,
            shutdown,
        }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<FormatEvent> {
        self.events.subscribe()
    }

    /// Load the dataset header.
    ///
    /// Emits `Load` and enters `Ready` on success. On failure emits `Error`,
    /// enters `Failed` and stays there. Only the first call is accepted.
    pub async fn load(&mut self) -> Result<(), FormatError> {
        if self.state != FormatState::Uninitialized {
            return Err(FormatError::AlreadyLoaded);
        }
        self.state = FormatState::Loading;

        if let Err(e) = reqwest::Url::parse(&self.config.source) {
            return Err(self.fail_load(FormatError::InvalidSource {
                url: self.config.source.clone(),
                reason: e.to_string(),
            }));
        }

        let result = self.fetcher.load_metadata(&self.config.source).await;
        match result {
            Ok(header) => {
                info!(
                    source = %self.config.source,
                    fetcher = self.fetcher.name(),
                    length = header.length,
                    "Dataset loaded"
                );
                self.metadata = Some(header.clone());
                self.state = FormatState::Ready;
                self.emit(FormatEvent::Load(header));
                Ok(())
            }
            Err(e) => Err(self.fail_load(FormatError::Metadata(e))),
        }
    }

    fn fail_load(&mut self, error: FormatError) -> FormatError {
        warn!(source = %self.config.source, error = %error, "Dataset failed to load");
        self.state = FormatState::Failed;
        self.emit(FormatEvent::Error(error.clone()));
        error
    }

    /// Show `view`.
    ///
    /// Starts a new generation, fetches the tiles it is missing and keeps the
    /// previous tiles visible until all of them have their header. On a full
    /// cache hit the cutover and its `All` event happen before this returns.
    pub fn zoom_to(&mut self, view: View) -> Result<Generation, FormatError> {
        if self.state != FormatState::Ready {
            return Err(FormatError::NotReady(self.state));
        }

        self.generation = self.generation.next();
        let generation = self.generation;
        self.pending_error = None;

        let resolution = self.resolver.resolve(&view, self.config.tiles_per_screen);
        let reconciliation = self.store.reconcile(&resolution.tiles);
        let requested = self
            .store
            .begin(generation, &resolution.tiles, &reconciliation.misses);

        debug!(
            %generation,
            view = %view,
            level = resolution.level.index(),
            wanted = resolution.tiles.len(),
            hits = reconciliation.hits.len(),
            in_flight = reconciliation.in_flight.len(),
            misses = reconciliation.misses.len(),
            "Zoom"
        );

        if !requested.is_empty() {
            let requests: Vec<TileRequest> = requested
                .iter()
                .map(|tile| tile.request(&self.config.source).with_time(view.time))
                .collect();
            self.loader.fetch(requests, generation);
        }

        self.view = Some(view);
        self.resolution = Some(resolution);
        self.try_cutover();
        Ok(generation)
    }

    /// Apply one loader completion.
    ///
    /// Returns `false` when the completion was stale and ignored.
    pub fn handle_loader_event(&mut self, event: LoaderEvent) -> bool {
        match event {
            LoaderEvent::Header {
                tile,
                generation,
                result: Ok(header),
            } => {
                if !self.store.admit(&tile, generation, header.clone()) {
                    return false;
                }
                trace!(%tile, %generation, "Tile header loaded");
                self.emit(FormatEvent::Header {
                    tile,
                    generation,
                    header,
                });
                self.try_cutover();
                true
            }
            LoaderEvent::Header {
                tile,
                generation,
                result: Err(error),
            } => {
                let outcome = self.store.fail_header(&tile, generation);
                self.record_failure(tile, generation, error, outcome)
            }
            LoaderEvent::Content {
                tile,
                generation,
                result: Ok(content),
            } => {
                if !self.store.complete_content(&tile, generation, content) {
                    return false;
                }
                trace!(%tile, %generation, "Tile content loaded");
                self.emit(FormatEvent::Content { tile, generation });
                true
            }
            LoaderEvent::Content {
                tile,
                generation,
                result: Err(error),
            } => {
                let outcome = self.store.fail_content(&tile, generation);
                self.record_failure(tile, generation, error, outcome)
            }
        }
    }

    fn record_failure(
        &mut self,
        tile: TileId,
        generation: Generation,
        error: FetchError,
        outcome: FailureOutcome,
    ) -> bool {
        if outcome == FailureOutcome::Stale {
            trace!(%tile, %generation, "Ignoring stale failure");
            return false;
        }

        warn!(%tile, %generation, error = %error, "Tile failed");
        let error = FormatError::Tile {
            tile,
            source: error,
        };
        if outcome == FailureOutcome::AbortedPending {
            warn!(generation = %self.generation, "Generation abandoned, keeping resident tiles");
            self.pending_error = Some(error.clone());
        }
        self.emit(FormatEvent::Error(error));
        true
    }

    fn try_cutover(&mut self) {
        if let Some(cutover) = self.store.cutover() {
            self.emit(FormatEvent::All {
                generation: cutover.generation,
                tiles: cutover.resident,
            });
        }
    }

    /// Wait for the next loader completion and apply it.
    ///
    /// Returns whether the completion took effect.
    pub async fn process_next(&mut self) -> bool {
        match self.completions.recv().await {
            Some(event) => self.handle_loader_event(event),
            None => false,
        }
    }

    /// Receive the next loader completion without applying it.
    pub async fn next_completion(&mut self) -> Option<LoaderEvent> {
        self.completions.recv().await
    }

    /// Apply every completion that has already arrived.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.completions.try_recv() {
            if self.handle_loader_event(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Apply completions until the latest generation is resident.
    ///
    /// Fails with the tile error that abandoned the generation.
    pub async fn wait_for_cutover(&mut self) -> Result<Generation, FormatError> {
        if self.state != FormatState::Ready {
            return Err(FormatError::NotReady(self.state));
        }
        let target = self.generation;
        loop {
            if let Some(error) = &self.pending_error {
                return Err(error.clone());
            }
            if self.store.resident_generation() == target {
                return Ok(target);
            }
            match self.completions.recv().await {
                Some(event) => {
                    self.handle_loader_event(event);
                }
                None => return Err(FormatError::NotReady(self.state)),
            }
        }
    }

    fn emit(&self, event: FormatEvent) {
        trace!(event = event.name(), "Emitting event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Pending tiles still waiting for their header.
    pub fn loading_tiles(&self) -> Vec<&Tile> {
        self.store.loading_tiles()
    }

    pub fn state(&self) -> FormatState {
        self.state
    }

    /// Number of `zoom_to` calls so far.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The view of the latest `zoom_to`.
    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    /// The latest view trimmed outward to its grid.
    pub fn bounds(&self) -> Option<Bounds> {
        self.resolution.as_ref().map(|r| r.bounds)
    }

    pub fn level(&self) -> Option<GridLevel> {
        self.resolution.as_ref().map(|r| r.level)
    }

    /// Tiles covering the latest view, in grid order.
    pub fn wanted_tiles(&self) -> Vec<TileId> {
        self.resolution
            .as_ref()
            .map(Resolution::tile_ids)
            .unwrap_or_default()
    }

    /// Identities of every cached tile, ascending.
    pub fn cached_tiles(&self) -> Vec<TileId> {
        self.store.cached_ids()
    }

    pub fn tile(&self, id: &str) -> Option<&Tile> {
        self.store.get(id)
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    /// The dataset header, once loaded.
    pub fn metadata(&self) -> Option<&Header> {
        self.metadata.as_ref()
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }
}

impl Drop for TiledFormat {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
