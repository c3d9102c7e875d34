//! Resident tile cache with retain-until-ready replacement.
//!
//! The [`TileStore`] owns every [`Tile`] the viewer can see and decides when
//! tiles leave. It tracks three sets:
//!
//! - **wanted**: the identities of the resident generation
//! - **pending**: the identities of the generation being loaded in
//! - **loading**: pending tiles whose header has not arrived yet
//!
//! # Retain-until-ready
//!
//! ```text
//! zoom_to(v1) ─► cache = tiles(v1)
//! zoom_to(v2) ─► cache = tiles(v1)                 (nothing arrived yet)
//!   header ──► cache = tiles(v1) + admitted(v2)    (progressive, no eviction)
//!   ...
//!   last header ─► cutover ─► cache = tiles(v2)    (single step)
//! ```
//!
//! The previous generation stays visible for the whole time the next one is
//! loading and disappears in the same step the replacement becomes complete.
//! A failed tile aborts the cutover of its generation; the store then stays
//! on the old generation.
//!
//! Every completion is matched against the generation that issued its fetch.
//! Completions with no matching entry are stale and ignored.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, trace};

use crate::coord::Bounds;
use crate::tile::{Generation, Header, Tile, TileContent, TileId, TileState};

/// How a WantedSet relates to the current cache contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Tiles already resident with at least their header.
    pub hits: Vec<TileId>,
    /// Tiles whose fetch is already outstanding and can be reused.
    pub in_flight: Vec<TileId>,
    /// Tiles that must be fetched.
    pub misses: Vec<Bounds>,
}

impl Reconciliation {
    /// True when nothing has to be waited for.
    pub fn is_full_hit(&self) -> bool {
        self.in_flight.is_empty() && self.misses.is_empty()
    }
}

/// Summary of a completed cutover.
#[derive(Debug, Clone, PartialEq)]
pub struct Cutover {
    /// The generation that became resident.
    pub generation: Generation,
    /// Identities removed from the cache.
    pub evicted: Vec<TileId>,
    /// Identities now resident, in ascending order.
    pub resident: Vec<TileId>,
}

/// Outcome of reporting a tile failure to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The completion did not match any live request.
    Stale,
    /// The tile failed; the resident generation is unaffected.
    Recorded,
    /// The tile belonged to the pending generation, whose cutover is now
    /// abandoned.
    AbortedPending,
}

/// Owner of the resident cache and the wanted/pending sets.
#[derive(Debug, Default)]
pub struct TileStore {
    cache: BTreeMap<TileId, Tile>,
    wanted: BTreeSet<TileId>,
    resident_generation: Generation,
    pending: BTreeSet<TileId>,
    pending_generation: Option<Generation>,
    pending_failed: bool,
    loading: BTreeMap<TileId, Tile>,
}

impl TileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition a WantedSet into hits, in-flight tiles and misses.
    ///
    /// Does not mutate the store.
    pub fn reconcile(&self, wanted: &[Bounds]) -> Reconciliation {
        let mut reconciliation = Reconciliation::default();
        for bounds in wanted {
            let id = TileId::from_bounds(bounds);
            if self
                .cache
                .get(&id)
                .is_some_and(|tile| tile.state().has_header())
            {
                reconciliation.hits.push(id);
            } else if self.loading.contains_key(&id) {
                reconciliation.in_flight.push(id);
            } else {
                reconciliation.misses.push(*bounds);
            }
        }
        reconciliation
    }

    /// Install `wanted` as the pending generation.
    ///
    /// Outstanding requests that the new generation no longer wants are
    /// forgotten, so their completions become stale. Every miss is
    /// registered as `Requested`; the newly requested tiles are returned for
    /// the loader.
    pub fn begin(
        &mut self,
        generation: Generation,
        wanted: &[Bounds],
        misses: &[Bounds],
    ) -> Vec<Tile> {
        self.pending = wanted.iter().map(TileId::from_bounds).collect();
        self.pending_generation = Some(generation);
        self.pending_failed = false;

        let before = self.loading.len();
        let pending = &self.pending;
        self.loading.retain(|id, _| pending.contains(id));
        let superseded = before - self.loading.len();

        let requested: Vec<Tile> = misses
            .iter()
            .map(|bounds| Tile::requested(*bounds, generation))
            .collect();
        for tile in &requested {
            self.loading.insert(tile.id().clone(), tile.clone());
        }

        debug!(
            %generation,
            pending = self.pending.len(),
            requested = requested.len(),
            superseded,
            "Began loading generation"
        );

        requested
    }

    /// Admit a tile whose header phase completed.
    ///
    /// The tile is inserted into the cache immediately so it becomes visible,
    /// but nothing is evicted. Returns `false` for stale completions.
    pub fn admit(&mut self, id: &TileId, generation: Generation, header: Header) -> bool {
        if !self.is_loading(id, generation) {
            trace!(tile = %id, %generation, "Ignoring stale header");
            return false;
        }
        let Some(mut tile) = self.loading.remove(id) else {
            return false;
        };
        if !tile.set_header(header) {
            return false;
        }
        self.cache.insert(id.clone(), tile);
        true
    }

    /// Record a completed content phase for a cached tile.
    ///
    /// Any cached tile admitted by `generation` accepts its content, even when
    /// that generation was superseded; a later zoom may reuse the tile as a
    /// hit. Tiles nobody wants leave at the next cutover. Returns `false` for
    /// stale completions.
    pub fn complete_content(
        &mut self,
        id: &TileId,
        generation: Generation,
        content: TileContent,
    ) -> bool {
        match self.cache.get_mut(id) {
            Some(tile) if tile.generation() == generation => tile.set_content(content),
            _ => {
                trace!(tile = %id, %generation, "Ignoring stale content");
                false
            }
        }
    }

    /// Record a failed header phase.
    pub fn fail_header(&mut self, id: &TileId, generation: Generation) -> FailureOutcome {
        if !self.is_loading(id, generation) {
            return FailureOutcome::Stale;
        }
        // Failed tiles are never cached; a later zoom refetches them.
        self.loading.remove(id);
        self.abort_pending_for(id)
    }

    /// Record a failed content phase for a cached tile.
    pub fn fail_content(&mut self, id: &TileId, generation: Generation) -> FailureOutcome {
        let failed = match self.cache.get_mut(id) {
            Some(tile) => tile.generation() == generation && tile.set_failed(),
            None => false,
        };
        if failed {
            self.abort_pending_for(id)
        } else {
            FailureOutcome::Stale
        }
    }

    /// True when every pending tile has at least its header and the pending
    /// generation has not failed.
    pub fn is_ready(&self) -> bool {
        self.pending_generation.is_some()
            && !self.pending_failed
            && self.pending.iter().all(|id| {
                self.cache
                    .get(id)
                    .is_some_and(|tile| tile.state().has_header())
            })
    }

    /// Replace the resident generation with the pending one.
    ///
    /// Atomically evicts every cached tile outside the pending set, makes the
    /// pending set the wanted set and clears it. Returns `None` (and changes
    /// nothing) unless [`is_ready`](Self::is_ready).
    pub fn cutover(&mut self) -> Option<Cutover> {
        if !self.is_ready() {
            return None;
        }
        let generation = self.pending_generation.take()?;

        let pending = std::mem::take(&mut self.pending);
        let evicted: Vec<TileId> = self
            .cache
            .keys()
            .filter(|id| !pending.contains(*id))
            .cloned()
            .collect();
        for id in &evicted {
            self.cache.remove(id);
        }
        self.loading.clear();
        self.wanted = pending;
        self.resident_generation = generation;

        info!(
            %generation,
            resident = self.wanted.len(),
            evicted = evicted.len(),
            "Cutover complete"
        );

        Some(Cutover {
            generation,
            evicted,
            resident: self.wanted.iter().cloned().collect(),
        })
    }

    /// Pending tiles still waiting for their header.
    pub fn loading_tiles(&self) -> Vec<&Tile> {
        self.loading
            .values()
            .filter(|tile| self.pending.contains(tile.id()))
            .collect()
    }

    /// Look up a cached tile.
    pub fn get(&self, id: &str) -> Option<&Tile> {
        self.cache.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cache.contains_key(id)
    }

    /// Cached tiles in ascending identity order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cache.values()
    }

    /// Cached identities in ascending order.
    pub fn cached_ids(&self) -> Vec<TileId> {
        self.cache.keys().cloned().collect()
    }

    pub fn wanted(&self) -> &BTreeSet<TileId> {
        &self.wanted
    }

    pub fn pending(&self) -> &BTreeSet<TileId> {
        &self.pending
    }

    pub fn resident_generation(&self) -> Generation {
        self.resident_generation
    }

    pub fn pending_generation(&self) -> Option<Generation> {
        self.pending_generation
    }

    pub fn is_pending_failed(&self) -> bool {
        self.pending_failed
    }

    /// Number of cached tiles in the given state.
    pub fn count_in_state(&self, state: TileState) -> usize {
        self.cache
            .values()
            .filter(|tile| tile.state() == state)
            .count()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn is_loading(&self, id: &TileId, generation: Generation) -> bool {
        self.loading
            .get(id)
            .is_some_and(|tile| tile.generation() == generation)
    }

    fn abort_pending_for(&mut self, id: &TileId) -> FailureOutcome {
        if self.pending_generation.is_some() && self.pending.contains(id) {
            self.pending_failed = true;
            FailureOutcome::AbortedPending
        } else {
            FailureOutcome::Recorded
        }
    }
}
