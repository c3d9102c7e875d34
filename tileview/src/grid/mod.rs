//! Multi-resolution world grid.
//!
//! The world is subdivided by repeated halving: at level `n` tiles are
//! `360/2^n` degrees wide and `180/2^n` degrees tall, so longitude and
//! latitude share the level and tiles keep a fixed 2:1 aspect ratio.
//!
//! [`GridResolver::resolve`] picks a level for a view and enumerates every
//! tile intersecting it, in ascending `(left, bottom)` order.
//!
//! # Example
//!
//! ```
//! use tileview::coord::{Bounds, View};
//! use tileview::grid::GridResolver;
//!
//! let resolver = GridResolver::default();
//! let resolution = resolver.resolve(&View::new(Bounds::new(0.0, 0.0, 10.0, 5.0)), 4);
//! assert_eq!(resolution.level.tile_width(), 2.8125);
//! assert_eq!(resolution.tiles.len(), 16);
//! ```

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use tracing::debug;

use crate::coord::{Bounds, View, MIN_LAT, MIN_LON, WORLD_HEIGHT, WORLD_WIDTH};
use crate::tile::TileId;

/// Deepest grid level considered by default.
///
/// A level-24 tile spans about 2e-5 degrees of longitude.
pub const DEFAULT_MAX_LEVEL: u8 = 24;

/// Hard ceiling for configurable levels; keeps tile indices exact in `f64`.
pub const MAX_SUPPORTED_LEVEL: u8 = 40;

/// Rule used to pick a grid level for a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelRule {
    /// Smallest level whose tile area is at most `view_area / tiles_per_screen`,
    /// never deeper than the [`LongerAxis`](LevelRule::LongerAxis) level.
    ///
    /// The cap keeps thin and zero-height views to about `tiles_per_screen`
    /// tiles along their longer axis.
    #[default]
    Area,
    /// Smallest level with at least `tiles_per_screen` tiles spanning the
    /// view's longer axis.
    LongerAxis,
}

impl LevelRule {
    pub fn name(&self) -> &'static str {
        match self {
            LevelRule::Area => "area",
            LevelRule::LongerAxis => "longer_axis",
        }
    }
}

impl fmt::Display for LevelRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LevelRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "area" => Ok(LevelRule::Area),
            "longer_axis" | "axis" => Ok(LevelRule::LongerAxis),
            other => Err(format!(
                "unknown level rule '{}' (expected 'area' or 'longer_axis')",
                other
            )),
        }
    }
}

/// One resolution of the world partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridLevel(u8);

impl GridLevel {
    pub fn new(level: u8) -> Self {
        Self(level.min(MAX_SUPPORTED_LEVEL))
    }

    pub fn index(&self) -> u8 {
        self.0
    }

    /// Number of tiles along each axis, `2^n`.
    pub fn tiles_per_axis(&self) -> u64 {
        1u64 << self.0
    }

    /// Tile width in degrees of longitude.
    pub fn tile_width(&self) -> f64 {
        WORLD_WIDTH / self.tiles_per_axis() as f64
    }

    /// Tile height in degrees of latitude.
    pub fn tile_height(&self) -> f64 {
        WORLD_HEIGHT / self.tiles_per_axis() as f64
    }

    /// Tile area in square degrees.
    pub fn tile_area(&self) -> f64 {
        self.tile_width() * self.tile_height()
    }

    /// Column indices whose half-open longitude intervals intersect `[west, east)`.
    ///
    /// A zero-width interval yields the column containing it.
    pub fn columns(&self, west: f64, east: f64) -> RangeInclusive<u64> {
        Self::index_range(west, east, MIN_LON, self.tile_width(), self.tiles_per_axis())
    }

    /// Row indices whose half-open latitude intervals intersect `[south, north)`.
    pub fn rows(&self, south: f64, north: f64) -> RangeInclusive<u64> {
        Self::index_range(south, north, MIN_LAT, self.tile_height(), self.tiles_per_axis())
    }

    /// Bounds of the tile at `(column, row)`.
    pub fn tile_bounds(&self, column: u64, row: u64) -> Bounds {
        let width = self.tile_width();
        let height = self.tile_height();
        Bounds::new(
            column as f64 * width + MIN_LON,
            row as f64 * height + MIN_LAT,
            (column + 1) as f64 * width + MIN_LON,
            (row + 1) as f64 * height + MIN_LAT,
        )
    }

    fn index_range(low: f64, high: f64, origin: f64, step: f64, count: u64) -> RangeInclusive<u64> {
        let max_index = count as f64 - 1.0;
        let first = ((low - origin) / step).floor().clamp(0.0, max_index);
        let last = (((high - origin) / step).ceil() - 1.0).clamp(0.0, max_index);
        let first = first as u64;
        first..=(last as u64).max(first)
    }
}

impl fmt::Display for GridLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{} ({}x{})", self.0, self.tile_width(), self.tile_height())
    }
}

/// The outcome of resolving a view onto the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Chosen grid level.
    pub level: GridLevel,
    /// The normalized view bounds trimmed outward to the chosen grid.
    pub bounds: Bounds,
    /// Bounds of every intersecting tile, sorted by `(left, bottom)`.
    pub tiles: Vec<Bounds>,
}

impl Resolution {
    /// Identities of the wanted tiles, in resolution order.
    pub fn tile_ids(&self) -> Vec<TileId> {
        self.tiles.iter().map(TileId::from_bounds).collect()
    }
}

/// Picks grid levels and enumerates covering tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridResolver {
    rule: LevelRule,
    max_level: u8,
}

impl Default for GridResolver {
    fn default() -> Self {
        Self::new(LevelRule::default(), DEFAULT_MAX_LEVEL)
    }
}

impl GridResolver {
    pub fn new(rule: LevelRule, max_level: u8) -> Self {
        Self {
            rule,
            max_level: max_level.min(MAX_SUPPORTED_LEVEL),
        }
    }

    pub fn rule(&self) -> LevelRule {
        self.rule
    }

    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    /// Resolve `view` into a grid level and the tiles covering it.
    ///
    /// Pure: the result depends only on the view, `tiles_per_screen` and the
    /// resolver's settings.
    pub fn resolve(&self, view: &View, tiles_per_screen: u32) -> Resolution {
        let bounds = view.bounds.normalize();
        let level = self.select_level(&bounds, tiles_per_screen);
        let tiles = Self::enumerate(level, &bounds);
        let snapped = bounds.snap_to_grid(level.tile_width(), level.tile_height());

        debug!(
            view = %bounds,
            level = level.index(),
            tiles = tiles.len(),
            "Resolved view onto grid"
        );

        Resolution {
            level,
            bounds: snapped,
            tiles,
        }
    }

    /// Select the grid level for normalized `bounds`.
    pub fn select_level(&self, bounds: &Bounds, tiles_per_screen: u32) -> GridLevel {
        let wanted = tiles_per_screen.max(1);
        let by_axis =
            self.first_level(|level| Self::longer_axis_count(level, bounds) >= wanted as u64);
        match self.rule {
            LevelRule::Area => self
                .first_level(|level| level.tile_area() * wanted as f64 <= bounds.area())
                .min(by_axis),
            LevelRule::LongerAxis => by_axis,
        }
    }

    /// Shallowest level satisfying `accept`, or `max_level`.
    fn first_level(&self, accept: impl Fn(GridLevel) -> bool) -> GridLevel {
        (0..=self.max_level)
            .map(GridLevel::new)
            .find(|level| accept(*level))
            .unwrap_or_else(|| GridLevel::new(self.max_level))
    }

    /// Every tile of `level` intersecting normalized `bounds`, sorted by
    /// `(left, bottom)`.
    pub fn enumerate(level: GridLevel, bounds: &Bounds) -> Vec<Bounds> {
        let rows = level.rows(bounds.bottom, bounds.top);
        let mut tiles: Vec<Bounds> = bounds
            .lon_intervals()
            .flat_map(|(west, east)| level.columns(west, east))
            .flat_map(|column| rows.clone().map(move |row| level.tile_bounds(column, row)))
            .collect();

        tiles.sort_by(|a, b| {
            a.left
                .total_cmp(&b.left)
                .then_with(|| a.bottom.total_cmp(&b.bottom))
        });
        tiles.dedup();
        tiles
    }

    fn longer_axis_count(level: GridLevel, bounds: &Bounds) -> u64 {
        if bounds.width() >= bounds.height() {
            bounds
                .lon_intervals()
                .map(|(west, east)| level.columns(west, east).count() as u64)
                .sum()
        } else {
            level.rows(bounds.bottom, bounds.top).count() as u64
        }
    }
}
