//! TileView - tiled spatiotemporal data cache and loader
//!
//! Given a visible geographic window (and optionally a time range), this
//! library works out which grid tiles cover it, fetches them asynchronously
//! and keeps a resident cache that is replaced only once the next set of
//! tiles is ready, so the view never goes blank.
//!
//! # Modules
//!
//! - [`coord`]: bounds, views and dateline normalization
//! - [`grid`]: level selection and tile enumeration
//! - [`tile`]: tile identity, lifecycle and payloads
//! - [`store`]: the resident cache and retain-until-ready cutover
//! - [`provider`]: pluggable tile content fetchers
//! - [`loader`]: per-tile asynchronous fetch tasks
//! - [`format`]: the `load` / `zoom_to` facade and its events
//! - [`config`]: typed settings and the INI config file

pub mod config;
pub mod coord;
pub mod format;
pub mod grid;
pub mod loader;
pub mod provider;
pub mod store;
pub mod tile;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
