//! Tiled dataset facade.
//!
//! A [`TiledFormat`] turns a moving view into tile fetches and keeps a
//! resident cache that is never empty while the view changes:
//!
//! ```text
//! zoom_to(view)
//!   │
//!   ├─► GridResolver ──► WantedSet
//!   ├─► TileStore::reconcile ──► hits / in-flight / misses
//!   └─► TileLoader::fetch(misses, generation)
//!                                 │
//!          LoaderEvent ◄──────────┘
//!   handle_loader_event
//!   ├─► TileStore::admit ──► FormatEvent::Header
//!   └─► TileStore::cutover ──► FormatEvent::All
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tileview::config::FormatConfig;
//! use tileview::coord::View;
//! use tileview::format::TiledFormat;
//! use tileview::provider::EmptyFetcher;
//!
//! let mut format = TiledFormat::new(
//!     FormatConfig::new("http://example.com/tiles"),
//!     Arc::new(EmptyFetcher::immediate()),
//! );
//! format.load().await?;
//! format.zoom_to("0,0,10,5".parse::<View>()?)?;
//! format.wait_for_cutover().await?;
//! ```

mod controller;
mod service;
mod types;

pub use controller::TiledFormat;
pub use service::{FormatCommand, FormatService, DEFAULT_COMMAND_CHANNEL_CAPACITY};
pub use types::{FormatError, FormatEvent, FormatState};
