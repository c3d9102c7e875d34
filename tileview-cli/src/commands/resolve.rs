//! Resolve command - show the tiles covering a view.

use clap::Args;
use tileview::config::FormatConfig;
use tileview::coord::View;
use tileview::grid::Resolution;
use tileview::tile::{TileId, TileRequest};

use super::common::GridArgs;
use crate::error::CliError;

/// Arguments for the resolve command.
#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// View as `left,bottom,right,top` or `start,end;left,bottom,right,top`
    #[arg(allow_hyphen_values = true)]
    pub view: View,

    /// Print the URL of every tile instead of its identity
    #[arg(long)]
    pub urls: bool,

    #[command(flatten)]
    pub grid: GridArgs,
}

/// Run the resolve command.
pub fn run(args: ResolveArgs, config: FormatConfig) -> Result<(), CliError> {
    let config = args.grid.apply(config);
    let resolution = config.resolver().resolve(&args.view, config.tiles_per_screen);

    for line in render(&args.view, &resolution, args.urls.then_some(config.source.as_str())) {
        println!("{}", line);
    }
    Ok(())
}

fn render(view: &View, resolution: &Resolution, source: Option<&str>) -> Vec<String> {
    let level = resolution.level;
    let mut lines = vec![
        format!("View:       {}", view),
        format!(
            "Level:      {} ({} x {} degrees)",
            level.index(),
            level.tile_width(),
            level.tile_height()
        ),
        format!("Bounds:     {}", resolution.bounds),
        format!("Tiles:      {}", resolution.tiles.len()),
        String::new(),
    ];

    lines.extend(resolution.tiles.iter().map(|bounds| {
        let id = TileId::from_bounds(bounds);
        match source {
            Some(source) => TileRequest::new(id, *bounds, source).url().to_string(),
            None => id.to_string(),
        }
    }));
    lines
}
