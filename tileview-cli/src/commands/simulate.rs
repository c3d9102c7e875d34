//! Simulate command - run a zoom session and report each cutover.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use tileview::config::FormatConfig;
use tileview::coord::{Bounds, View};
use tileview::format::{FormatEvent, TiledFormat};
use tileview::provider::{EmptyFetcher, FetcherKind, TileContentFetcher};
use tileview::tile::{Generation, TileId, TileState};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common::GridArgs;
use crate::error::CliError;

/// Default simulated phase duration in milliseconds.
pub const DEFAULT_SIMULATED_DELAY_MS: u64 = 50;

/// Arguments for the simulate command.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Views to zoom to, in order
    #[arg(required = true, allow_hyphen_values = true)]
    pub views: Vec<View>,

    /// Fetcher to use: empty (simulated) or http
    #[arg(long)]
    pub fetcher: Option<FetcherKind>,

    /// Simulated header phase duration
    #[arg(long, default_value_t = DEFAULT_SIMULATED_DELAY_MS)]
    pub header_ms: u64,

    /// Simulated content phase duration
    #[arg(long, default_value_t = DEFAULT_SIMULATED_DELAY_MS)]
    pub content_ms: u64,

    /// Make the header of this tile fail (`left,bottom,right,top`)
    #[arg(long = "fail", value_name = "TILE", allow_hyphen_values = true)]
    pub failing: Vec<Bounds>,

    /// Issue every zoom immediately and only wait for the last one
    #[arg(long)]
    pub no_wait: bool,

    #[command(flatten)]
    pub grid: GridArgs,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs, config: FormatConfig) -> Result<(), CliError> {
    let mut config = args.grid.apply(config);
    if let Some(kind) = args.fetcher {
        config.fetcher = kind;
    }
    let fetcher = create_fetcher(&args, &config)?;

    let shutdown = CancellationToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received shutdown signal, stopping...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    runtime.block_on(async move {
        tokio::select! {
            result = session(args, config, fetcher) => result,
            _ = shutdown.cancelled() => Err(CliError::Interrupted),
        }
    })
}

fn create_fetcher(
    args: &SimulateArgs,
    config: &FormatConfig,
) -> Result<Arc<dyn TileContentFetcher>, CliError> {
    match config.fetcher {
        FetcherKind::Empty => {
            let fetcher = EmptyFetcher::new(
                Duration::from_millis(args.header_ms),
                Duration::from_millis(args.content_ms),
            );
            for bounds in &args.failing {
                fetcher.fail_header(TileId::from_bounds(bounds));
            }
            Ok(Arc::new(fetcher))
        }
        kind => {
            if !args.failing.is_empty() {
                return Err(CliError::Config(
                    "--fail is only supported by the empty fetcher".to_string(),
                ));
            }
            Ok(kind.create()?)
        }
    }
}

async fn session(
    args: SimulateArgs,
    config: FormatConfig,
    fetcher: Arc<dyn TileContentFetcher>,
) -> Result<(), CliError> {
    println!("Source:     {}", config.source);
    println!("Fetcher:    {}", fetcher.name());
    println!(
        "Grid:       {} tiles per screen, {} rule, max level {}",
        config.tiles_per_screen, config.level_rule, config.max_level
    );
    println!();

    let mut format = TiledFormat::new(config, fetcher);
    let mut events = format.subscribe();
    format.load().await?;

    let last = args.views.len().saturating_sub(1);
    for (index, view) in args.views.into_iter().enumerate() {
        let started = Instant::now();
        let generation = format.zoom_to(view)?;
        println!(
            "{} zoom to {} (level {}, {} tiles, {} to fetch)",
            generation,
            view,
            format.level().map(|l| l.index()).unwrap_or_default(),
            format.wanted_tiles().len(),
            format.loading_tiles().len()
        );

        if args.no_wait && index != last {
            continue;
        }

        let outcome = format.wait_for_cutover().await;
        report(&mut events, generation, started.elapsed());
        match outcome {
            Ok(_) => println!(
                "{} resident: {} tiles cached, {} with content",
                generation,
                format.cached_tiles().len(),
                format.store().count_in_state(TileState::ContentLoaded)
            ),
            Err(e) => println!(
                "{} abandoned: {} ({} tiles still cached)",
                generation,
                e,
                format.cached_tiles().len()
            ),
        }
        println!();
    }

    info!(generations = %format.generation(), "Session complete");
    Ok(())
}

/// Summarize the events broadcast while `generation` loaded.
fn report(events: &mut broadcast::Receiver<FormatEvent>, generation: Generation, elapsed: Duration) {
    let mut headers = 0;
    let mut errors = 0;
    let mut resident = None;
    while let Ok(event) = events.try_recv() {
        match event {
            FormatEvent::Header { .. } => headers += 1,
            FormatEvent::Error(e) => {
                errors += 1;
                println!("  error: {}", e);
            }
            FormatEvent::All { generation: g, .. } => resident = Some(g),
            FormatEvent::Load(_) | FormatEvent::Content { .. } => {}
        }
    }
    println!(
        "  {} headers, {} errors, cutover {} after {} ms",
        headers,
        errors,
        match resident {
            Some(g) if g == generation => "done",
            Some(_) => "of an earlier generation",
            None => "pending",
        },
        elapsed.as_millis()
    );
}
