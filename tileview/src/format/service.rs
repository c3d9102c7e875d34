//! Long-running control task for a tiled format.

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::controller::TiledFormat;
use super::types::FormatEvent;
use crate::coord::View;

/// Default channel capacity for format commands.
pub const DEFAULT_COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Requests accepted by a [`FormatService`].
#[derive(Debug, Clone)]
pub enum FormatCommand {
    Load,
    ZoomTo(View),
}

/// Runs a [`TiledFormat`] as the single control task.
///
/// Commands and loader completions are handled in one loop, so every
/// mutation of the cache happens on this task:
///
/// ```text
/// FormatCommand ──► mpsc ──┐
///                          ├─► select! ──► TiledFormat ──► broadcast<FormatEvent>
/// LoaderEvent ──► mpsc ────┘
/// ```
///
/// # Example
///
/// ```ignore
/// let (service, commands) = FormatService::new(format, DEFAULT_COMMAND_CHANNEL_CAPACITY);
/// let mut events = service.subscribe();
/// let shutdown = CancellationToken::new();
/// tokio::spawn(service.run(shutdown.clone()));
///
/// commands.send(FormatCommand::Load).await?;
/// commands.send(FormatCommand::ZoomTo(view)).await?;
/// ```
pub struct FormatService {
    format: TiledFormat,
    commands: mpsc::Receiver<FormatCommand>,
}

impl FormatService {
    /// Wraps `format` and returns the sender for its commands.
    pub fn new(format: TiledFormat, capacity: usize) -> (Self, mpsc::Sender<FormatCommand>) {
        let (tx, commands) = mpsc::channel(capacity.max(1));
        (Self { format, commands }, tx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FormatEvent> {
        self.format.subscribe()
    }

    /// Runs until shutdown is signalled or every command sender is dropped.
    ///
    /// Returns the format for inspection.
    pub async fn run(self, shutdown: CancellationToken) -> TiledFormat {
        info!("Format service starting");

        let Self {
            mut format,
            mut commands,
        } = self;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Format service shutting down");
                    break;
                }

                Some(event) = format.next_completion() => {
                    format.handle_loader_event(event);
                }

                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("Command channel closed");
                        break;
                    };
                    Self::handle_command(&mut format, command).await;
                }
            }
        }

        format
    }

    async fn handle_command(format: &mut TiledFormat, command: FormatCommand) {
        match command {
            FormatCommand::Load => {
                // Failures are also broadcast as events.
                if let Err(e) = format.load().await {
                    warn!(error = %e, "Load failed");
                }
            }
            FormatCommand::ZoomTo(view) => {
                if let Err(e) = format.zoom_to(view) {
                    warn!(view = %view, error = %e, "Zoom rejected");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatConfig;
    use crate::coord::Bounds;
    use crate::provider::EmptyFetcher;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_service_loads_and_cuts_over() {
        let format = TiledFormat::new(
            FormatConfig::new("http://example.com/empty"),
            Arc::new(EmptyFetcher::immediate()),
        );
        let (service, commands) = FormatService::new(format, DEFAULT_COMMAND_CHANNEL_CAPACITY);
        let mut events = service.subscribe();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(service.run(shutdown.clone()));

        commands.send(FormatCommand::Load).await.unwrap();
        commands
            .send(FormatCommand::ZoomTo(View::new(Bounds::new(0.0, 0.0, 10.0, 5.0))))
            .await
            .unwrap();

        let all = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let FormatEvent::All { generation, tiles } = events.recv().await.unwrap() {
                    return (generation, tiles);
                }
            }
        })
        .await
        .expect("All event should arrive");
        assert_eq!(all.0.value(), 1);
        assert_eq!(all.1.len(), 16);

        shutdown.cancel();
        let format = handle.await.unwrap();
        assert_eq!(format.cached_tiles().len(), 16);
    }

    #[tokio::test]
    async fn test_service_stops_when_commands_close() {
        let format = TiledFormat::new(
            FormatConfig::new("http://example.com/empty"),
            Arc::new(EmptyFetcher::immediate()),
        );
        let (service, commands) = FormatService::new(format, 4);
        drop(commands);

        let format = tokio::time::timeout(Duration::from_secs(1), service.run(CancellationToken::new()))
            .await
            .expect("service should stop");
        assert_eq!(format.generation().value(), 0);
    }
}
