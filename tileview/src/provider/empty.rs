//! Simulated fetcher producing tiles with no content.
//!
//! [`EmptyFetcher`] stands in for a real backend: headers and contents are
//! empty, and each phase completes after a configurable delay. In manual
//! mode header phases wait until [`EmptyFetcher::release_header`] is called,
//! which lets callers drive progress externally (tests, demos).

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::trace;

use super::types::{BoxFuture, FetchError, TileContentFetcher};
use crate::tile::{Header, TileContent, TileId, TileRequest};

/// Default simulated header phase duration.
pub const DEFAULT_HEADER_DELAY: Duration = Duration::from_millis(1000);

/// Default simulated content phase duration.
pub const DEFAULT_CONTENT_DELAY: Duration = Duration::from_millis(1000);

/// Release gate for the manual header phases of one tile.
struct Gate {
    permits: Arc<Semaphore>,
    waiters: usize,
}

impl Gate {
    fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
            waiters: 0,
        }
    }
}

/// Fetcher for an empty dataset with simulated latency.
pub struct EmptyFetcher {
    /// `None` puts header phases in manual mode.
    header_delay: Option<Duration>,
    content_delay: Duration,
    gates: Mutex<HashMap<TileId, Gate>>,
    failing_headers: Mutex<HashSet<TileId>>,
    failing_contents: Mutex<HashSet<TileId>>,
    metadata_error: Mutex<Option<String>>,
    header_calls: AtomicUsize,
    content_calls: AtomicUsize,
}

impl Default for EmptyFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_DELAY, DEFAULT_CONTENT_DELAY)
    }
}

impl EmptyFetcher {
    /// A fetcher whose phases complete after fixed delays.
    pub fn new(header_delay: Duration, content_delay: Duration) -> Self {
        Self::with_header_delay(Some(header_delay), content_delay)
    }

    /// A fetcher whose phases complete without delay.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// A fetcher whose header phases complete only when released.
    pub fn manual() -> Self {
        Self::with_header_delay(None, Duration::ZERO)
    }

    fn with_header_delay(header_delay: Option<Duration>, content_delay: Duration) -> Self {
        Self {
            header_delay,
            content_delay,
            gates: Mutex::new(HashMap::new()),
            failing_headers: Mutex::new(HashSet::new()),
            failing_contents: Mutex::new(HashSet::new()),
            metadata_error: Mutex::new(None),
            header_calls: AtomicUsize::new(0),
            content_calls: AtomicUsize::new(0),
        }
    }

    /// Let one header phase of `tile` complete.
    ///
    /// May be called before the phase starts; the release is remembered.
    pub fn release_header(&self, tile: &TileId) {
        self.gates
            .lock()
            .entry(tile.clone())
            .or_insert_with(Gate::new)
            .permits
            .add_permits(1);
    }

    /// Release every header phase currently waiting.
    pub fn release_all(&self) {
        for gate in self.gates.lock().values() {
            let missing = gate.waiters.saturating_sub(gate.permits.available_permits());
            gate.permits.add_permits(missing);
        }
    }

    /// Make every future header phase of `tile` fail.
    pub fn fail_header(&self, tile: TileId) {
        self.failing_headers.lock().insert(tile);
    }

    /// Make every future content phase of `tile` fail.
    pub fn fail_content(&self, tile: TileId) {
        self.failing_contents.lock().insert(tile);
    }

    /// Make metadata loading fail with `message`.
    pub fn fail_metadata(&self, message: impl Into<String>) {
        *self.metadata_error.lock() = Some(message.into());
    }

    /// Number of header phases started so far.
    pub fn header_calls(&self) -> usize {
        self.header_calls.load(Ordering::Relaxed)
    }

    /// Number of content phases started so far.
    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::Relaxed)
    }

    /// Register a waiter on the gate of `tile`.
    fn enter_gate(&self, tile: &TileId) -> Arc<Semaphore> {
        let mut gates = self.gates.lock();
        let gate = gates.entry(tile.clone()).or_insert_with(Gate::new);
        gate.waiters += 1;
        Arc::clone(&gate.permits)
    }

    /// Unregister a waiter; drained gates are dropped.
    fn leave_gate(&self, tile: &TileId) {
        let mut gates = self.gates.lock();
        if let Entry::Occupied(mut entry) = gates.entry(tile.clone()) {
            let gate = entry.get_mut();
            gate.waiters = gate.waiters.saturating_sub(1);
            if gate.waiters == 0 && gate.permits.available_permits() == 0 {
                entry.remove();
            }
        }
    }

    async fn wait_for_release(&self, tile: &TileId) -> Result<(), FetchError> {
        let permits = self.enter_gate(tile);
        let _waiter = GateWaiter {
            fetcher: self,
            tile,
        };
        let permit = permits.acquire().await.map_err(|_| FetchError::Cancelled)?;
        permit.forget();
        Ok(())
    }
}

/// Unregisters a waiter when its header phase ends or is dropped.
struct GateWaiter<'a> {
    fetcher: &'a EmptyFetcher,
    tile: &'a TileId,
}

impl Drop for GateWaiter<'_> {
    fn drop(&mut self) {
        self.fetcher.leave_gate(self.tile);
    }
}

impl TileContentFetcher for EmptyFetcher {
    fn load_metadata<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<Header, FetchError>> {
        Box::pin(async move {
            if let Some(message) = self.metadata_error.lock().clone() {
                return Err(FetchError::Injected(message));
            }
            trace!(source, "Loaded empty dataset header");
            Ok(Header::default())
        })
    }

    fn fetch_header<'a>(
        &'a self,
        request: &'a TileRequest,
    ) -> BoxFuture<'a, Result<Header, FetchError>> {
        Box::pin(async move {
            self.header_calls.fetch_add(1, Ordering::Relaxed);
            if self.failing_headers.lock().contains(request.id()) {
                return Err(FetchError::Injected(format!(
                    "header of {} failed",
                    request.id()
                )));
            }

            match self.header_delay {
                Some(delay) if !delay.is_zero() => tokio::time::sleep(delay).await,
                Some(_) => {}
                None => self.wait_for_release(request.id()).await?,
            }

            Ok(Header::default())
        })
    }

    fn fetch_content<'a>(
        &'a self,
        request: &'a TileRequest,
        _header: &'a Header,
    ) -> BoxFuture<'a, Result<TileContent, FetchError>> {
        Box::pin(async move {
            self.content_calls.fetch_add(1, Ordering::Relaxed);
            if !self.content_delay.is_zero() {
                tokio::time::sleep(self.content_delay).await;
            }
            if self.failing_contents.lock().contains(request.id()) {
                return Err(FetchError::Injected(format!(
                    "content of {} failed",
                    request.id()
                )));
            }
            Ok(TileContent::empty())
        })
    }

    fn name(&self) -> &str {
        "empty"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Bounds;

    fn request() -> TileRequest {
        let bounds = Bounds::new(0.0, 0.0, 2.8125, 1.40625);
        TileRequest::new(TileId::from_bounds(&bounds), bounds, "http://example.com/empty")
    }

    #[tokio::test]
    async fn test_immediate_phases() {
        let fetcher = EmptyFetcher::immediate();
        let request = request();

        let header = fetcher.fetch_header(&request).await.unwrap();
        assert_eq!(header, Header::default());
        let content = fetcher.fetch_content(&request, &header).await.unwrap();
        assert!(content.is_empty());

        assert_eq!(fetcher.header_calls(), 1);
        assert_eq!(fetcher.content_calls(), 1);
    }

    #[tokio::test]
    async fn test_manual_header_waits_for_release() {
        let fetcher = Arc::new(EmptyFetcher::manual());
        let request = request();

        let waiting = {
            let fetcher = Arc::clone(&fetcher);
            let request = request.clone();
            tokio::spawn(async move { fetcher.fetch_header(&request).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished(), "header must wait for release");

        fetcher.release_header(request.id());
        let header = tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("released header should complete")
            .unwrap();
        assert!(header.is_ok());
    }

    #[tokio::test]
    async fn test_release_before_fetch_is_remembered() {
        let fetcher = EmptyFetcher::manual();
        let request = request();
        fetcher.release_header(request.id());

        let result = tokio::time::timeout(Duration::from_secs(1), fetcher.fetch_header(&request))
            .await
            .expect("pre-released header should complete");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_release_all_wakes_every_waiter() {
        let fetcher = Arc::new(EmptyFetcher::manual());
        let request = request();

        let waiting: Vec<_> = (0..2)
            .map(|_| {
                let fetcher = Arc::clone(&fetcher);
                let request = request.clone();
                tokio::spawn(async move { fetcher.fetch_header(&request).await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fetcher.gates.lock().get(request.id()).map(|g| g.waiters), Some(2));

        fetcher.release_all();
        for handle in waiting {
            let header = tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("every waiter should be released")
                .unwrap();
            assert!(header.is_ok());
        }
        assert!(fetcher.gates.lock().is_empty(), "drained gates are dropped");
    }

    #[tokio::test]
    async fn test_abandoned_wait_leaves_no_gate() {
        let fetcher = EmptyFetcher::manual();
        let request = request();

        let result =
            tokio::time::timeout(Duration::from_millis(20), fetcher.fetch_header(&request)).await;
        assert!(result.is_err(), "header must wait for release");
        assert!(fetcher.gates.lock().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let fetcher = EmptyFetcher::immediate();
        let request = request();
        fetcher.fail_header(request.id().clone());
        fetcher.fail_metadata("no such dataset");

        assert!(matches!(
            fetcher.fetch_header(&request).await,
            Err(FetchError::Injected(_))
        ));
        assert_eq!(
            fetcher.load_metadata("http://example.com").await,
            Err(FetchError::Injected("no such dataset".to_string()))
        );
    }
}
