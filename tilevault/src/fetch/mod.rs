//! Bounded-concurrency batch tile fetcher.
//!
//! Given an ordered list of tile URLs, ensures each is present in the
//! store: URLs already persisted are skipped, the rest are fetched over
//! a small fixed worker pool and written through [`TileStore::put`].
//!
//! The list is processed in fixed-size chunks, in submission order. A
//! progress notification fires after every chunk and a short throttling
//! delay separates chunks so the tile provider is not hammered.
//! Cancellation is cooperative and chunk-granular: the run flag is
//! checked before each chunk, and in-flight requests of the current
//! chunk are allowed to finish.
//!
//! Individual fetch failures (timeout, non-200, transport error) skip
//! that one tile with a warning; they never abort the batch.

mod http;

pub use http::{FetchError, HttpClient, ReqwestClient};

#[cfg(test)]
pub use http::tests::MockHttpClient;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::store::TileStore;

/// Cooperative cancellation flag shared between the caller and a
/// running batch fetch.
///
/// Cloning yields a handle to the same flag. Cancellation takes effect
/// at the next chunk boundary; keep chunks small for bounded
/// latency-to-cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Progress callback invoked with `(processed, total)` after each chunk.
pub type ProgressSink<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Chunked, pooled downloader writing through to the tile store.
pub struct BatchFetcher {
    client: Arc<dyn HttpClient>,
    store: TileStore,
    workers: usize,
    chunk_size: usize,
    throttle: Duration,
}

impl BatchFetcher {
    /// Create a fetcher.
    ///
    /// `workers` and `chunk_size` are clamped to at least 1.
    pub fn new(
        client: Arc<dyn HttpClient>,
        store: TileStore,
        workers: usize,
        chunk_size: usize,
        throttle: Duration,
    ) -> Self {
        Self {
            client,
            store,
            workers: workers.max(1),
            chunk_size: chunk_size.max(1),
            throttle,
        }
    }

    /// Ensure every URL in `urls` is present in the store.
    ///
    /// Returns the number of tiles newly downloaded. Progress counts are
    /// strictly non-decreasing and cover skipped tiles too, so the final
    /// notification reports `(total, total)` on an uncancelled run.
    pub fn fetch_batch(
        &self,
        urls: &[String],
        progress: Option<ProgressSink<'_>>,
        cancel: &CancelToken,
    ) -> usize {
        let total = urls.len();
        let mut processed = 0usize;
        let mut downloaded = 0usize;

        let chunks: Vec<&[String]> = urls.chunks(self.chunk_size).collect();
        let chunk_count = chunks.len();

        for (index, chunk) in chunks.into_iter().enumerate() {
            if cancel.is_cancelled() {
                debug!(processed, total, "batch fetch cancelled");
                break;
            }

            let missing: Vec<&String> = chunk
                .iter()
                .filter(|url| !self.store.exists(url).unwrap_or(false))
                .collect();

            downloaded += self.fetch_chunk(&missing);
            processed += chunk.len();

            if let Some(sink) = progress {
                sink(processed, total);
            }

            if index + 1 < chunk_count && !self.throttle.is_zero() {
                thread::sleep(self.throttle);
            }
        }

        debug!(downloaded, processed, total, "batch fetch finished");
        downloaded
    }

    /// Fan one chunk's missing URLs out over the worker pool.
    fn fetch_chunk(&self, missing: &[&String]) -> usize {
        if missing.is_empty() {
            return 0;
        }

        let next = AtomicUsize::new(0);
        let succeeded = AtomicUsize::new(0);
        let workers = self.workers.min(missing.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(url) = missing.get(index) else {
                        break;
                    };
                    match self.client.get(url) {
                        Ok(body) => match self.store.put(url, &body) {
                            Ok(()) => {
                                succeeded.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(e) => {
                                warn!(%url, error = %e, "failed to persist tile, skipping")
                            }
                        },
                        Err(e) => warn!(%url, error = %e, "tile fetch failed, skipping"),
                    }
                });
            }
        });

        succeeded.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tempfile::tempdir;

    fn open_store(dir: &std::path::Path) -> TileStore {
        TileStore::open(dir.join("tiles.db"), dir.join("tiles")).unwrap()
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://t/{i}")).collect()
    }

    #[test]
    fn test_fetch_batch_downloads_all() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let client = Arc::new(MockHttpClient::succeeding(b"tile"));
        let fetcher = BatchFetcher::new(
            client.clone(),
            store.clone(),
            5,
            50,
            Duration::ZERO,
        );

        let count = fetcher.fetch_batch(&urls(7), None, &CancelToken::new());

        assert_eq!(count, 7);
        assert_eq!(client.call_count(), 7);
        assert_eq!(store.count().unwrap(), 7);
        assert!(store.exists("http://t/0").unwrap());
    }

    #[test]
    fn test_fetch_batch_skips_cached() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        store.put("http://t/0", b"cached").unwrap();

        let client = Arc::new(MockHttpClient::succeeding(b"tile"));
        let fetcher =
            BatchFetcher::new(client.clone(), store.clone(), 5, 50, Duration::ZERO);

        let count = fetcher.fetch_batch(&urls(3), None, &CancelToken::new());

        assert_eq!(count, 2, "already cached tile must not be re-fetched");
        assert_eq!(client.call_count(), 2);
        // The cached blob survives untouched.
        assert_eq!(
            store.get("http://t/0").unwrap().as_deref(),
            Some(b"cached".as_slice())
        );
    }

    #[test]
    fn test_refetches_tile_whose_blob_was_lost() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        store.put("http://t/0", b"original").unwrap();
        std::fs::remove_file(store.blob_path("http://t/0")).unwrap();

        let client = Arc::new(MockHttpClient::succeeding(b"replacement"));
        let fetcher =
            BatchFetcher::new(client.clone(), store.clone(), 5, 50, Duration::ZERO);

        // The orphaned row must not mask the missing blob.
        let count = fetcher.fetch_batch(&urls(1), None, &CancelToken::new());

        assert_eq!(count, 1);
        assert_eq!(client.call_count(), 1);
        assert_eq!(
            store.get("http://t/0").unwrap().as_deref(),
            Some(b"replacement".as_slice())
        );
    }

    #[test]
    fn test_fetch_failures_are_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let fetcher = BatchFetcher::new(
            Arc::new(MockHttpClient::failing()),
            store.clone(),
            5,
            50,
            Duration::ZERO,
        );

        let count = fetcher.fetch_batch(&urls(4), None, &CancelToken::new());

        assert_eq!(count, 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_progress_per_chunk_and_non_decreasing() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let fetcher = BatchFetcher::new(
            Arc::new(MockHttpClient::succeeding(b"t")),
            store,
            2,
            3,
            Duration::ZERO,
        );

        let reports: Mutex<Vec<(usize, usize)>> = Mutex::new(Vec::new());
        let sink = |processed: usize, total: usize| {
            reports.lock().push((processed, total));
        };
        fetcher.fetch_batch(&urls(7), Some(&sink), &CancelToken::new());

        let reports = reports.into_inner();
        assert_eq!(reports, vec![(3, 7), (6, 7), (7, 7)]);
    }

    #[test]
    fn test_precancelled_fetch_does_nothing() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let client = Arc::new(MockHttpClient::succeeding(b"t"));
        let fetcher = BatchFetcher::new(client.clone(), store, 5, 50, Duration::ZERO);

        let cancel = CancelToken::new();
        cancel.cancel();
        let count = fetcher.fetch_batch(&urls(5), None, &cancel);

        assert_eq!(count, 0);
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn test_cancel_after_first_chunk() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let client = Arc::new(MockHttpClient::succeeding(b"t"));
        // 3 chunks of 4.
        let fetcher = BatchFetcher::new(client.clone(), store, 2, 4, Duration::ZERO);

        let cancel = CancelToken::new();
        let cancel_from_sink = cancel.clone();
        let sink = move |_processed: usize, _total: usize| {
            // Trip the flag as soon as the first chunk reports.
            cancel_from_sink.cancel();
        };
        let count = fetcher.fetch_batch(&urls(12), Some(&sink), &cancel);

        // Only the first chunk ran; in-flight work of that chunk completed.
        assert_eq!(count, 4);
        assert_eq!(client.call_count(), 4);
    }

    #[test]
    fn test_worker_pool_is_bounded() {
        use std::sync::atomic::AtomicUsize;

        struct ConcurrencyProbe {
            current: AtomicUsize,
            peak: AtomicUsize,
        }

        impl HttpClient for ConcurrencyProbe {
            fn get(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                self.current.fetch_sub(1, Ordering::SeqCst);
                Ok(vec![0])
            }
        }

        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let probe = Arc::new(ConcurrencyProbe {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let fetcher = BatchFetcher::new(probe.clone(), store, 3, 50, Duration::ZERO);

        fetcher.fetch_batch(&urls(20), None, &CancelToken::new());

        assert!(
            probe.peak.load(Ordering::SeqCst) <= 3,
            "no more than `workers` requests may be in flight"
        );
    }
}
