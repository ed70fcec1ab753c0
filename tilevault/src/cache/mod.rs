//! In-process memory cache tier.
//!
//! A capacity-bounded map of hot tile blobs sitting in front of the
//! persistent store, so the embedded map view can fetch tiles without
//! touching the database on every request. Entries come from two
//! places: a startup preload of the most accessed persisted tiles, and
//! lazy admission on each miss-then-disk-hit read.
//!
//! There is deliberately no eviction: once the cache is full it simply
//! stops admitting new entries. The cache never holds bytes that are not
//! also durably stored, so it can be dropped and rebuilt at any time.
//!
//! All access goes through one coarse mutex; fetch workers and display
//! reads contend only briefly.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::store::TileStore;

/// Bounded map of tile key to blob.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Arc<Vec<u8>>>>,
    capacity: usize,
}

impl MemoryCache {
    /// Create an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Seed the cache with up to `capacity / 2` of the most accessed
    /// tiles from the store. Returns the number of entries loaded.
    pub fn preload(&self, store: &TileStore) -> usize {
        let budget = self.capacity / 2;
        if budget == 0 {
            return 0;
        }

        let hot = match store.most_accessed(budget) {
            Ok(hot) => hot,
            Err(e) => {
                warn!(error = %e, "memory cache preload failed, starting cold");
                return 0;
            }
        };

        let mut entries = self.entries.lock();
        for (key, blob) in hot {
            entries.insert(key, Arc::new(blob));
        }
        let loaded = entries.len();
        debug!(loaded, capacity = self.capacity, "memory cache preloaded");
        loaded
    }

    /// Look up a blob.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.lock().get(key).cloned()
    }

    /// Admit a blob if there is room.
    ///
    /// Admission stops once the cache is full; an already present key is
    /// refreshed regardless. Returns whether the entry is now cached.
    pub fn admit(&self, key: &str, blob: Arc<Vec<u8>>) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) || entries.len() < self.capacity {
            entries.insert(key.to_string(), blob);
            true
        } else {
            false
        }
    }

    /// Whether `key` is currently cached.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
