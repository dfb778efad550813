//! Bounded LRU of decoded frames.
//!
//! Purely an optimization: the reader stays correct with every access
//! missing. The mutex guards only map operations; decoding always happens
//! outside the lock.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use lru::LruCache;
use tracing::debug;

/// Frame-count-bounded LRU keyed by frame id.
///
/// Values are [`Bytes`], so handing a cached frame to a caller is a cheap
/// reference-count bump. Memory is bounded by capacity times the largest
/// decompressed frame.
#[derive(Debug)]
pub(crate) struct FrameCache {
    inner: Mutex<LruCache<usize, Bytes>>,
}

impl FrameCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a decoded frame, marking it most recently used.
    pub fn get(&self, frame: usize) -> Option<Bytes> {
        self.lock().get(&frame).cloned()
    }

    /// Insert a decoded frame, evicting the least recently used one at
    /// capacity. Concurrent inserts for the same frame are benign: the later
    /// one wins and both carry identical bytes.
    pub fn put(&self, frame: usize, data: Bytes) {
        let mut inner = self.lock();
        if inner.len() == inner.cap().get() && !inner.contains(&frame) {
            if let Some((evicted, bytes)) = inner.pop_lru() {
                debug!(frame = evicted, bytes = bytes.len(), "evicting cached frame");
            }
        }
        inner.put(frame, data);
    }

    /// Drop every cached frame.
    pub fn clear(&self) {
        self.lock().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<usize, Bytes>> {
        // A panic while holding the lock cannot leave the map logically
        // inconsistent, so a poisoned cache is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
