//! Time-window-aligned response cache.
//!
//! Keys combine an operation name, location id, day count, and the
//! epoch-aligned window start for the current time. A lookup hits only when
//! the stored entry's window start exactly matches the window computed for
//! "now"; a rotated window is a miss and the entry is superseded by the next
//! insert. The map lock is short-held and no external computation ever runs
//! under it.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use coast_common::aligned_window;
use lru::LruCache;

/// A cached payload scoped to one half-open time window.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

/// Hit/miss counters for the cache.
#[derive(Debug, Default)]
pub struct WindowCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

/// Bounded in-memory cache of computed series responses per window.
pub struct WindowCache<T> {
    entries: Mutex<LruCache<String, CacheEntry<T>>>,
    window_days: u32,
    stats: WindowCacheStats,
}

impl<T: Clone> WindowCache<T> {
    pub fn new(window_days: u32, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            window_days,
            stats: WindowCacheStats::default(),
        }
    }

    /// The `[start, end)` window containing `now`.
    pub fn current_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        aligned_window(now, self.window_days)
    }

    /// Look up a payload for the window containing `now`.
    pub fn get(
        &self,
        op: &str,
        location_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Option<CacheEntry<T>> {
        let (window_start, _) = self.current_window(now);
        let key = cache_key(op, location_id, days, window_start);

        let mut entries = self.entries.lock().expect("window cache lock poisoned");
        let hit = entries
            .get(&key)
            .filter(|entry| entry.window_start == window_start)
            .cloned();
        drop(entries);

        if hit.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Store a payload computed for the window containing `now`.
    pub fn insert(&self, op: &str, location_id: &str, days: u32, now: DateTime<Utc>, value: T) {
        let (window_start, window_end) = self.current_window(now);
        let key = cache_key(op, location_id, days, window_start);
        let entry = CacheEntry {
            value,
            window_start,
            window_end,
            generated_at: now,
        };

        let mut entries = self.entries.lock().expect("window cache lock poisoned");
        entries.put(key, entry);
    }

    pub fn stats(&self) -> &WindowCacheStats {
        &self.stats
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("window cache lock poisoned")
            .clear();
    }
}

fn cache_key(op: &str, location_id: &str, days: u32, window_start: DateTime<Utc>) -> String {
    format!("{}:{}:{}:{}", op, location_id, days, window_start.timestamp())
}
