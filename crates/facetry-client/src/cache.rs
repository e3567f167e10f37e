//! Response cache for idempotent reads

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Memo of raw response bodies keyed by request signature
///
/// Implementations must be safe to share between concurrent requests and
/// must never hand out a partially written entry.
pub trait ResponseCache: Send + Sync {
    /// Cached body, if present and not expired
    fn get(&self, key: &str) -> Option<Arc<[u8]>>;

    /// Store a body for `ttl`
    fn put(&self, key: &str, value: Arc<[u8]>, ttl: Duration);

    /// Number of entries currently retained
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// False for the no-op cache
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Disabled cache: always misses, retains nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ResponseCache for NoopCache {
    fn get(&self, _key: &str) -> Option<Arc<[u8]>> {
        None
    }

    fn put(&self, _key: &str, _value: Arc<[u8]>, _ttl: Duration) {}

    fn len(&self) -> usize {
        0
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

struct CacheEntry {
    value: Arc<[u8]>,
    /// None when the lifetime runs past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
}

impl CacheInner {
    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    fn purge_expired(&mut self, now: Instant) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        if self.entries.len() != before {
            let entries = &self.entries;
            self.order.retain(|k| entries.contains_key(k));
        }
    }
}

/// Time- and size-bounded cache
///
/// Expired entries are dropped when looked up or when a new entry is stored.
/// Past `max_size`, the entry inserted first is evicted, whatever its use.
pub struct ExpiringCache {
    max_size: usize,
    inner: Mutex<CacheInner>,
}

impl ExpiringCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<Arc<[u8]>> {
        let mut inner = self.lock();
        match inner.entries.get(key) {
            None => return None,
            Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }
        inner.remove(key);
        None
    }

    pub fn put_at(&self, key: &str, value: Arc<[u8]>, ttl: Duration, now: Instant) {
        let mut inner = self.lock();
        inner.purge_expired(now);
        inner.remove(key);

        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now.checked_add(ttl),
            },
        );
        inner.order.push_back(key.to_string());

        while inner.entries.len() > self.max_size {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

impl ResponseCache for ExpiringCache {
    fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        self.get_at(key, Instant::now())
    }

    fn put(&self, key: &str, value: Arc<[u8]>, ttl: Duration) {
        self.put_at(key, value, ttl, Instant::now());
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }
}
