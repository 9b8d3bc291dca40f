//! Time-bounded cache with lazy expiry
//!
//! All operations take a single mutex for their full duration. The cache holds
//! one entry family per in-flight branch lookup, so a coarse lock is plenty.

use log::trace;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A cached value together with its absolute deadline
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe keyed cache where every entry expires after a fixed TTL
///
/// The TTL is set once at construction and applied uniformly to every
/// inserted entry. An entry is visible to [`get`](Self::get) only while the
/// current time is strictly before its deadline.
///
/// # Thread Safety
///
/// `get`, `set` and `clear` are fully serialized against each other. A
/// `clear` is therefore linearizable with respect to concurrent lookups: a
/// lookup either finishes before the clear or observes the empty cache.
#[derive(Debug)]
pub struct ExpireCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    default_expiry: Duration,
}

impl<K, V> ExpireCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache whose entries live for `default_expiry`
    pub fn new(default_expiry: Duration) -> Self {
        Self {
            // HashMap::new does not allocate until the first insert
            entries: Mutex::new(HashMap::new()),
            default_expiry,
        }
    }

    /// The TTL applied to every entry
    pub fn default_expiry(&self) -> Duration {
        self.default_expiry
    }

    /// Look up a live entry
    ///
    /// Returns a clone of the stored value if the entry has not expired yet.
    /// An expired entry is evicted as part of this call.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            trace!("Evicting expired cache entry");
            entries.remove(key);
        }
        None
    }

    /// Insert or replace the entry for `key`, expiring `default_expiry` from now
    pub fn set(&self, key: K, value: V) {
        let expires_at = Instant::now() + self.default_expiry;
        self.lock().insert(key, Entry { value, expires_at });
    }

    /// Drop every entry, expired or not
    pub fn clear(&self) {
        let mut entries = self.lock();
        trace!("Clearing {} cache entries", entries.len());
        *entries = HashMap::new();
    }

    /// Number of resident entries, including expired ones not yet observed
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no entries are resident
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Return a guard that clears the cache when it goes out of scope
    ///
    /// Hold the guard across an operation that may change what the cache
    /// describes. The clear runs exactly once on every exit path: normal
    /// return, early `?` return, and the enclosing future being dropped.
    pub fn clear_on_drop(&self) -> ClearOnDrop<'_, K, V> {
        ClearOnDrop { cache: self }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        // Every mutation is a single map call, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the owning [`ExpireCache`] when dropped
///
/// Created by [`ExpireCache::clear_on_drop`].
#[must_use = "the cache is cleared as soon as the guard is dropped"]
pub struct ClearOnDrop<'a, K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    cache: &'a ExpireCache<K, V>,
}

impl<K, V> Drop for ClearOnDrop<'_, K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn drop(&mut self) {
        self.cache.clear();
    }
}
