use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

/// Default entry lifetime shared by every cache in the service.
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400); // 24 hours

/// Time source injected into caches so tests can control expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock. Ships outside `cfg(test)` so downstream crates
/// can drive cache expiry in their own tests.
#[derive(Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap()
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Process-wide read-through cache with lazy TTL expiry.
///
/// An entry older than the TTL is treated as absent: `get` removes it and
/// reports a miss. There is no background sweep. Two concurrent misses on
/// the same key may both recompute; both writers store equivalent values,
/// so last-write-wins is safe.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL, Arc::new(SystemClock))
    }

    /// Fetch a live entry, dropping it if it has aged out.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("cache entry expired, treating as miss");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value, overwriting any previous entry for the key.
    ///
    /// Callers must only insert fully computed values; a half-built value
    /// would be served to every reader within the TTL window.
    pub fn insert(&self, key: K, value: V) {
        let stored_at = self.clock.now();
        self.entries
            .lock()
            .unwrap()
            .insert(key, Entry { value, stored_at });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
