use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::version::error::CacheError;
use crate::version::types::{RawItem, RepositoryId, ResourceKind};

/// Identity of one cached collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub repo: RepositoryId,
}

impl CacheKey {
    pub fn new(kind: ResourceKind, repo: RepositoryId) -> Self {
        Self { kind, repo }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "github/{}/{}", self.repo, self.kind)
    }
}

/// Source of the current instant, injectable for deterministic expiry
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    items: Arc<[RawItem]>,
    expires_at: Instant,
}

/// In-memory cache of raw repository collections with a uniform TTL
pub struct Cache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Cache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        info!("Initializing version cache with ttl {:?}", ttl);
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>>, CacheError> {
        self.entries.read().map_err(|_| CacheError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>>, CacheError> {
        self.entries.write().map_err(|_| CacheError::LockPoisoned)
    }

    /// Get the items stored for `key`, or `None` if absent or expired
    pub fn get(&self, key: &CacheKey) -> Result<Option<Arc<[RawItem]>>, CacheError> {
        let now = self.clock.now();

        {
            let entries = self.read()?;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if now < entry.expires_at => return Ok(Some(entry.items.clone())),
                Some(_) => {}
            }
        }

        // Expired: evict unless a concurrent writer already replaced it
        let mut entries = self.write()?;
        if entries.get(key).is_some_and(|entry| now >= entry.expires_at) {
            entries.remove(key);
            debug!("Evicted expired cache entry {}", key);
        }
        Ok(None)
    }

    /// Replace the items stored for `key`, resetting its expiry
    pub fn set(&self, key: CacheKey, items: impl Into<Arc<[RawItem]>>) -> Result<(), CacheError> {
        let items = items.into();
        debug!("Caching {} items for {}", items.len(), key);

        let entry = CacheEntry {
            items,
            expires_at: self.clock.now() + self.ttl,
        };
        self.write()?.insert(key, entry);
        Ok(())
    }

    /// Remove every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Number of entries that have not expired yet
    pub fn len(&self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        Ok(self
            .read()?
            .values()
            .filter(|entry| now < entry.expires_at)
            .count())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
