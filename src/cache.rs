use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::web::Bytes;
use dashmap::DashMap;

/// Seconds a rendered index page stays valid.
pub const DEFAULT_PAGE_TTL: Duration = Duration::from_secs(20);

#[derive(Clone)]
struct CachedPage {
    body: Bytes,
    content_type: String,
    stored_at: Instant,
}

/// Entry cap, matching the usual local-memory cache default.
pub const DEFAULT_MAX_ENTRIES: usize = 300;

/// Whole-response cache keyed by request URI.
///
/// Entries live for a fixed TTL and are never invalidated by writes: a post
/// created right after a hit stays invisible until the entry expires or the
/// cache is cleared. Every insert drops expired entries, and once the cap is
/// reached the oldest entries make room.
#[derive(Clone)]
pub struct PageCache {
    store: Arc<DashMap<String, CachedPage>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for PageCache {
    fn default() -> Self { Self::new(DEFAULT_PAGE_TTL) }
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self { store: Arc::new(DashMap::new()), ttl, max_entries: max_entries.max(1) }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    pub fn max_entries(&self) -> usize { self.max_entries }

    /// Returns the cached body and content type when a live entry exists.
    /// Expired entries are dropped on the way.
    pub fn get(&self, key: &str) -> Option<(Bytes, String)> {
        let hit = self.store.get(key).map(|e| e.clone())?;
        if hit.stored_at.elapsed() >= self.ttl {
            self.store.remove_if(key, |_, e| e.stored_at == hit.stored_at);
            return None;
        }
        Some((hit.body, hit.content_type))
    }

    pub fn insert(&self, key: impl Into<String>, body: Bytes, content_type: impl Into<String>) {
        let key = key.into();
        self.sweep_expired();
        if !self.store.contains_key(&key) {
            self.evict_oldest(self.max_entries - 1);
        }
        self.store.insert(
            key,
            CachedPage { body, content_type: content_type.into(), stored_at: Instant::now() },
        );
    }

    fn sweep_expired(&self) {
        let ttl = self.ttl;
        self.store.retain(|_, e| e.stored_at.elapsed() < ttl);
    }

    /// Drops the oldest entries until at most `keep` remain.
    fn evict_oldest(&self, keep: usize) {
        let excess = self.store.len().saturating_sub(keep);
        if excess == 0 {
            return;
        }
        let mut by_age: Vec<(String, Instant)> =
            self.store.iter().map(|e| (e.key().clone(), e.stored_at)).collect();
        by_age.sort_by_key(|(_, stored_at)| *stored_at);
        for (key, _) in by_age.into_iter().take(excess) {
            self.store.remove(&key);
        }
    }

    pub fn clear(&self) { self.store.clear(); }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }
}
