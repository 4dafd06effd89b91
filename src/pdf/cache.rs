//! LRU cache of rendered pages

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::types::RenderedPage;

/// Cache key for rendered pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page number (1-indexed)
    pub page: usize,
    /// Requested scale (stored as millionths for stable hashing)
    pub scale_millionths: u32,
}

impl CacheKey {
    #[must_use]
    pub fn new(page: usize, scale: f32) -> Self {
        Self {
            page,
            scale_millionths: (scale * 1_000_000.0) as u32,
        }
    }
}

/// LRU cache for rendered pages of the current document
pub struct PageCache {
    cache: LruCache<CacheKey, Arc<RenderedPage>>,
}

impl PageCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached page, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<RenderedPage>> {
        self.cache.get(key).cloned()
    }

    /// Insert a page into the cache, returning an Arc to the data
    pub fn insert(&mut self, key: CacheKey, page: RenderedPage) -> Arc<RenderedPage> {
        let arc = Arc::new(page);
        self.cache.put(key, Arc::clone(&arc));
        arc
    }

    /// Clear all cached pages
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }
}
