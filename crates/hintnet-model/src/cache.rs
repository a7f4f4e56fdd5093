//! LRU content cache
//!
//! Fixed-capacity cache with least-recently-used replacement. Insertion
//! reports the evicted item so callers can hand it onward (metacaching
//! strategies forward evicted copies instead of discarding them).

use hintnet_core::ContentId;

/// Fixed-capacity LRU cache of content identifiers
#[derive(Debug, Clone)]
pub struct LruCache {
    maxlen: usize,
    /// Most recently used first
    order: Vec<ContentId>,
}

impl LruCache {
    pub fn new(maxlen: usize) -> Self {
        assert!(maxlen > 0, "cache must hold at least one content");
        Self {
            maxlen,
            order: Vec::with_capacity(maxlen),
        }
    }

    pub fn maxlen(&self) -> usize {
        self.maxlen
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check presence without touching recency
    pub fn has(&self, content: ContentId) -> bool {
        self.order.contains(&content)
    }

    /// Retrieve `content`, promoting it to most recently used
    pub fn get(&mut self, content: ContentId) -> bool {
        match self.order.iter().position(|&c| c == content) {
            Some(pos) => {
                self.order.remove(pos);
                self.order.insert(0, content);
                true
            }
            None => false,
        }
    }

    /// Insert `content` as most recently used.
    ///
    /// Returns the evicted content if the cache was full. Inserting a
    /// content already present only refreshes its recency.
    pub fn put(&mut self, content: ContentId) -> Option<ContentId> {
        if self.get(content) {
            return None;
        }
        self.order.insert(0, content);
        if self.order.len() > self.maxlen {
            return self.order.pop();
        }
        None
    }

    /// Remove `content` if present
    pub fn remove(&mut self, content: ContentId) -> bool {
        match self.order.iter().position(|&c| c == content) {
            Some(pos) => {
                self.order.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Contents from most to least recently used
    pub fn dump(&self) -> &[ContentId] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let mut c = LruCache::new(2);
        assert_eq!(c.put(ContentId(1)), None);
        assert!(c.get(ContentId(1)));
        assert!(!c.get(ContentId(2)));
    }

    #[test]
    fn test_lru_eviction_order() {
        let mut c = LruCache::new(2);
        c.put(ContentId(1));
        c.put(ContentId(2));
        // touch 1 so 2 becomes the LRU victim
        c.get(ContentId(1));
        assert_eq!(c.put(ContentId(3)), Some(ContentId(2)));
        assert!(c.has(ContentId(1)));
        assert!(c.has(ContentId(3)));
    }

    #[test]
    fn test_reinsert_refreshes_without_evicting() {
        let mut c = LruCache::new(2);
        c.put(ContentId(1));
        c.put(ContentId(2));
        assert_eq!(c.put(ContentId(1)), None);
        assert_eq!(c.len(), 2);
        assert_eq!(c.dump(), &[ContentId(1), ContentId(2)]);
    }

    #[test]
    fn test_has_does_not_promote() {
        let mut c = LruCache::new(2);
        c.put(ContentId(1));
        c.put(ContentId(2));
        assert!(c.has(ContentId(1)));
        // 1 is still the LRU victim
        assert_eq!(c.put(ContentId(3)), Some(ContentId(1)));
    }

    #[test]
    fn test_remove() {
        let mut c = LruCache::new(2);
        c.put(ContentId(1));
        assert!(c.remove(ContentId(1)));
        assert!(!c.remove(ContentId(1)));
        assert!(c.is_empty());
    }
}
