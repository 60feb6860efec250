//! LRU cache over transitions
//!
//! Hot query prefixes revisit the same `(position, token)` pairs. Caching the
//! resulting position skips the failure walk and, for memory-mapped indexes,
//! the page faults behind it.

use crate::index::types::Token;
use crate::query::{NextToken, SuffixIndex};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Default number of cached transitions
pub const DEFAULT_CACHE_SIZE: usize = 65536;

/// Wraps any index, memoizing `transition_and_count`
pub struct CachedIndex<I: SuffixIndex> {
    inner: I,
    transitions: Mutex<LruCache<(I::Position, Token), I::Position>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<I: SuffixIndex> CachedIndex<I> {
    /// A `capacity` of 0 falls back to [`DEFAULT_CACHE_SIZE`]
    pub fn new(inner: I, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap());
        Self {
            inner,
            transitions: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn into_inner(self) -> I {
        self.inner
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f32 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f32 / total as f32
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.transitions.lock() {
            cache.clear();
        }
    }
}

impl<I: SuffixIndex> SuffixIndex for CachedIndex<I> {
    type Position = I::Position;

    fn get_initial(&self) -> I::Position {
        self.inner.get_initial()
    }

    fn transition_and_count(&self, position: I::Position, token: Token) -> I::Position {
        if let Ok(mut cache) = self.transitions.lock() {
            if let Some(&next) = cache.get(&(position, token)) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return next;
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let next = self.inner.transition_and_count(position, token);
        if let Ok(mut cache) = self.transitions.lock() {
            cache.put((position, token), next);
        }
        next
    }

    fn get_length(&self, position: I::Position) -> u64 {
        self.inner.get_length(position)
    }

    fn get_suffix_count(&self, position: I::Position) -> Option<u64> {
        self.inner.get_suffix_count(position)
    }

    fn get_entropy(&self, position: I::Position) -> f64 {
        self.inner.get_entropy(position)
    }

    fn get_next_tokens(&self, position: I::Position, k: i64) -> Vec<NextToken> {
        self.inner.get_next_tokens(position, k)
    }

    fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    fn traverse_arities(&self) -> Vec<usize> {
        self.inner.traverse_arities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Cdawg, TokenStore};

    fn index() -> Cdawg {
        let mut cdawg = Cdawg::build(&TokenStore::from_tokens(vec![1, 2, 3, 1, 2, 4]));
        cdawg.fill_counts();
        cdawg
    }

    #[test]
    fn test_cached_matches_uncached() {
        let cached = CachedIndex::new(index(), 64);
        let plain = index();
        let query = [1, 2, 4, 1, 2, 3, 1, 2, 4];

        let options = Default::default();
        assert_eq!(cached.trace(&query, &options), plain.trace(&query, &options));
        assert_eq!(cached.trace(&query, &options), plain.trace(&query, &options));
        assert!(cached.hits() > 0);
        assert_eq!(cached.hits() + cached.misses(), 2 * query.len() as u64);
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let cached = CachedIndex::new(index(), 1);
        let initial = cached.get_initial();
        cached.transition_and_count(initial, 1);
        cached.transition_and_count(initial, 2);
        cached.transition_and_count(initial, 1);
        assert_eq!(cached.hits(), 0);
        assert_eq!(cached.misses(), 3);

        cached.transition_and_count(initial, 1);
        assert_eq!(cached.hits(), 1);
        assert!(cached.hit_rate() > 0.0);
    }
}
