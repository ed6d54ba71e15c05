//! Parse cache keyed by raw expression text
//!
//! Entries are idempotent to recompute, so either implementation can
//! drop anything at any time without affecting results.

use crate::ParsedExpression;
use dashmap::DashMap;
use formkit_common::CachePolicy;
use moka::sync::Cache;
use std::sync::Arc;

/// Storage for parsed expressions
pub trait ParseCache: Send + Sync {
    /// Cached parse for `raw`
    fn get(&self, raw: &str) -> Option<Arc<ParsedExpression>>;

    /// Remember a parse
    fn insert(&self, raw: &str, parsed: Arc<ParsedExpression>);

    /// Drop everything
    fn clear(&self);

    /// Number of entries
    fn len(&self) -> u64;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grows without bound; schema vocabularies are small
#[derive(Default)]
pub struct UnboundedParseCache {
    entries: DashMap<String, Arc<ParsedExpression>>,
}

impl UnboundedParseCache {
    /// Create empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParseCache for UnboundedParseCache {
    fn get(&self, raw: &str) -> Option<Arc<ParsedExpression>> {
        self.entries.get(raw).map(|entry| Arc::clone(entry.value()))
    }

    fn insert(&self, raw: &str, parsed: Arc<ParsedExpression>) {
        self.entries.insert(raw.to_string(), parsed);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> u64 {
        self.entries.len() as u64
    }
}

/// Capacity-bounded cache with LRU-style eviction
pub struct BoundedParseCache {
    cache: Cache<String, Arc<ParsedExpression>>,
    capacity: u64,
}

impl BoundedParseCache {
    /// Create cache with capacity
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity).build();
        Self { cache, capacity }
    }

    /// Configured capacity
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

impl ParseCache for BoundedParseCache {
    fn get(&self, raw: &str) -> Option<Arc<ParsedExpression>> {
        self.cache.get(raw)
    }

    fn insert(&self, raw: &str, parsed: Arc<ParsedExpression>) {
        self.cache.insert(raw.to_string(), parsed);
    }

    fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    fn len(&self) -> u64 {
        // entry_count lags until maintenance runs
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

/// Build the cache an [`EngineConfig`](formkit_common::EngineConfig) asks for
pub fn from_policy(policy: &CachePolicy) -> Arc<dyn ParseCache> {
    match policy {
        CachePolicy::Unbounded => Arc::new(UnboundedParseCache::new()),
        CachePolicy::Bounded { capacity } => Arc::new(BoundedParseCache::new(*capacity)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExpressionEvaluator;

    fn parsed(raw: &str) -> Arc<ParsedExpression> {
        Arc::new(ExpressionEvaluator::new().parse_expression(raw).as_ref().clone())
    }

    #[test]
    fn test_unbounded_roundtrip() {
        let cache = UnboundedParseCache::new();
        assert!(cache.is_empty());
        cache.insert("@A + 1", parsed("@A + 1"));
        assert_eq!(cache.get("@A + 1").unwrap().variables, vec!["A".to_string()]);
        assert!(cache.get("@B").is_none());
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_bounded_respects_capacity() {
        let cache = BoundedParseCache::new(4);
        for i in 0..64 {
            let raw = format!("@F{} + {}", i, i);
            cache.insert(&raw, parsed(&raw));
        }
        assert!(cache.len() <= 4);
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn test_from_policy() {
        let cache = from_policy(&CachePolicy::Bounded { capacity: 8 });
        cache.insert("1", parsed("1"));
        assert_eq!(cache.len(), 1);
    }
}
