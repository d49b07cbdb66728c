use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::DispatcherConfig;
use crate::models::{AnalyticsQuery, ResultRow};
use crate::signature::QuerySignature;

/// Cache entry with timestamp for TTL tracking.
#[derive(Debug, Clone)]
struct CacheEntry {
    rows: Arc<Vec<ResultRow>>,
    inserted_at: Instant,
}

/// Successful results keyed by structural equality of the whole query.
#[derive(Debug)]
pub struct ResultCache {
    results: HashMap<AnalyticsQuery, CacheEntry>,
    ttl: Duration,
    max_size: usize,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_config(&DispatcherConfig::default())
    }

    /// Create a result cache with configuration.
    pub fn with_config(config: &DispatcherConfig) -> Self {
        Self {
            results: HashMap::new(),
            ttl: config.result_cache_ttl(),
            max_size: config.result_cache_max_size,
        }
    }

    pub fn insert(&mut self, query: AnalyticsQuery, rows: Arc<Vec<ResultRow>>) {
        if self.max_size == 0 {
            return;
        }
        self.evict_expired();
        if !self.results.contains_key(&query) && self.results.len() >= self.max_size {
            self.evict_oldest();
        }

        self.results.insert(
            query,
            CacheEntry {
                rows,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, query: &AnalyticsQuery) -> Option<Arc<Vec<ResultRow>>> {
        self.results.get(query).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(entry.rows.clone())
            } else {
                // Expired - treat as cache miss
                None
            }
        })
    }

    pub fn contains(&self, query: &AnalyticsQuery) -> bool {
        self.get(query).is_some()
    }

    /// Remove expired entries from the cache.
    fn evict_expired(&mut self) {
        let ttl = self.ttl;
        self.results
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
    }

    /// Remove the oldest entry from the cache.
    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .results
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(k, _)| k.clone())
        {
            tracing::debug!(
                signature = %QuerySignature::of(&oldest_key),
                "evicting oldest result from cache"
            );
            self.results.remove(&oldest_key);
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}
