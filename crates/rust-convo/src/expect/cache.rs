//! Compiled pattern cache.
//!
//! Conversations often expect the same text more than once (greetings,
//! fallbacks, menus). The cache keeps compiled regexes keyed by their
//! source so repeated steps skip recompilation. Each run owns its own
//! cache; nothing is shared between concurrent runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use regex::Regex;

/// Default maximum cache size.
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// A cache for compiled expectation regexes.
///
/// The oldest entry is evicted when the cache is full.
#[derive(Debug)]
pub struct PatternCache {
    cache: RwLock<Entries>,
    max_size: usize,
    /// Total cache hits (for statistics).
    total_hits: AtomicUsize,
    /// Total cache misses (for statistics).
    total_misses: AtomicUsize,
}

#[derive(Debug, Default)]
struct Entries {
    regexes: HashMap<String, Arc<Regex>>,
    order: Vec<String>,
}

impl PatternCache {
    /// Create a new cache with the specified maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            cache: RwLock::new(Entries {
                regexes: HashMap::with_capacity(max_size),
                order: Vec::with_capacity(max_size),
            }),
            max_size: max_size.max(1),
            total_hits: AtomicUsize::new(0),
            total_misses: AtomicUsize::new(0),
        }
    }

    /// Get or compile a regex source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not a valid regex. Failures are
    /// not cached.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Regex>, regex::Error> {
        // The cache is only an optimization, so lock poisoning is recovered from.
        {
            let cache = self
                .cache
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(regex) = cache.regexes.get(source) {
                self.total_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(regex));
            }
        }

        self.total_misses.fetch_add(1, Ordering::Relaxed);
        let regex = Arc::new(Regex::new(source)?);

        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(existing) = cache.regexes.get(source) {
            return Ok(Arc::clone(existing));
        }

        if cache.regexes.len() >= self.max_size && !cache.order.is_empty() {
            let oldest = cache.order.remove(0);
            cache.regexes.remove(&oldest);
        }

        cache.regexes.insert(source.to_string(), Arc::clone(&regex));
        cache.order.push(source.to_string());

        Ok(regex)
    }

    /// Check if a source is cached.
    #[must_use]
    pub fn contains(&self, source: &str) -> bool {
        let cache = self
            .cache
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.regexes.contains_key(source)
    }

    /// Get the current number of cached regexes.
    #[must_use]
    pub fn len(&self) -> usize {
        let cache = self
            .cache
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.regexes.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
            total_hits: self.total_hits.load(Ordering::Relaxed),
            total_misses: self.total_misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

/// Statistics about a pattern cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached regexes.
    pub size: usize,
    /// Maximum cache size.
    pub max_size: usize,
    /// Total cache hits.
    pub total_hits: usize,
    /// Total cache misses.
    pub total_misses: usize,
}

impl CacheStats {
    /// Get the cache hit rate as a ratio (0.0 to 1.0).
    ///
    /// Returns 1.0 if no accesses have been made.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_hits + self.total_misses;
        if total == 0 {
            1.0
        } else {
            self.total_hits as f64 / total as f64
        }
    }
}
