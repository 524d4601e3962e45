//! Content-addressed calculation cache.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::engine::CalculationBreakdown;

/// Cache seam injected into the pipeline. Keys are fingerprints;
/// concurrent writers for the same key produce byte-identical values, so
/// last-writer-wins is acceptable.
pub trait CalculationCache: Send + Sync {
    fn get(&self, fingerprint: &str) -> Option<CalculationBreakdown>;
    /// Store a result, optionally tagged with the return id for
    /// invalidation.
    fn put(&self, fingerprint: &str, return_id: Option<&str>, breakdown: &CalculationBreakdown);
    /// Drop all entries tagged with a return id. Returns whether
    /// anything was removed.
    fn invalidate(&self, return_id: &str) -> bool;
    fn clear(&self);
}

#[derive(Default)]
struct MemoryCacheInner {
    entries: HashMap<String, CalculationBreakdown>,
    /// return_id -> fingerprints, for invalidation.
    by_return: HashMap<String, Vec<String>>,
}

/// In-memory cache.
#[derive(Default)]
pub struct MemoryCache {
    inner: Mutex<MemoryCacheInner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CalculationCache for MemoryCache {
    fn get(&self, fingerprint: &str) -> Option<CalculationBreakdown> {
        self.inner
            .lock()
            .expect("cache lock poisoned")
            .entries
            .get(fingerprint)
            .cloned()
    }

    fn put(&self, fingerprint: &str, return_id: Option<&str>, breakdown: &CalculationBreakdown) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner
            .entries
            .insert(fingerprint.to_string(), breakdown.clone());
        if let Some(return_id) = return_id {
            inner
                .by_return
                .entry(return_id.to_string())
                .or_default()
                .push(fingerprint.to_string());
        }
    }

    fn invalidate(&self, return_id: &str) -> bool {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        match inner.by_return.remove(return_id) {
            Some(fingerprints) => {
                for fp in fingerprints {
                    inner.entries.remove(&fp);
                }
                true
            }
            None => false,
        }
    }

    fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.clear();
        inner.by_return.clear();
    }
}
