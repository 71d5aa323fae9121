// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read-through response cache for cloud describe operations.
//!
//! The cache is process-wide and concurrent-safe. Entries carry a
//! per-operation TTL (describe-scaling-groups 60s, describe-instance-types
//! 24h, see [`crate::constants`]); mutations invalidate the affected
//! operation so the next describe observes fresh state.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn fresh(&self) -> bool {
        self.inserted.elapsed() < self.ttl
    }
}

/// TTL cache keyed by `(operation, key)`.
pub struct ResponseCache<V> {
    entries: RwLock<HashMap<(String, String), Entry<V>>>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a fresh entry, if present.
    #[must_use]
    pub fn get(&self, operation: &str, key: &str) -> Option<V> {
        let entries = self.entries.read().expect("cache lock poisoned");
        entries
            .get(&(operation.to_string(), key.to_string()))
            .filter(|entry| entry.fresh())
            .map(|entry| entry.value.clone())
    }

    /// Store a value under `(operation, key)` with the given TTL.
    pub fn put(&self, operation: &str, key: &str, value: V, ttl: Duration) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            (operation.to_string(), key.to_string()),
            Entry {
                value,
                inserted: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop every entry for one operation. Called after mutations so the
    /// next describe re-reads the service.
    pub fn invalidate(&self, operation: &str) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.retain(|(op, _), _| op != operation);
    }

    /// Drop expired entries. Called opportunistically on writes.
    pub fn evict_expired(&self) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.retain(|_, entry| entry.fresh());
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
