//! Metrics collection for resolver activity.
//!
//! This module provides thread-safe tracking of how searches travel
//! through the two phases and how often the URL cache saves a backend
//! round-trip.

use std::sync::atomic::{AtomicU64, Ordering};

/// Collector for resolver metrics. All counters are monotonic until
/// reset.
#[derive(Debug, Default)]
pub struct ResolveMetrics {
    /// Searches started
    searches: AtomicU64,
    /// Searches answered by a direct bucket hint
    direct_hits: AtomicU64,
    /// Searches that fell back to the global scan
    fallback_scans: AtomicU64,
    /// Listing calls issued against the backend
    listings: AtomicU64,
    /// URL lookups answered from cache
    cache_hits: AtomicU64,
    /// URL lookups that had to ask the backend
    cache_misses: AtomicU64,
    /// URL resolution failures recorded
    failures: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub searches: u64,
    pub direct_hits: u64,
    pub fallback_scans: u64,
    pub listings: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failures: u64,
}

impl ResolveMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_direct_hit(&self) {
        self.direct_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.fallback_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_listing(&self) {
        self.listings.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters at once.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            searches: self.searches.load(Ordering::Relaxed),
            direct_hits: self.direct_hits.load(Ordering::Relaxed),
            fallback_scans: self.fallback_scans.load(Ordering::Relaxed),
            listings: self.listings.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.searches.store(0, Ordering::Relaxed);
        self.direct_hits.store(0, Ordering::Relaxed);
        self.fallback_scans.store(0, Ordering::Relaxed);
        self.listings.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}
