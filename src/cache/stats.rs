//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! background refreshes.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
///
/// Counters only grow; `hit_rate` is recomputed on every update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups answered from a live entry
    pub hits: u64,
    /// Lookups that found no live entry
    pub misses: u64,
    /// Entries removed by the size bound
    pub evictions: u64,
    /// Background refreshes started
    pub background_refreshes: u64,
    /// Lookups issued through `get`
    pub total_requests: u64,
    /// Percentage of lookups answered from a live entry (0-100)
    pub hit_rate: f64,
    /// Current number of entries in the store
    pub size: usize,
    /// Rough estimate of the bytes held by the store
    pub memory_usage: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Request ==
    pub fn record_request(&mut self) {
        self.total_requests += 1;
        self.update_hit_rate();
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.update_hit_rate();
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.update_hit_rate();
    }

    // == Record Eviction ==
    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    // == Record Background Refresh ==
    pub fn record_background_refresh(&mut self) {
        self.background_refreshes += 1;
    }

    // == Update Size ==
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub fn set_memory_usage(&mut self, bytes: usize) {
        self.memory_usage = bytes;
    }

    fn update_hit_rate(&mut self) {
        self.hit_rate = if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64 * 100.0
        };
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.background_refreshes, 0);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut stats = CacheStats::new();
        for _ in 0..3 {
            stats.record_request();
            stats.record_hit();
        }
        assert_eq!(stats.hit_rate, 100.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_request();
        stats.record_hit();
        stats.record_request();
        stats.record_miss();
        assert_eq!(stats.hit_rate, 50.0);
    }

    #[test]
    fn test_hit_rate_is_percentage() {
        let mut stats = CacheStats::new();
        stats.record_request();
        stats.record_hit();
        for _ in 0..3 {
            stats.record_request();
            stats.record_miss();
        }
        assert_eq!(stats.hit_rate, 25.0);
    }

    #[test]
    fn test_hit_rate_all_misses() {
        let mut stats = CacheStats::new();
        stats.record_request();
        stats.record_miss();
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_record_evictions() {
        let mut stats = CacheStats::new();
        stats.record_evictions(2);
        stats.record_evictions(0);
        stats.record_evictions(1);
        assert_eq!(stats.evictions, 3);
    }

    #[test]
    fn test_record_background_refresh() {
        let mut stats = CacheStats::new();
        stats.record_background_refresh();
        assert_eq!(stats.background_refreshes, 1);
    }
}
