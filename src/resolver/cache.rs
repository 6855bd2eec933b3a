//! Memo of candidate-pair distances for one resolution call.
//!
//! Keys are (form index, candidate index) pairs, stored with the smaller pair
//! first so the cache is symmetric. Valid only while form indices map to the
//! same candidate lists, so a cache never outlives the call that built it.

use std::collections::HashMap;

/// A (form index, candidate index) pair.
pub type CandidateKey = (usize, usize);

#[derive(Debug, Default)]
pub struct DistanceCache {
    entries: HashMap<(CandidateKey, CandidateKey), f64>,
    hits: u64,
    misses: u64,
}

impl DistanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: CandidateKey, b: CandidateKey) -> (CandidateKey, CandidateKey) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn get(&self, a: CandidateKey, b: CandidateKey) -> Option<f64> {
        self.entries.get(&Self::key(a, b)).copied()
    }

    pub fn put(&mut self, a: CandidateKey, b: CandidateKey, distance: f64) {
        self.entries.insert(Self::key(a, b), distance);
    }

    /// Cached distance, computing and storing it on a miss.
    pub fn get_or_compute(&mut self, a: CandidateKey, b: CandidateKey, compute: impl FnOnce() -> f64) -> f64 {
        let key = Self::key(a, b);
        if let Some(&d) = self.entries.get(&key) {
            self.hits += 1;
            return d;
        }
        self.misses += 1;
        let d = compute();
        self.entries.insert(key, d);
        d
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_lookup() {
        let mut cache = DistanceCache::new();
        cache.put((3, 1), (0, 2), 0.5);
        assert_eq!(cache.get((0, 2), (3, 1)), Some(0.5));
        assert_eq!(cache.get((3, 1), (0, 2)), Some(0.5));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_or_compute_counts() {
        let mut cache = DistanceCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let d = cache.get_or_compute((1, 0), (2, 1), || {
                calls += 1;
                1.25
            });
            assert_eq!(d, 1.25);
        }
        let d = cache.get_or_compute((2, 1), (1, 0), || unreachable!());
        assert_eq!(d, 1.25);
        assert_eq!(calls, 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 3);
    }

    #[test]
    fn test_empty() {
        let cache = DistanceCache::new();
        assert!(cache.is_empty());
        assert!(cache.get((0, 0), (0, 0)).is_none());
    }
}
