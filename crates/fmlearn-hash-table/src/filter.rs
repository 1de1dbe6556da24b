//! Feature frequency filter.
//!
//! New features are only admitted into the model after they have been seen a
//! minimum number of times. [`FrequencyFilter::count`] answers "had this key
//! already been seen `threshold` times before this call?" and records the
//! occurrence.

use fmlearn_core::{FilterKind, Fid};
use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::sketch::CountMinSketch;

/// Default number of filter shards.
pub const DEFAULT_FILTER_SHARDS: usize = 31;

/// Additive error of the per-shard sketches.
pub const SKETCH_EPSILON: f64 = 0.001;

/// Failure probability of the per-shard sketches.
pub const SKETCH_DELTA: f64 = 0.99;

#[derive(Debug)]
enum Counter {
    Exact(HashMap<Fid, u64>),
    Sketch(CountMinSketch),
}

impl Counter {
    fn new(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Exact => Counter::Exact(HashMap::new()),
            FilterKind::Sketch => Counter::Sketch(CountMinSketch::new(SKETCH_EPSILON, SKETCH_DELTA)),
        }
    }

    fn count(&mut self, key: Fid, threshold: u64) -> bool {
        match self {
            Counter::Exact(counts) => {
                let seen = counts.entry(key).or_insert(0);
                let eligible = *seen >= threshold;
                if !eligible {
                    *seen += 1;
                }
                eligible
            }
            Counter::Sketch(sketch) => {
                if sketch.estimate(key) >= threshold {
                    return true;
                }
                sketch.add(key, 1);
                false
            }
        }
    }
}

/// Sharded occurrence counter used to hold back rare features.
///
/// Counters stop growing once a key is eligible. The exact variant keeps one
/// entry per distinct key until [`forget`](Self::forget) drops it, so callers
/// forget a key once it has been admitted elsewhere. The sketch variant has a
/// fixed size and may over-count colliding keys, which can only admit a
/// feature early, never late.
///
/// # Example
///
/// ```
/// use fmlearn_core::FilterKind;
/// use fmlearn_hash_table::FrequencyFilter;
///
/// let filter = FrequencyFilter::new(FilterKind::Exact);
/// assert!(!filter.count(7, 2));
/// assert!(!filter.count(7, 2));
/// assert!(filter.count(7, 2));
/// assert!(filter.count(7, 2));
/// ```
#[derive(Debug)]
pub struct FrequencyFilter {
    shards: Vec<Mutex<Counter>>,
    kind: FilterKind,
}

impl FrequencyFilter {
    pub fn new(kind: FilterKind) -> Self {
        Self::with_shards(kind, DEFAULT_FILTER_SHARDS)
    }

    /// # Panics
    ///
    /// Panics if `num_shards` is 0.
    pub fn with_shards(kind: FilterKind, num_shards: usize) -> Self {
        assert!(num_shards > 0, "num_shards must be greater than 0");
        Self {
            shards: (0..num_shards).map(|_| Mutex::new(Counter::new(kind))).collect(),
            kind,
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Returns whether `key` had been counted at least `threshold` times
    /// before this call, then counts this occurrence. A threshold of 0
    /// admits every key.
    pub fn count(&self, key: Fid, threshold: u64) -> bool {
        if threshold == 0 {
            return true;
        }
        self.shard(key).lock().count(key, threshold)
    }

    /// Drops the exact counter of `key`, returning whether one existed. A
    /// forgotten key starts counting from zero again. No-op for sketches.
    pub fn forget(&self, key: Fid) -> bool {
        match &mut *self.shard(key).lock() {
            Counter::Exact(counts) => counts.remove(&key).is_some(),
            Counter::Sketch(_) => false,
        }
    }

    /// Number of keys held by exact counters.
    pub fn tracked(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| match &*shard.lock() {
                Counter::Exact(counts) => counts.len(),
                Counter::Sketch(_) => 0,
            })
            .sum()
    }

    fn shard(&self, key: Fid) -> &Mutex<Counter> {
        &self.shards[(key % self.shards.len() as u64) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_filter_threshold_zero_admits_everything() {
        for kind in [FilterKind::Exact, FilterKind::Sketch] {
            let filter = FrequencyFilter::new(kind);
            for key in 0..100u64 {
                assert!(filter.count(key, 0));
            }
        }
    }

    #[test]
    fn test_filter_exact_threshold_semantics() {
        let filter = FrequencyFilter::new(FilterKind::Exact);
        let threshold = 3;
        for _ in 0..threshold {
            assert!(!filter.count(99, threshold));
        }
        for _ in 0..10 {
            assert!(filter.count(99, threshold));
        }
        // Other keys are counted independently.
        assert!(!filter.count(100, threshold));
        assert_eq!(filter.tracked(), 2);
    }

    #[test]
    fn test_filter_forget_releases_exact_counter() {
        let filter = FrequencyFilter::new(FilterKind::Exact);
        assert!(!filter.count(8, 1));
        assert!(filter.count(8, 1));
        assert_eq!(filter.tracked(), 1);

        assert!(filter.forget(8));
        assert!(!filter.forget(8));
        assert_eq!(filter.tracked(), 0);
        assert!(!filter.count(8, 1));

        let sketch = FrequencyFilter::new(FilterKind::Sketch);
        assert!(!sketch.count(8, 1));
        assert!(!sketch.forget(8));
        assert!(sketch.count(8, 1));
        assert_eq!(sketch.tracked(), 0);
    }

    #[test]
    fn test_filter_sketch_threshold_semantics() {
        let filter = FrequencyFilter::new(FilterKind::Sketch);
        assert!(!filter.count(5, 2));
        assert!(!filter.count(5, 2));
        assert!(filter.count(5, 2));
        assert!(filter.count(5, 2));
        assert_eq!(filter.kind(), FilterKind::Sketch);
    }

    #[test]
    fn test_filter_concurrent_counts() {
        let filter = Arc::new(FrequencyFilter::new(FilterKind::Exact));
        let threshold = 1000;
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let filter = Arc::clone(&filter);
                thread::spawn(move || {
                    (0..250)
                        .filter(|_| filter.count(77, threshold))
                        .count()
                })
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 0);
        assert!(filter.count(77, threshold));
    }
}
