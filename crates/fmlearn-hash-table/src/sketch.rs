//! Count-min sketch over 64-bit keys.

use xxhash_rust::xxh64::xxh64;

/// Approximate frequency counter with bounded memory.
///
/// Each of the `depth` rows hashes the key with `xxh64` seeded by the row
/// index into one of `width` counters. The estimate is the minimum over the
/// rows, so it never under-counts.
#[derive(Debug, Clone)]
pub struct CountMinSketch {
    width: usize,
    depth: usize,
    counters: Vec<u64>,
}

impl CountMinSketch {
    /// Sizes the sketch for additive error `epsilon` (relative to the total
    /// count) with failure probability `delta`: `width = ceil(e / epsilon)`,
    /// `depth = ceil(ln(1 / delta))`, each at least 1.
    pub fn new(epsilon: f64, delta: f64) -> Self {
        let width = (std::f64::consts::E / epsilon).ceil().max(1.0) as usize;
        let depth = (1.0 / delta).ln().ceil().max(1.0) as usize;
        Self::with_dimensions(width, depth)
    }

    pub fn with_dimensions(width: usize, depth: usize) -> Self {
        let width = width.max(1);
        let depth = depth.max(1);
        Self {
            width,
            depth,
            counters: vec![0; width * depth],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    fn slot(&self, row: usize, key: u64) -> usize {
        let h = xxh64(&key.to_le_bytes(), row as u64);
        row * self.width + (h % self.width as u64) as usize
    }

    /// Adds `count` occurrences of `key`.
    pub fn add(&mut self, key: u64, count: u64) {
        for row in 0..self.depth {
            let idx = self.slot(row, key);
            self.counters[idx] = self.counters[idx].saturating_add(count);
        }
    }

    /// Estimated number of occurrences of `key`.
    pub fn estimate(&self, key: u64) -> u64 {
        (0..self.depth)
            .map(|row| self.counters[self.slot(row, key)])
            .min()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sketch_dimensions() {
        let sketch = CountMinSketch::new(0.001, 0.99);
        assert_eq!(sketch.width(), 2719);
        assert_eq!(sketch.depth(), 1);

        let sketch = CountMinSketch::new(0.01, 0.01);
        assert_eq!(sketch.width(), 272);
        assert_eq!(sketch.depth(), 5);
    }

    #[test]
    fn test_sketch_never_undercounts() {
        let mut sketch = CountMinSketch::with_dimensions(16, 3);
        for key in 0..200u64 {
            sketch.add(key, key % 5 + 1);
        }
        for key in 0..200u64 {
            assert!(sketch.estimate(key) >= key % 5 + 1);
        }
    }

    #[test]
    fn test_sketch_exact_when_sparse() {
        let mut sketch = CountMinSketch::new(0.001, 0.01);
        sketch.add(42, 3);
        sketch.add(42, 1);
        assert_eq!(sketch.estimate(42), 4);
    }
}
