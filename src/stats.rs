//! Collection statistics (ambient; SPEC_FULL.md §4.9), purely
//! observational — nothing in [`crate::gc`] reads this back.
//!
//! Grounded on the teacher's `stats/mod.rs` (`GcStats`) and
//! `stats/histogram.rs` (`Histogram`), with every `Atomic*`/`Mutex` field
//! replaced by a plain field: this crate's `Vm` is not `Send`/`Sync`, so
//! there is nothing to protect.

use std::time::Duration;

/// A logarithmically-bucketed latency histogram (teacher's
/// `stats::histogram::Histogram`): bucket `i` covers `[2^i, 2^(i+1))`
/// microseconds, so a handful of buckets cover any realistic pause-time
/// range without per-value allocation.
#[derive(Debug, Default, Clone)]
pub struct Histogram {
    buckets: Vec<u64>,
    count: u64,
    sum: u64,
    min: u64,
    max: u64,
}

impl Histogram {
    pub fn new() -> Self {
        Histogram { buckets: vec![0; 64], count: 0, sum: 0, min: u64::MAX, max: 0 }
    }

    fn bucket_for(value: u64) -> usize {
        if value == 0 { 0 } else { (64 - value.leading_zeros()) as usize }
    }

    pub fn record(&mut self, value: u64) {
        let bucket = Self::bucket_for(value).min(self.buckets.len() - 1);
        self.buckets[bucket] += 1;
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum as f64 / self.count as f64 }
    }

    pub fn min(&self) -> u64 {
        if self.count == 0 { 0 } else { self.min }
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// Approximate percentile: the upper bound of the bucket containing
    /// the `p`-th fraction of recorded samples (`p` in `[0.0, 1.0]`).
    pub fn percentile(&self, p: f64) -> u64 {
        if self.count == 0 {
            return 0;
        }
        let target = (self.count as f64 * p).ceil() as u64;
        let mut seen = 0u64;
        for (bucket, &n) in self.buckets.iter().enumerate() {
            seen += n;
            if seen >= target {
                return if bucket == 0 { 0 } else { 1u64 << bucket };
            }
        }
        self.max
    }

    pub fn p50(&self) -> u64 {
        self.percentile(0.50)
    }

    pub fn p95(&self) -> u64 {
        self.percentile(0.95)
    }

    pub fn p99(&self) -> u64 {
        self.percentile(0.99)
    }

    pub fn clear(&mut self) {
        *self = Histogram::new();
    }
}

/// A point-in-time snapshot suitable for logging or a diagnostics dump.
#[derive(Debug, Clone, Copy)]
pub struct GcSummary {
    pub total_cycles: u64,
    pub minor_cycles: u64,
    pub major_cycles: u64,
    pub bytes_reclaimed: u64,
    pub finalizers_run: u64,
    pub pause_p50_micros: u64,
    pub pause_p99_micros: u64,
}

/// Cumulative collector telemetry, owned by [`crate::gc::Gc`].
#[derive(Debug, Default)]
pub struct GcStats {
    total_cycles: u64,
    minor_cycles: u64,
    major_cycles: u64,
    bytes_reclaimed: u64,
    finalizers_run: u64,
    pause_times: Histogram,
}

impl GcStats {
    pub fn new() -> Self {
        GcStats { pause_times: Histogram::new(), ..Default::default() }
    }

    pub fn record_collection(&mut self, full: bool, pause: Duration, bytes_reclaimed: usize) {
        self.total_cycles += 1;
        if full {
            self.major_cycles += 1;
        } else {
            self.minor_cycles += 1;
        }
        self.bytes_reclaimed += bytes_reclaimed as u64;
        self.pause_times.record(pause.as_micros() as u64);
    }

    pub fn record_finalizers_run(&mut self, count: usize) {
        self.finalizers_run += count as u64;
    }

    pub fn pause_times(&self) -> &Histogram {
        &self.pause_times
    }

    pub fn summary(&self) -> GcSummary {
        GcSummary {
            total_cycles: self.total_cycles,
            minor_cycles: self.minor_cycles,
            major_cycles: self.major_cycles,
            bytes_reclaimed: self.bytes_reclaimed,
            finalizers_run: self.finalizers_run,
            pause_p50_micros: self.pause_times.p50(),
            pause_p99_micros: self.pause_times.p99(),
        }
    }

    pub fn reset(&mut self) {
        *self = GcStats::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_tracks_min_max_mean() {
        let mut h = Histogram::new();
        h.record(10);
        h.record(20);
        h.record(30);
        assert_eq!(h.min(), 10);
        assert_eq!(h.max(), 30);
        assert!((h.mean() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn record_collection_splits_minor_and_major_counts() {
        let mut stats = GcStats::new();
        stats.record_collection(false, Duration::from_micros(100), 1024);
        stats.record_collection(true, Duration::from_micros(500), 4096);
        let summary = stats.summary();
        assert_eq!(summary.total_cycles, 2);
        assert_eq!(summary.minor_cycles, 1);
        assert_eq!(summary.major_cycles, 1);
        assert_eq!(summary.bytes_reclaimed, 1024 + 4096);
    }

    #[test]
    fn empty_histogram_percentiles_are_zero() {
        let h = Histogram::new();
        assert_eq!(h.p50(), 0);
        assert_eq!(h.p99(), 0);
    }
}
