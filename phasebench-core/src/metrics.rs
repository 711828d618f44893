//! Phase measurement accumulator
//!
//! `PhaseMetrics` is the value type every phase node carries twice: a
//! `current` accumulator written during the live run, and a `result`
//! accumulator that keeps the best attempt seen so far. Collection windows
//! bracket the measured region; folding a window normalizes its duration
//! by the operations performed inside it before updating the extremes, so
//! `min_time <= avg_time <= max_time` holds per operation.

use hdrhistogram::Histogram;
use std::collections::BTreeMap;

use crate::settings::LatencyParams;
use crate::system::mul_div64;
use crate::time;

const NS_PER_SECOND: i64 = 1_000_000_000;

/// Accumulated measurements of a single phase.
#[derive(Clone)]
pub struct PhaseMetrics {
    min_time: i64,
    max_time: i64,
    total_time: i64,
    total_operations: i64,
    total_items: i64,
    total_bytes: i64,
    iterstamp: i64,
    timestamp: i64,
    threads: u32,
    custom_int: BTreeMap<String, i32>,
    custom_uint: BTreeMap<String, u32>,
    custom_int64: BTreeMap<String, i64>,
    custom_uint64: BTreeMap<String, u64>,
    custom_flt: BTreeMap<String, f32>,
    custom_dbl: BTreeMap<String, f64>,
    custom_str: BTreeMap<String, String>,
    latency: Option<Histogram<u64>>,
}

impl Default for PhaseMetrics {
    fn default() -> Self {
        Self {
            min_time: i64::MAX,
            max_time: i64::MIN,
            total_time: 0,
            total_operations: 0,
            total_items: 0,
            total_bytes: 0,
            iterstamp: 0,
            timestamp: 0,
            threads: 1,
            custom_int: BTreeMap::new(),
            custom_uint: BTreeMap::new(),
            custom_int64: BTreeMap::new(),
            custom_uint64: BTreeMap::new(),
            custom_flt: BTreeMap::new(),
            custom_dbl: BTreeMap::new(),
            custom_str: BTreeMap::new(),
            latency: None,
        }
    }
}

impl PhaseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result accumulators start with the worst possible total time so the
    /// first attempt always wins the merge.
    pub(crate) fn worst() -> Self {
        Self {
            total_time: i64::MAX,
            ..Self::default()
        }
    }

    // ---------------------------------------------------------------------
    // Collection windows
    // ---------------------------------------------------------------------

    /// Opens a collection window: snapshots the clock and the operation
    /// counter so the fold can attribute the window to the operations
    /// performed inside it.
    pub fn start_collecting(&mut self) {
        self.iterstamp = self.total_operations;
        self.timestamp = time::timestamp() as i64;
    }

    /// Folds the open collection window into the accumulator.
    pub fn stop_collecting(&mut self) {
        let operations = self.total_operations - self.iterstamp;
        let duration = time::timestamp() as i64 - self.timestamp;
        if operations > 0 {
            let duration_per_operation = duration / operations;
            if duration_per_operation < self.min_time {
                self.min_time = duration_per_operation;
            }
            if duration_per_operation > self.max_time {
                self.max_time = duration_per_operation;
            }
        }
        self.total_time += duration;
    }

    // ---------------------------------------------------------------------
    // Counters
    // ---------------------------------------------------------------------

    pub fn add_operations(&mut self, operations: i64) {
        self.total_operations += operations;
    }

    pub fn add_items(&mut self, items: i64) {
        self.total_items += items;
    }

    pub fn add_bytes(&mut self, bytes: i64) {
        self.total_bytes += bytes;
    }

    /// Records one latency sample in nanoseconds. No-op unless a latency
    /// histogram was configured; negative samples are dropped.
    pub fn add_latency(&mut self, latency_ns: i64) {
        if latency_ns < 0 {
            return;
        }
        if let Some(histogram) = &mut self.latency {
            histogram.saturating_record(latency_ns as u64);
        }
    }

    pub fn set_threads(&mut self, threads: u32) {
        self.threads = threads;
    }

    pub(crate) fn init_latency(&mut self, params: LatencyParams) {
        self.latency = Histogram::new_with_bounds(
            params.lowest.max(1) as u64,
            params.highest.max(2) as u64,
            params.significant,
        )
        .ok();
    }

    // ---------------------------------------------------------------------
    // Custom values (independent type-tagged maps, last writer wins per key)
    // ---------------------------------------------------------------------

    pub fn set_custom_int(&mut self, name: &str, value: i32) {
        self.custom_int.insert(name.to_string(), value);
    }

    pub fn set_custom_uint(&mut self, name: &str, value: u32) {
        self.custom_uint.insert(name.to_string(), value);
    }

    pub fn set_custom_int64(&mut self, name: &str, value: i64) {
        self.custom_int64.insert(name.to_string(), value);
    }

    pub fn set_custom_uint64(&mut self, name: &str, value: u64) {
        self.custom_uint64.insert(name.to_string(), value);
    }

    pub fn set_custom_flt(&mut self, name: &str, value: f32) {
        self.custom_flt.insert(name.to_string(), value);
    }

    pub fn set_custom_dbl(&mut self, name: &str, value: f64) {
        self.custom_dbl.insert(name.to_string(), value);
    }

    pub fn set_custom_str(&mut self, name: &str, value: &str) {
        self.custom_str.insert(name.to_string(), value.to_string());
    }

    // ---------------------------------------------------------------------
    // Getters
    // ---------------------------------------------------------------------

    /// Per-operation minimum in nanoseconds; zero until an operation was
    /// counted, so the sentinels never leak into reports.
    pub fn min_time(&self) -> i64 {
        if self.total_operations > 0 {
            self.min_time
        } else {
            0
        }
    }

    /// Per-operation maximum in nanoseconds; zero until an operation was
    /// counted.
    pub fn max_time(&self) -> i64 {
        if self.total_operations > 0 {
            self.max_time
        } else {
            0
        }
    }

    /// Average nanoseconds per operation; zero when nothing was counted.
    pub fn avg_time(&self) -> i64 {
        if self.total_operations > 0 {
            self.total_time / self.total_operations
        } else {
            0
        }
    }

    pub fn total_time(&self) -> i64 {
        self.total_time
    }

    pub fn total_operations(&self) -> i64 {
        self.total_operations
    }

    pub fn total_items(&self) -> i64 {
        self.total_items
    }

    pub fn total_bytes(&self) -> i64 {
        self.total_bytes
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn operations_per_second(&self) -> i64 {
        if self.total_time <= 0 {
            return 0;
        }
        mul_div64(self.total_operations, NS_PER_SECOND, self.total_time)
    }

    pub fn items_per_second(&self) -> i64 {
        if self.total_time <= 0 {
            return 0;
        }
        mul_div64(self.total_items, NS_PER_SECOND, self.total_time)
    }

    pub fn bytes_per_second(&self) -> i64 {
        if self.total_time <= 0 {
            return 0;
        }
        mul_div64(self.total_bytes, NS_PER_SECOND, self.total_time)
    }

    pub fn latency_histogram(&self) -> Option<&Histogram<u64>> {
        self.latency.as_ref()
    }

    /// Lowest recorded latency sample in nanoseconds; zero without a
    /// histogram.
    pub fn min_latency(&self) -> i64 {
        self.latency.as_ref().map_or(0, |h| h.min() as i64)
    }

    /// Highest recorded latency sample in nanoseconds; zero without a
    /// histogram.
    pub fn max_latency(&self) -> i64 {
        self.latency.as_ref().map_or(0, |h| h.max() as i64)
    }

    pub fn mean_latency(&self) -> f64 {
        self.latency.as_ref().map_or(0.0, |h| h.mean())
    }

    pub fn stdv_latency(&self) -> f64 {
        self.latency.as_ref().map_or(0.0, |h| h.stdev())
    }

    pub fn custom_int(&self) -> &BTreeMap<String, i32> {
        &self.custom_int
    }

    pub fn custom_uint(&self) -> &BTreeMap<String, u32> {
        &self.custom_uint
    }

    pub fn custom_int64(&self) -> &BTreeMap<String, i64> {
        &self.custom_int64
    }

    pub fn custom_uint64(&self) -> &BTreeMap<String, u64> {
        &self.custom_uint64
    }

    pub fn custom_flt(&self) -> &BTreeMap<String, f32> {
        &self.custom_flt
    }

    pub fn custom_dbl(&self) -> &BTreeMap<String, f64> {
        &self.custom_dbl
    }

    pub fn custom_str(&self) -> &BTreeMap<String, String> {
        &self.custom_str
    }

    // ---------------------------------------------------------------------
    // Merge / reset
    // ---------------------------------------------------------------------

    /// Best-of merge of `other` into `self`.
    ///
    /// Extremes merge elementwise. Custom values union in unconditionally.
    /// The totals (time, operations, items, bytes), the threads count and
    /// the latency histogram travel as one bundle: they are taken from
    /// `other` only when its total time is strictly lower, and in that case
    /// `other`'s custom values overwrite colliding keys as well so the
    /// reported numbers stay consistent with the winning attempt.
    pub fn merge(&mut self, other: &mut PhaseMetrics) {
        if other.min_time < self.min_time {
            self.min_time = other.min_time;
        }
        if other.max_time > self.max_time {
            self.max_time = other.max_time;
        }

        for (name, &value) in &other.custom_int {
            self.custom_int.entry(name.clone()).or_insert(value);
        }
        for (name, &value) in &other.custom_uint {
            self.custom_uint.entry(name.clone()).or_insert(value);
        }
        for (name, &value) in &other.custom_int64 {
            self.custom_int64.entry(name.clone()).or_insert(value);
        }
        for (name, &value) in &other.custom_uint64 {
            self.custom_uint64.entry(name.clone()).or_insert(value);
        }
        for (name, &value) in &other.custom_flt {
            self.custom_flt.entry(name.clone()).or_insert(value);
        }
        for (name, &value) in &other.custom_dbl {
            self.custom_dbl.entry(name.clone()).or_insert(value);
        }
        for (name, value) in &other.custom_str {
            self.custom_str
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }

        if other.total_time < self.total_time {
            self.total_time = other.total_time;
            self.total_operations = other.total_operations;
            self.total_items = other.total_items;
            self.total_bytes = other.total_bytes;
            self.threads = other.threads;
            for (name, &value) in &other.custom_int {
                self.custom_int.insert(name.clone(), value);
            }
            for (name, &value) in &other.custom_uint {
                self.custom_uint.insert(name.clone(), value);
            }
            for (name, &value) in &other.custom_int64 {
                self.custom_int64.insert(name.clone(), value);
            }
            for (name, &value) in &other.custom_uint64 {
                self.custom_uint64.insert(name.clone(), value);
            }
            for (name, &value) in &other.custom_flt {
                self.custom_flt.insert(name.clone(), value);
            }
            for (name, &value) in &other.custom_dbl {
                self.custom_dbl.insert(name.clone(), value);
            }
            for (name, value) in &other.custom_str {
                self.custom_str.insert(name.clone(), value.clone());
            }
            self.latency = other.latency.take();
        }
    }

    /// Discards everything accumulated so far, including any latency
    /// histogram. The engine re-arms the histogram per combination.
    pub fn reset(&mut self) {
        *self = PhaseMetrics::new();
    }
}
