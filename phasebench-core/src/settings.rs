//! Benchmark settings
//!
//! Fluent, immutable-after-build configuration consumed once per benchmark
//! definition. Misconfiguration is normalized to safe defaults rather than
//! reported: this is a measurement tool, not a validator.

use crate::context::Params;

/// Default number of independent attempts per combination.
pub const DEFAULT_ATTEMPTS: usize = 5;

/// Default target duration in seconds when a non-positive one is given.
pub const DEFAULT_DURATION_SECONDS: i64 = 5;

/// Latency histogram bounds in nanoseconds plus significant digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyParams {
    pub lowest: i64,
    pub highest: i64,
    pub significant: u8,
}

/// Benchmark run configuration. The default mode is a five second
/// duration run with five attempts.
#[derive(Debug, Clone)]
pub struct Settings {
    attempts: usize,
    infinite: bool,
    operations: i64,
    duration: i64,
    threads: Vec<usize>,
    pc: Vec<(usize, usize)>,
    params: Vec<Params>,
    latency: Option<LatencyParams>,
    latency_auto: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            infinite: false,
            operations: 0,
            duration: DEFAULT_DURATION_SECONDS,
            threads: Vec::new(),
            pc: Vec::new(),
            params: Vec::new(),
            latency: None,
            latency_auto: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of independent attempts; non-positive keeps the default.
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        if attempts > 0 {
            self.attempts = attempts;
        }
        self
    }

    /// Run until canceled. Clears any operations/duration setting.
    pub fn with_infinite(mut self) -> Self {
        self.infinite = true;
        self.operations = 0;
        self.duration = 0;
        self
    }

    /// Run a fixed operation count per combination; clamps to at least 1.
    /// Clears infinite/duration.
    pub fn with_operations(mut self, operations: i64) -> Self {
        self.infinite = false;
        self.duration = 0;
        self.operations = operations.max(1);
        self
    }

    /// Run for roughly the given wall-clock seconds per combination, via
    /// up-front calibration rather than deadline polling. Non-positive
    /// falls back to the default duration. Clears infinite/operations.
    pub fn with_duration(mut self, seconds: i64) -> Self {
        self.infinite = false;
        self.operations = 0;
        self.duration = if seconds > 0 {
            seconds
        } else {
            DEFAULT_DURATION_SECONDS
        };
        self
    }

    /// Adds one thread count to sweep; zero is ignored.
    pub fn with_threads(mut self, count: usize) -> Self {
        if count > 0 {
            self.threads.push(count);
        }
        self
    }

    /// Adds every thread count in `from..=to`.
    pub fn with_threads_range(mut self, from: usize, to: usize) -> Self {
        for count in from.max(1)..=to {
            self.threads.push(count);
        }
        self
    }

    /// Adds one producers/consumers pair to sweep; zeroes are ignored.
    pub fn with_pc(mut self, producers: usize, consumers: usize) -> Self {
        if producers > 0 && consumers > 0 {
            self.pc.push((producers, consumers));
        }
        self
    }

    /// Adds the cartesian product of the two producer/consumer ranges.
    pub fn with_pc_range(
        mut self,
        producers_from: usize,
        producers_to: usize,
        consumers_from: usize,
        consumers_to: usize,
    ) -> Self {
        for producers in producers_from.max(1)..=producers_to {
            for consumers in consumers_from.max(1)..=consumers_to {
                self.pc.push((producers, consumers));
            }
        }
        self
    }

    /// Adds one single-parameter combination; negative is ignored.
    pub fn with_param(mut self, x: i32) -> Self {
        if x >= 0 {
            self.params.push(Params::single(x));
        }
        self
    }

    /// Adds every single-parameter combination in `from..=to`.
    pub fn with_param_range(mut self, from: i32, to: i32) -> Self {
        for x in from.max(0)..=to {
            self.params.push(Params::single(x));
        }
        self
    }

    /// Adds one two-parameter combination; negatives are ignored.
    pub fn with_pair(mut self, x: i32, y: i32) -> Self {
        if x >= 0 && y >= 0 {
            self.params.push(Params::pair(x, y));
        }
        self
    }

    /// Adds the cartesian product of the two parameter ranges.
    pub fn with_pair_range(mut self, x_from: i32, x_to: i32, y_from: i32, y_to: i32) -> Self {
        for x in x_from.max(0)..=x_to {
            for y in y_from.max(0)..=y_to {
                self.params.push(Params::pair(x, y));
            }
        }
        self
    }

    /// Adds one three-parameter combination; negatives are ignored.
    pub fn with_triple(mut self, x: i32, y: i32, z: i32) -> Self {
        if x >= 0 && y >= 0 && z >= 0 {
            self.params.push(Params::triple(x, y, z));
        }
        self
    }

    /// Adds the cartesian product of the three parameter ranges.
    pub fn with_triple_range(
        mut self,
        x_from: i32,
        x_to: i32,
        y_from: i32,
        y_to: i32,
        z_from: i32,
        z_to: i32,
    ) -> Self {
        for x in x_from.max(0)..=x_to {
            for y in y_from.max(0)..=y_to {
                for z in z_from.max(0)..=z_to {
                    self.params.push(Params::triple(x, y, z));
                }
            }
        }
        self
    }

    /// Enables the latency histogram with automatic per-operation
    /// measurement around each `run` call.
    pub fn with_latency(self, lowest: i64, highest: i64, significant: u8) -> Self {
        self.with_latency_params(lowest, highest, significant, true)
    }

    /// Enables the latency histogram; user code records samples itself via
    /// `add_latency`.
    pub fn with_latency_manual(self, lowest: i64, highest: i64, significant: u8) -> Self {
        self.with_latency_params(lowest, highest, significant, false)
    }

    fn with_latency_params(
        mut self,
        lowest: i64,
        highest: i64,
        significant: u8,
        auto: bool,
    ) -> Self {
        let lowest = lowest.max(1);
        self.latency = Some(LatencyParams {
            lowest,
            highest: highest.max(lowest * 2),
            significant: significant.clamp(1, 5),
        });
        self.latency_auto = auto;
        self
    }

    // ---------------------------------------------------------------------
    // Getters
    // ---------------------------------------------------------------------

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn is_infinite(&self) -> bool {
        self.infinite
    }

    pub fn operations(&self) -> i64 {
        self.operations
    }

    /// Target duration in seconds; zero when not in duration mode.
    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn threads(&self) -> &[usize] {
        &self.threads
    }

    pub fn pc(&self) -> &[(usize, usize)] {
        &self.pc
    }

    pub fn params(&self) -> &[Params] {
        &self.params
    }

    pub fn latency_params(&self) -> Option<LatencyParams> {
        self.latency
    }

    pub fn latency_auto(&self) -> bool {
        self.latency_auto
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new();
        assert_eq!(settings.attempts(), DEFAULT_ATTEMPTS);
        assert!(!settings.is_infinite());
        assert_eq!(settings.operations(), 0);
        assert_eq!(settings.duration(), DEFAULT_DURATION_SECONDS);
        assert!(settings.params().is_empty());
        assert!(settings.latency_params().is_none());
    }

    #[test]
    fn test_nonpositive_values_are_normalized() {
        let settings = Settings::new().with_attempts(0).with_operations(-5);
        assert_eq!(settings.attempts(), DEFAULT_ATTEMPTS);
        assert_eq!(settings.operations(), 1);

        let settings = Settings::new().with_duration(0);
        assert_eq!(settings.duration(), DEFAULT_DURATION_SECONDS);

        let settings = Settings::new().with_threads(0).with_pc(0, 4).with_param(-1);
        assert!(settings.threads().is_empty());
        assert!(settings.pc().is_empty());
        assert!(settings.params().is_empty());
    }

    #[test]
    fn test_run_modes_are_mutually_exclusive() {
        let settings = Settings::new().with_operations(100).with_duration(2);
        assert_eq!(settings.operations(), 0);
        assert_eq!(settings.duration(), 2);

        let settings = Settings::new().with_duration(2).with_infinite();
        assert!(settings.is_infinite());
        assert_eq!(settings.duration(), 0);

        let settings = Settings::new().with_infinite().with_operations(100);
        assert!(!settings.is_infinite());
        assert_eq!(settings.operations(), 100);
    }

    #[test]
    fn test_range_expansion() {
        let settings = Settings::new()
            .with_threads_range(1, 3)
            .with_pair_range(0, 1, 0, 1);
        assert_eq!(settings.threads(), &[1, 2, 3]);
        assert_eq!(
            settings.params(),
            &[
                Params::pair(0, 0),
                Params::pair(0, 1),
                Params::pair(1, 0),
                Params::pair(1, 1),
            ]
        );

        let settings = Settings::new().with_pc_range(1, 2, 1, 2);
        assert_eq!(settings.pc(), &[(1, 1), (1, 2), (2, 1), (2, 2)]);
    }

    #[test]
    fn test_latency_bounds_are_clamped() {
        let settings = Settings::new().with_latency(0, 0, 9);
        let params = settings.latency_params().unwrap();
        assert_eq!(params.lowest, 1);
        assert_eq!(params.highest, 2);
        assert_eq!(params.significant, 5);
        assert!(settings.latency_auto());

        let settings = Settings::new().with_latency_manual(1, 1_000_000, 3);
        assert!(!settings.latency_auto());
    }
}
