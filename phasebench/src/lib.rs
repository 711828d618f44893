//! # PhaseBench
//!
//! Phase-based micro-benchmarking harness for Rust:
//! - **Nested Phases**: Every benchmark is a tree of named timing phases;
//!   a phase measures any sub-step, not just the whole body
//! - **Best-of-N Attempts**: Each combination runs several attempts and the
//!   report keeps the fastest one
//! - **Parameter Sweeps**: Up to three integer parameters, thread counts
//!   and producer/consumer topologies, launched as a cartesian product
//! - **Three Run Shapes**: Sequential, thread-replicated and
//!   producer/consumer, all sharing one launch skeleton
//! - **Duration Calibration**: Wall-clock targets convert into operation
//!   counts via a short pre-run, so the measured loop never polls a clock
//! - **Reports**: Console, CSV and JSON renderers over one reporter trait
//!
//! ## Quick Start
//!
//! ```ignore
//! use phasebench::prelude::*;
//!
//! #[derive(Default)]
//! struct SortBench {
//!     data: Vec<u64>,
//! }
//!
//! impl Benchmark for SortBench {
//!     fn initialize(&mut self, _context: &mut Context) {
//!         self.data = (0..10_000).rev().collect();
//!     }
//!
//!     fn run(&mut self, context: &mut Context) {
//!         let mut data = self.data.clone();
//!         data.sort_unstable();
//!         context.add_items(data.len() as i64);
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut registry = Registry::new();
//!     registry.add(BenchmarkInstance::sequential(
//!         "sort",
//!         Settings::new().with_operations(1000),
//!         SortBench::default(),
//!     ));
//!     phasebench::run(registry)
//! }
//! ```

// Re-export core types
pub use phasebench_core::{
    Barrier, Benchmark, BenchmarkInstance, BenchmarkPc, BenchmarkThreads, Context, ContextPc,
    ContextThreads, EngineError, EnvironmentInfo, LatencyParams, LaunchHandler, NullLaunchHandler,
    Params, PhaseArena, PhaseId, PhaseMetrics, PhaseScope, Registry, Reporter, Settings,
    SystemInfo, cpu_physical_cores, current_thread_id, timestamp, DEFAULT_ATTEMPTS,
    DEFAULT_DURATION_SECONDS,
};

// Re-export report renderers
pub use phasebench_report::{ConsoleReporter, CsvReporter, JsonReporter, OutputFormat};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Benchmark, BenchmarkInstance, BenchmarkPc, BenchmarkThreads, Context, ContextPc,
        ContextThreads, Registry, Settings,
    };
}

/// Run the PhaseBench CLI harness.
///
/// Call this from your benchmark binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     phasebench::run(registry)
/// }
/// ```
pub use phasebench_cli::run;
