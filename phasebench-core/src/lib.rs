//! PhaseBench Core - Measurement Runtime
//!
//! This crate provides the phase/metrics measurement core of the
//! PhaseBench harness:
//! - `PhaseMetrics` accumulators with best-of-N attempt merging
//! - An arena-backed tree of named timing phases, nested and thread-safe
//! - Sequential, threaded and producer/consumer execution engines
//! - An explicit benchmark registry plus the reporter interface

mod barrier;
mod benchmark;
mod context;
mod metrics;
mod phase;
mod registry;
mod reporter;
mod settings;
mod system;
mod time;

pub use barrier::Barrier;
pub use benchmark::{
    Benchmark, BenchmarkInstance, BenchmarkPc, BenchmarkThreads, EngineError, LaunchHandler,
    NullLaunchHandler,
};
pub use context::{Context, ContextPc, ContextThreads, Params};
pub use metrics::PhaseMetrics;
pub use phase::{PhaseArena, PhaseId, PhaseScope};
pub use registry::Registry;
pub use reporter::Reporter;
pub use settings::{LatencyParams, Settings, DEFAULT_ATTEMPTS, DEFAULT_DURATION_SECONDS};
pub use system::{cpu_physical_cores, mul_div64, EnvironmentInfo, SystemInfo};
pub use time::{current_thread_id, timestamp};
