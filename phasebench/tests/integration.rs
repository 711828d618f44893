//! Integration tests for PhaseBench
//!
//! These tests verify the end-to-end behavior of the benchmarking system.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use phasebench::prelude::*;
use phasebench::{
    Barrier, NullLaunchHandler, PhaseMetrics, Reporter, ConsoleReporter, JsonReporter,
};

#[derive(Default)]
struct Calls {
    initialized: AtomicUsize,
    cleaned: AtomicUsize,
    runs: AtomicUsize,
}

struct SleepBench {
    calls: Arc<Calls>,
}

impl Benchmark for SleepBench {
    fn initialize(&mut self, _context: &mut Context) {
        self.calls.initialized.fetch_add(1, Ordering::Relaxed);
    }

    fn run(&mut self, _context: &mut Context) {
        self.calls.runs.fetch_add(1, Ordering::Relaxed);
        std::thread::sleep(Duration::from_millis(1));
    }

    fn cleanup(&mut self, _context: &mut Context) {
        self.calls.cleaned.fetch_add(1, Ordering::Relaxed);
    }
}

/// A reporter that records the flattened phase names it sees.
#[derive(Default)]
struct PhaseNames {
    names: Vec<String>,
}

impl Reporter for PhaseNames {
    fn report_phase(&mut self, name: &str, _metrics: &PhaseMetrics) {
        self.names.push(name.to_string());
    }
}

/// Every attempt runs the full operation budget, but the result keeps the
/// best attempt rather than the sum.
#[test]
fn test_sequential_best_of_attempts() {
    let calls = Arc::new(Calls::default());
    let mut registry = Registry::new();
    registry.add(BenchmarkInstance::sequential(
        "sleep",
        Settings::new().with_attempts(3).with_operations(20),
        SleepBench {
            calls: Arc::clone(&calls),
        },
    ));
    registry.launch_all(&mut NullLaunchHandler);

    assert_eq!(calls.initialized.load(Ordering::Relaxed), 3);
    assert_eq!(calls.cleaned.load(Ordering::Relaxed), 3);
    assert_eq!(calls.runs.load(Ordering::Relaxed), 60);

    let benchmark = &registry.benchmarks()[0];
    let root = benchmark.root_phases()[0];
    let result = benchmark.arena().result_metrics(root);
    assert_eq!(result.total_operations(), 20);
    // Sleeps can overshoot but never undershoot
    assert!(result.avg_time() >= 1_000_000);
    assert!(result.min_time() <= result.avg_time());
    assert!(result.avg_time() <= result.max_time());
}

/// Nested phases report under dotted paths rooted at the benchmark name.
#[test]
fn test_phase_names_flatten_to_dotted_paths() {
    struct TwoStage;
    impl Benchmark for TwoStage {
        fn run(&mut self, context: &mut Context) {
            let parse = context.scope_phase("parse");
            let _tokenize = parse.scope_phase("tokenize");
        }
    }

    let mut registry = Registry::new();
    registry.add(BenchmarkInstance::sequential(
        "pipeline",
        Settings::new().with_attempts(1).with_operations(2),
        TwoStage,
    ));
    registry.launch_all(&mut NullLaunchHandler);

    let mut names = PhaseNames::default();
    registry.report(&mut names);
    assert_eq!(
        names.names,
        ["pipeline", "pipeline.parse", "pipeline.parse.tokenize"]
    );
}

/// Same-named phases created by different worker threads collapse into one
/// representative carrying the thread count.
#[test]
fn test_threaded_workers_collapse_into_one_phase() {
    struct Spin;
    impl BenchmarkThreads for Spin {
        fn run_thread(&self, context: &mut ContextThreads) {
            context.add_items(1);
        }
    }

    let mut registry = Registry::new();
    registry.add(BenchmarkInstance::threaded(
        "spin",
        Settings::new()
            .with_attempts(2)
            .with_threads(4)
            .with_operations(25),
        Spin,
    ));
    registry.launch_all(&mut NullLaunchHandler);

    let benchmark = &registry.benchmarks()[0];
    let root = benchmark.root_phases()[0];
    assert_eq!(benchmark.arena().name(root), "spin(threads:4)");

    let children = benchmark.arena().children(root);
    assert_eq!(children.len(), 1);
    let result = benchmark.arena().result_metrics(children[0]);
    assert_eq!(result.threads(), 4);
    assert_eq!(result.total_operations(), 25);
    assert_eq!(result.total_items(), 25);
}

/// Derived statistics guard against division by zero on untouched metrics.
#[test]
fn test_untouched_metrics_report_zero_statistics() {
    let metrics = PhaseMetrics::new();
    assert_eq!(metrics.avg_time(), 0);
    assert_eq!(metrics.operations_per_second(), 0);
    assert_eq!(metrics.items_per_second(), 0);
    assert_eq!(metrics.bytes_per_second(), 0);
}

/// Cancellation reaches the measured loop of an infinite run.
#[test]
fn test_cancellation_stops_infinite_run() {
    struct CancelAfter {
        runs: AtomicUsize,
    }
    impl Benchmark for CancelAfter {
        fn run(&mut self, context: &mut Context) {
            if self.runs.fetch_add(1, Ordering::Relaxed) >= 99 {
                context.cancel();
            }
        }
    }

    let mut registry = Registry::new();
    registry.add(BenchmarkInstance::sequential(
        "endless",
        Settings::new().with_attempts(1).with_infinite(),
        CancelAfter {
            runs: AtomicUsize::new(0),
        },
    ));
    registry.launch_all(&mut NullLaunchHandler);

    let benchmark = &registry.benchmarks()[0];
    assert!(benchmark.launched());
    let result = benchmark
        .arena()
        .result_metrics(benchmark.root_phases()[0]);
    assert_eq!(result.total_operations(), 100);
}

/// Exactly one waiter per generation observes the serial position.
#[test]
fn test_barrier_elects_one_serial_waiter_per_generation() {
    let barrier = Arc::new(Barrier::new(4));
    let elected = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let elected = Arc::clone(&elected);
            std::thread::spawn(move || {
                for _ in 0..3 {
                    if barrier.wait() {
                        elected.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(elected.load(Ordering::Relaxed), 3);
}

/// The console and JSON renderers both carry the launched benchmark.
#[test]
fn test_reports_render_launched_benchmarks() {
    struct Touch;
    impl Benchmark for Touch {
        fn run(&mut self, context: &mut Context) {
            context.add_bytes(4096);
            context.set_custom_str("codec", "raw");
        }
    }

    let mut registry = Registry::new();
    registry.add(BenchmarkInstance::sequential(
        "touch",
        Settings::new().with_attempts(1).with_operations(10),
        Touch,
    ));
    registry.launch_all(&mut NullLaunchHandler);

    let mut console = ConsoleReporter::new();
    registry.report(&mut console);
    let text = console.output();
    assert!(text.contains("Benchmark: touch"));
    assert!(text.contains("Phase: touch"));
    assert!(text.contains("Total operations: 10"));
    assert!(text.contains("codec: raw"));

    let mut json = JsonReporter::new();
    registry.report(&mut json);
    let text = json.output();
    assert!(text.contains("\"name\": \"touch\""));
    assert!(text.contains("\"total_operations\": 10"));
    assert!(text.contains("\"codec\": \"raw\""));
}
