//! Benchmark registry
//!
//! Explicitly constructed and explicitly passed around: the driver owns
//! the registry, adds benchmark definitions, launches a name-filtered
//! subset, then walks the results through a [`Reporter`]. No process-wide
//! state is involved, so tests can run independent registries side by
//! side.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::benchmark::{BenchmarkInstance, LaunchHandler};
use crate::phase::{PhaseArena, PhaseId};
use crate::reporter::Reporter;
use crate::system::{EnvironmentInfo, SystemInfo};

#[derive(Default)]
pub struct Registry {
    benchmarks: Vec<BenchmarkInstance>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, benchmark: BenchmarkInstance) -> &mut Self {
        self.benchmarks.push(benchmark);
        self
    }

    pub fn benchmarks(&self) -> &[BenchmarkInstance] {
        &self.benchmarks
    }

    pub fn launch_all(&mut self, handler: &mut dyn LaunchHandler) {
        self.launch_filtered(|_| true, handler);
    }

    /// Launches every benchmark whose name the filter accepts. A failing
    /// or panicking benchmark aborts only itself; the rest of the queue
    /// still runs, and whatever it measured before failing stays
    /// reportable.
    pub fn launch_filtered(
        &mut self,
        filter: impl Fn(&str) -> bool,
        handler: &mut dyn LaunchHandler,
    ) {
        let selected: Vec<usize> = self
            .benchmarks
            .iter()
            .enumerate()
            .filter(|(_, benchmark)| filter(benchmark.name()))
            .map(|(index, _)| index)
            .collect();
        let total: usize = selected
            .iter()
            .map(|&index| self.benchmarks[index].count_launches())
            .sum();

        let mut current = 0;
        for &index in &selected {
            let benchmark = &mut self.benchmarks[index];
            let name = benchmark.name().to_string();
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                benchmark.launch(&mut current, total, handler)
            }));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(benchmark = %name, %error, "benchmark launch failed");
                }
                Err(payload) => {
                    tracing::error!(
                        benchmark = %name,
                        "benchmark panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
    }

    /// Walks every launched benchmark through the reporter in the fixed
    /// call order. Phase names are already flattened to dotted paths.
    pub fn report(&self, reporter: &mut dyn Reporter) {
        reporter.report_header();
        reporter.report_system(&SystemInfo::capture());
        reporter.report_environment(&EnvironmentInfo::capture());
        reporter.report_benchmarks_header();

        for benchmark in &self.benchmarks {
            if !benchmark.launched() {
                continue;
            }
            reporter.report_benchmark_header();
            reporter.report_benchmark(benchmark.name(), benchmark.settings());
            reporter.report_phases_header();
            for &root in benchmark.root_phases() {
                report_phase(reporter, benchmark.arena(), root);
            }
            reporter.report_phases_footer();
            reporter.report_benchmark_footer();
        }

        reporter.report_benchmarks_footer();
        reporter.report_footer();
    }
}

fn report_phase(reporter: &mut dyn Reporter, arena: &PhaseArena, id: PhaseId) {
    reporter.report_phase_header();
    let metrics = arena.result_metrics(id);
    reporter.report_phase(&arena.name(id), &metrics);
    reporter.report_phase_footer();
    for child in arena.children(id) {
        report_phase(reporter, arena, child);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
