//! Benchmark execution engine
//!
//! One engine drives three run shapes, held as a closed set of variants:
//! `Sequential` runs the workload on the calling thread, `Threaded`
//! replicates it across N worker threads, `ProducerConsumer` splits the
//! workers into two roles with independent stop flags. All variants share
//! the same launch skeleton: attempts × sweep combinations, with
//! initialize/run/cleanup callbacks, per-attempt best-of folding, and a
//! final cross-thread collapse and name flattening over the root forest.
//!
//! Duration mode does not poll a deadline inside the measured loop; a
//! ~1 second calibration pre-run converts the measured rate into an
//! equivalent operation count up front (per worker thread in the parallel
//! variants, since threads can achieve different rates).

use std::sync::{Arc, Condvar, Mutex};
use thiserror::Error;

use crate::barrier::Barrier;
use crate::context::{Context, ContextPc, ContextThreads, Params};
use crate::phase::{PhaseArena, PhaseId};
use crate::settings::Settings;
use crate::system;
use crate::time;

const CALIBRATION_NS: u64 = 1_000_000_000;
const NS_PER_SECOND: i64 = 1_000_000_000;

/// Errors raised while launching a benchmark. A failed launch aborts only
/// the current benchmark definition, never the whole queue.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn worker thread for benchmark '{benchmark}'")]
    ThreadSpawn {
        benchmark: String,
        #[source]
        source: std::io::Error,
    },
}

/// Sequential benchmark callbacks.
pub trait Benchmark {
    fn initialize(&mut self, _context: &mut Context) {}
    fn run(&mut self, context: &mut Context);
    fn cleanup(&mut self, _context: &mut Context) {}
}

/// Thread-replicated benchmark callbacks. `initialize`/`cleanup` run once
/// per combination on the launching thread; the `*_thread` trio runs on
/// every worker.
pub trait BenchmarkThreads: Send + Sync {
    fn initialize(&mut self, _context: &mut ContextThreads) {}
    fn initialize_thread(&self, _context: &mut ContextThreads) {}
    fn run_thread(&self, context: &mut ContextThreads);
    fn cleanup_thread(&self, _context: &mut ContextThreads) {}
    fn cleanup(&mut self, _context: &mut ContextThreads) {}
}

/// Producer/consumer benchmark callbacks. Producers exhaust the operation
/// budget; consumers run until user code calls `stop_consume` (or the run
/// is canceled), typically once producers have signaled `stop_produce`.
pub trait BenchmarkPc: Send + Sync {
    fn initialize(&mut self, _context: &mut ContextPc) {}
    fn initialize_producer(&self, _context: &mut ContextPc) {}
    fn run_producer(&self, context: &mut ContextPc);
    fn cleanup_producer(&self, _context: &mut ContextPc) {}
    fn initialize_consumer(&self, _context: &mut ContextPc) {}
    fn run_consumer(&self, context: &mut ContextPc);
    fn cleanup_consumer(&self, _context: &mut ContextPc) {}
    fn cleanup(&mut self, _context: &mut ContextPc) {}
}

/// Progress notifications around every launched combination.
pub trait LaunchHandler {
    fn on_launching(
        &mut self,
        _current: usize,
        _total: usize,
        _benchmark: &str,
        _description: &str,
        _attempt: usize,
    ) {
    }

    fn on_launched(
        &mut self,
        _current: usize,
        _total: usize,
        _benchmark: &str,
        _description: &str,
        _attempt: usize,
    ) {
    }
}

/// Handler that ignores all notifications.
pub struct NullLaunchHandler;

impl LaunchHandler for NullLaunchHandler {}

enum BenchmarkKind {
    Sequential(Box<dyn Benchmark>),
    Threaded(Box<dyn BenchmarkThreads>),
    ProducerConsumer(Box<dyn BenchmarkPc>),
}

/// A registered benchmark definition together with its phase forest.
pub struct BenchmarkInstance {
    name: String,
    settings: Settings,
    kind: BenchmarkKind,
    arena: Arc<PhaseArena>,
    roots: Vec<PhaseId>,
    launched: bool,
}

impl BenchmarkInstance {
    pub fn sequential(
        name: impl Into<String>,
        settings: Settings,
        benchmark: impl Benchmark + 'static,
    ) -> Self {
        Self::with_kind(name, settings, BenchmarkKind::Sequential(Box::new(benchmark)))
    }

    pub fn threaded(
        name: impl Into<String>,
        settings: Settings,
        benchmark: impl BenchmarkThreads + 'static,
    ) -> Self {
        Self::with_kind(name, settings, BenchmarkKind::Threaded(Box::new(benchmark)))
    }

    pub fn producer_consumer(
        name: impl Into<String>,
        settings: Settings,
        benchmark: impl BenchmarkPc + 'static,
    ) -> Self {
        Self::with_kind(
            name,
            settings,
            BenchmarkKind::ProducerConsumer(Box::new(benchmark)),
        )
    }

    fn with_kind(name: impl Into<String>, settings: Settings, kind: BenchmarkKind) -> Self {
        Self {
            name: name.into(),
            settings,
            kind,
            arena: Arc::new(PhaseArena::new()),
            roots: Vec::new(),
            launched: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn launched(&self) -> bool {
        self.launched
    }

    pub fn arena(&self) -> &PhaseArena {
        &self.arena
    }

    /// Root phases in first-seen order, one per launched combination name.
    pub fn root_phases(&self) -> &[PhaseId] {
        &self.roots
    }

    /// Number of combinations one launch will run, for progress totals.
    pub fn count_launches(&self) -> usize {
        let attempts = self.settings.attempts();
        let params = self.settings.params().len().max(1);
        match self.kind {
            BenchmarkKind::Sequential(_) => attempts * params,
            BenchmarkKind::Threaded(_) => attempts * self.settings.threads().len().max(1) * params,
            BenchmarkKind::ProducerConsumer(_) => {
                attempts * self.settings.pc().len().max(1) * params
            }
        }
    }

    /// Runs every attempt × combination of this benchmark, then collapses
    /// thread duplicates and flattens phase names. `current` advances by
    /// one per launched combination towards `total`.
    pub fn launch(
        &mut self,
        current: &mut usize,
        total: usize,
        handler: &mut dyn LaunchHandler,
    ) -> Result<(), EngineError> {
        tracing::debug!(benchmark = %self.name, "launching");
        let result = match &mut self.kind {
            BenchmarkKind::Sequential(bench) => launch_sequential(
                &self.name,
                &self.settings,
                &self.arena,
                &mut self.roots,
                bench.as_mut(),
                current,
                total,
                handler,
            ),
            BenchmarkKind::Threaded(bench) => launch_threaded(
                &self.name,
                &self.settings,
                &self.arena,
                &mut self.roots,
                bench.as_mut(),
                current,
                total,
                handler,
            ),
            BenchmarkKind::ProducerConsumer(bench) => launch_pc(
                &self.name,
                &self.settings,
                &self.arena,
                &mut self.roots,
                bench.as_mut(),
                current,
                total,
                handler,
            ),
        };

        // Consolidate whatever was measured, even after a failed launch,
        // so prior combinations stay reportable.
        self.arena.update_threads(&self.roots);
        self.arena.update_names(&self.roots);
        self.launched = true;
        result
    }
}

// -------------------------------------------------------------------------
// Run plan and calibration
// -------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct RunPlan {
    infinite: bool,
    operations: i64,
}

impl RunPlan {
    /// The configured infinite/operations mode, used directly outside
    /// duration mode and as the recovery path when calibration degenerates.
    fn fallback(settings: &Settings) -> Self {
        Self {
            infinite: settings.is_infinite(),
            operations: settings.operations().max(1),
        }
    }
}

/// ~1 second pre-run measuring the achievable rate, converted into the
/// operation count equivalent to the target duration. `None` when the
/// measured timespan is non-positive (degenerate clock).
fn calibrate_operations(duration_seconds: i64, mut run_once: impl FnMut()) -> Option<i64> {
    let started = time::timestamp();
    let mut operations: i64 = 0;
    while time::timestamp() - started < CALIBRATION_NS {
        run_once();
        operations += 1;
    }
    let elapsed = (time::timestamp() - started) as i64;
    if elapsed <= 0 {
        return None;
    }
    Some(
        system::mul_div64(
            operations,
            duration_seconds.saturating_mul(NS_PER_SECOND),
            elapsed,
        )
        .max(1),
    )
}

/// Discards everything the calibration pre-run accumulated, on the phase
/// itself and on any sub-phase user code opened during it, so only the
/// measured loop contributes to the reported totals.
fn discard_calibration(arena: &PhaseArena, id: PhaseId) {
    arena.with_current(id, |metrics| metrics.reset());
    for child in arena.children(id) {
        discard_calibration(arena, child);
    }
}

fn find_or_create_root(arena: &PhaseArena, roots: &mut Vec<PhaseId>, name: &str) -> PhaseId {
    if let Some(&root) = roots.iter().find(|&&root| arena.name(root) == name) {
        return root;
    }
    let root = arena.create_root(name);
    roots.push(root);
    root
}

fn params_list(settings: &Settings) -> Vec<Params> {
    if settings.params().is_empty() {
        vec![Params::none()]
    } else {
        settings.params().to_vec()
    }
}

// -------------------------------------------------------------------------
// Start gate
// -------------------------------------------------------------------------

/// Holds spawned workers until the launcher knows whether every worker
/// thread came up. Workers released with `false` exit without touching the
/// barrier, so a partial spawn cannot deadlock the combination.
struct StartGate {
    state: Mutex<Option<bool>>,
    cond: Condvar,
}

impl StartGate {
    fn new() -> Self {
        Self {
            state: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    fn open(&self) {
        *self.state.lock().unwrap() = Some(true);
        self.cond.notify_all();
    }

    fn abort(&self) {
        *self.state.lock().unwrap() = Some(false);
        self.cond.notify_all();
    }

    fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        while state.is_none() {
            state = self.cond.wait(state).unwrap();
        }
        state.unwrap_or(false)
    }
}

// -------------------------------------------------------------------------
// Sequential launch
// -------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn launch_sequential(
    name: &str,
    settings: &Settings,
    arena: &Arc<PhaseArena>,
    roots: &mut Vec<PhaseId>,
    bench: &mut dyn Benchmark,
    current: &mut usize,
    total: usize,
    handler: &mut dyn LaunchHandler,
) -> Result<(), EngineError> {
    let params_list = params_list(settings);

    for attempt in 1..=settings.attempts() {
        for &params in &params_list {
            let root = find_or_create_root(arena, roots, &format!("{name}{}", params.suffix()));
            let mut context = Context::new(params, Arc::clone(arena), root);
            let description = context.description();

            *current += 1;
            handler.on_launching(*current, total, name, &description, attempt);
            bench.initialize(&mut context);

            let plan = if settings.duration() > 0 {
                let calibrated =
                    calibrate_operations(settings.duration(), || bench.run(&mut context));
                discard_calibration(arena, root);
                match calibrated {
                    Some(operations) => RunPlan {
                        infinite: false,
                        operations,
                    },
                    None => RunPlan::fallback(settings),
                }
            } else {
                RunPlan::fallback(settings)
            };

            if let Some(latency) = settings.latency_params() {
                arena.with_current(root, |metrics| metrics.init_latency(latency));
            }
            let latency_auto = settings.latency_auto() && settings.latency_params().is_some();

            let mut remaining = plan.operations;
            arena.start_collecting(root);
            while !context.canceled() && (plan.infinite || remaining > 0) {
                context.add_operations(1);
                if latency_auto {
                    let begun = time::timestamp();
                    bench.run(&mut context);
                    context.add_latency((time::timestamp() - begun) as i64);
                } else {
                    bench.run(&mut context);
                }
                remaining -= 1;
            }
            arena.stop_phase(root);

            bench.cleanup(&mut context);
            handler.on_launched(*current, total, name, &description, attempt);
        }

        // Fold this attempt into the best-of results
        arena.update_metrics(roots);
    }

    Ok(())
}

// -------------------------------------------------------------------------
// Threaded launch
// -------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn launch_threaded(
    name: &str,
    settings: &Settings,
    arena: &Arc<PhaseArena>,
    roots: &mut Vec<PhaseId>,
    bench: &mut dyn BenchmarkThreads,
    current: &mut usize,
    total: usize,
    handler: &mut dyn LaunchHandler,
) -> Result<(), EngineError> {
    let params_list = params_list(settings);
    let threads_list: Vec<usize> = if settings.threads().is_empty() {
        vec![system::cpu_physical_cores()]
    } else {
        settings.threads().to_vec()
    };

    for attempt in 1..=settings.attempts() {
        for &threads in &threads_list {
            for &params in &params_list {
                let description = ContextThreads::describe(threads, params);
                let root = find_or_create_root(arena, roots, &format!("{name}{description}"));
                let mut context = ContextThreads::new(threads, params, Arc::clone(arena), root);

                *current += 1;
                handler.on_launching(*current, total, name, &description, attempt);
                bench.initialize(&mut context);

                let barrier = Barrier::new(threads);
                let gate = StartGate::new();

                arena.start_collecting(root);
                arena.with_current(root, |metrics| metrics.add_operations(1));

                let bench_shared: &dyn BenchmarkThreads = &*bench;
                let spawn_result: Result<(), EngineError> = std::thread::scope(|scope| {
                    for index in 0..threads {
                        let mut thread_context = context.clone();
                        let barrier = &barrier;
                        let gate = &gate;
                        let spawned = std::thread::Builder::new()
                            .name(format!("{name}-thread-{index}"))
                            .spawn_scoped(scope, move || {
                                if !gate.wait() {
                                    return;
                                }
                                run_thread_worker(
                                    bench_shared,
                                    &mut thread_context,
                                    settings,
                                    threads,
                                    barrier,
                                );
                            });
                        if let Err(source) = spawned {
                            gate.abort();
                            context.cancel();
                            return Err(EngineError::ThreadSpawn {
                                benchmark: name.to_string(),
                                source,
                            });
                        }
                    }
                    gate.open();
                    Ok(())
                });

                arena.stop_phase(root);
                bench.cleanup(&mut context);
                handler.on_launched(*current, total, name, &description, attempt);
                arena.fold_current(root);
                spawn_result?;
            }
        }
    }

    Ok(())
}

fn run_thread_worker(
    bench: &dyn BenchmarkThreads,
    context: &mut ContextThreads,
    settings: &Settings,
    threads: usize,
    barrier: &Barrier,
) {
    let arena = Arc::clone(context.arena());
    let phase = context.start_phase_thread_safe("thread");
    context.set_current(phase);
    // The thread-safe start pre-counted one operation; the measured loop
    // counts its own
    context.add_operations(-1);

    bench.initialize_thread(context);

    let plan = if settings.duration() > 0 {
        let calibrated = calibrate_operations(settings.duration(), || bench.run_thread(context));
        discard_calibration(&arena, phase);
        match calibrated {
            Some(operations) => RunPlan {
                infinite: false,
                operations,
            },
            None => RunPlan::fallback(settings),
        }
    } else {
        RunPlan::fallback(settings)
    };

    arena.with_current(phase, |metrics| metrics.set_threads(threads as u32));
    if let Some(latency) = settings.latency_params() {
        arena.with_current(phase, |metrics| metrics.init_latency(latency));
    }
    let latency_auto = settings.latency_auto() && settings.latency_params().is_some();

    let mut remaining = plan.operations;
    barrier.wait();
    arena.start_collecting(phase);
    while !context.canceled() && (plan.infinite || remaining > 0) {
        context.add_operations(1);
        if latency_auto {
            let begun = time::timestamp();
            bench.run_thread(context);
            context.add_latency((time::timestamp() - begun) as i64);
        } else {
            bench.run_thread(context);
        }
        remaining -= 1;
    }
    arena.stop_phase(phase);

    bench.cleanup_thread(context);
    arena.update_metrics_subtree(phase);
}

// -------------------------------------------------------------------------
// Producer/consumer launch
// -------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn launch_pc(
    name: &str,
    settings: &Settings,
    arena: &Arc<PhaseArena>,
    roots: &mut Vec<PhaseId>,
    bench: &mut dyn BenchmarkPc,
    current: &mut usize,
    total: usize,
    handler: &mut dyn LaunchHandler,
) -> Result<(), EngineError> {
    let params_list = params_list(settings);
    let pc_list: Vec<(usize, usize)> = if settings.pc().is_empty() {
        vec![(1, 1)]
    } else {
        settings.pc().to_vec()
    };

    for attempt in 1..=settings.attempts() {
        for &(producers, consumers) in &pc_list {
            for &params in &params_list {
                let description = ContextPc::describe(producers, consumers, params);
                let root = find_or_create_root(arena, roots, &format!("{name}{description}"));
                let mut context =
                    ContextPc::new(producers, consumers, params, Arc::clone(arena), root);

                *current += 1;
                handler.on_launching(*current, total, name, &description, attempt);
                bench.initialize(&mut context);

                let barrier = Barrier::new(producers + consumers);
                let gate = StartGate::new();

                arena.start_collecting(root);
                arena.with_current(root, |metrics| metrics.add_operations(1));

                let bench_shared: &dyn BenchmarkPc = &*bench;
                let spawn_result: Result<(), EngineError> = std::thread::scope(|scope| {
                    for index in 0..producers {
                        let mut producer_context = context.clone();
                        let barrier = &barrier;
                        let gate = &gate;
                        let spawned = std::thread::Builder::new()
                            .name(format!("{name}-producer-{index}"))
                            .spawn_scoped(scope, move || {
                                if !gate.wait() {
                                    return;
                                }
                                run_producer_worker(
                                    bench_shared,
                                    &mut producer_context,
                                    settings,
                                    producers,
                                    barrier,
                                );
                            });
                        if let Err(source) = spawned {
                            gate.abort();
                            context.cancel();
                            return Err(EngineError::ThreadSpawn {
                                benchmark: name.to_string(),
                                source,
                            });
                        }
                    }
                    for index in 0..consumers {
                        let mut consumer_context = context.clone();
                        let barrier = &barrier;
                        let gate = &gate;
                        let spawned = std::thread::Builder::new()
                            .name(format!("{name}-consumer-{index}"))
                            .spawn_scoped(scope, move || {
                                if !gate.wait() {
                                    return;
                                }
                                run_consumer_worker(
                                    bench_shared,
                                    &mut consumer_context,
                                    settings,
                                    consumers,
                                    barrier,
                                );
                            });
                        if let Err(source) = spawned {
                            gate.abort();
                            context.cancel();
                            return Err(EngineError::ThreadSpawn {
                                benchmark: name.to_string(),
                                source,
                            });
                        }
                    }
                    gate.open();
                    Ok(())
                });

                arena.stop_phase(root);
                bench.cleanup(&mut context);
                handler.on_launched(*current, total, name, &description, attempt);
                arena.fold_current(root);
                spawn_result?;
            }
        }
    }

    Ok(())
}

fn run_producer_worker(
    bench: &dyn BenchmarkPc,
    context: &mut ContextPc,
    settings: &Settings,
    producers: usize,
    barrier: &Barrier,
) {
    let arena = Arc::clone(context.arena());
    let phase = context.start_phase_thread_safe("producer");
    context.set_current(phase);
    context.add_operations(-1);

    bench.initialize_producer(context);

    let plan = if settings.duration() > 0 {
        let calibrated = calibrate_operations(settings.duration(), || bench.run_producer(context));
        discard_calibration(&arena, phase);
        match calibrated {
            Some(operations) => RunPlan {
                infinite: false,
                operations,
            },
            None => RunPlan::fallback(settings),
        }
    } else {
        RunPlan::fallback(settings)
    };

    arena.with_current(phase, |metrics| metrics.set_threads(producers as u32));
    if let Some(latency) = settings.latency_params() {
        arena.with_current(phase, |metrics| metrics.init_latency(latency));
    }
    let latency_auto = settings.latency_auto() && settings.latency_params().is_some();

    let mut remaining = plan.operations;
    barrier.wait();
    arena.start_collecting(phase);
    while !context.produce_stopped()
        && !context.canceled()
        && (plan.infinite || remaining > 0)
    {
        context.add_operations(1);
        if latency_auto {
            let begun = time::timestamp();
            bench.run_producer(context);
            context.add_latency((time::timestamp() - begun) as i64);
        } else {
            bench.run_producer(context);
        }
        remaining -= 1;
    }
    arena.stop_phase(phase);

    bench.cleanup_producer(context);
    arena.update_metrics_subtree(phase);
}

fn run_consumer_worker(
    bench: &dyn BenchmarkPc,
    context: &mut ContextPc,
    settings: &Settings,
    consumers: usize,
    barrier: &Barrier,
) {
    let arena = Arc::clone(context.arena());
    let phase = context.start_phase_thread_safe("consumer");
    context.set_current(phase);
    context.add_operations(-1);
    arena.with_current(phase, |metrics| metrics.set_threads(consumers as u32));

    bench.initialize_consumer(context);

    if let Some(latency) = settings.latency_params() {
        arena.with_current(phase, |metrics| metrics.init_latency(latency));
    }
    let latency_auto = settings.latency_auto() && settings.latency_params().is_some();

    barrier.wait();
    arena.start_collecting(phase);
    while !context.consume_stopped() && !context.canceled() {
        context.add_operations(1);
        if latency_auto {
            let begun = time::timestamp();
            bench.run_consumer(context);
            context.add_latency((time::timestamp() - begun) as i64);
        } else {
            bench.run_consumer(context);
        }
    }
    arena.stop_phase(phase);

    bench.cleanup_consumer(context);
    arena.update_metrics_subtree(phase);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_ATTEMPTS;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        initialized: AtomicUsize,
        cleaned: AtomicUsize,
        runs: AtomicUsize,
    }

    struct CountingBench {
        calls: Arc<Calls>,
    }

    impl CountingBench {
        fn new() -> Self {
            Self {
                calls: Arc::new(Calls::default()),
            }
        }
    }

    impl Benchmark for CountingBench {
        fn initialize(&mut self, _context: &mut Context) {
            self.calls.initialized.fetch_add(1, Ordering::Relaxed);
        }

        fn run(&mut self, _context: &mut Context) {
            self.calls.runs.fetch_add(1, Ordering::Relaxed);
        }

        fn cleanup(&mut self, _context: &mut Context) {
            self.calls.cleaned.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_count_launches() {
        let sequential = BenchmarkInstance::sequential(
            "seq",
            Settings::new().with_attempts(3).with_param_range(0, 1),
            CountingBench::new(),
        );
        assert_eq!(sequential.count_launches(), 6);

        struct Noop;
        impl BenchmarkThreads for Noop {
            fn run_thread(&self, _context: &mut ContextThreads) {}
        }
        let threaded = BenchmarkInstance::threaded(
            "thr",
            Settings::new().with_attempts(2).with_threads(1).with_threads(4),
            Noop,
        );
        assert_eq!(threaded.count_launches(), 4);

        // Empty sweep lists count as one sentinel combination
        let sequential = BenchmarkInstance::sequential("seq", Settings::new(), CountingBench::new());
        assert_eq!(sequential.count_launches(), DEFAULT_ATTEMPTS);
    }

    #[test]
    fn test_sequential_launch_counts_callbacks_and_keeps_best_attempt() {
        let bench = CountingBench::new();
        let calls = Arc::clone(&bench.calls);
        let mut instance = BenchmarkInstance::sequential(
            "counting",
            Settings::new().with_attempts(3).with_operations(100),
            bench,
        );
        let mut current = 0;
        instance
            .launch(&mut current, instance.count_launches(), &mut NullLaunchHandler)
            .unwrap();

        assert!(instance.launched());
        assert_eq!(current, 3);
        assert_eq!(instance.root_phases().len(), 1);

        let root = instance.root_phases()[0];
        assert_eq!(instance.arena().name(root), "counting");
        let result = instance.arena().result_metrics(root);
        // Best attempt only, never the sum across attempts
        assert_eq!(result.total_operations(), 100);
        assert!(result.total_time() >= 0);
        assert!(result.total_time() < i64::MAX);

        assert_eq!(calls.initialized.load(Ordering::Relaxed), 3);
        assert_eq!(calls.cleaned.load(Ordering::Relaxed), 3);
        assert_eq!(calls.runs.load(Ordering::Relaxed), 300);
    }

    #[test]
    fn test_sequential_launch_with_params_creates_one_root_per_combination() {
        let mut instance = BenchmarkInstance::sequential(
            "sweep",
            Settings::new()
                .with_attempts(2)
                .with_operations(1)
                .with_param(8)
                .with_param(64),
            CountingBench::new(),
        );
        let mut current = 0;
        instance
            .launch(&mut current, instance.count_launches(), &mut NullLaunchHandler)
            .unwrap();

        let names: Vec<String> = instance
            .root_phases()
            .iter()
            .map(|&root| instance.arena().name(root))
            .collect();
        assert_eq!(names, ["sweep(8)", "sweep(64)"]);
        assert_eq!(current, 4);
    }

    struct SpinThreads {
        runs: Arc<AtomicUsize>,
    }

    impl BenchmarkThreads for SpinThreads {
        fn run_thread(&self, _context: &mut ContextThreads) {
            self.runs.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_threaded_launch_collapses_thread_phases() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut instance = BenchmarkInstance::threaded(
            "spin",
            Settings::new().with_attempts(1).with_threads(2).with_operations(10),
            SpinThreads { runs: Arc::clone(&runs) },
        );
        let mut current = 0;
        instance
            .launch(&mut current, instance.count_launches(), &mut NullLaunchHandler)
            .unwrap();

        assert_eq!(runs.load(Ordering::Relaxed), 20);

        let root = instance.root_phases()[0];
        assert_eq!(instance.arena().name(root), "spin(threads:2)");

        // Both worker phases collapsed into one representative
        let children = instance.arena().children(root);
        assert_eq!(children.len(), 1);
        assert_eq!(instance.arena().name(children[0]), "spin(threads:2).thread");
        assert_eq!(instance.arena().thread(children[0]), 0);

        let result = instance.arena().result_metrics(children[0]);
        assert_eq!(result.total_operations(), 10);
        assert_eq!(result.threads(), 2);
    }

    struct CancelAfter {
        threshold: usize,
        runs: Arc<AtomicUsize>,
    }

    impl BenchmarkThreads for CancelAfter {
        fn run_thread(&self, context: &mut ContextThreads) {
            if self.runs.fetch_add(1, Ordering::Relaxed) >= self.threshold {
                context.cancel();
            }
        }
    }

    #[test]
    fn test_cancellation_stops_infinite_threaded_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut instance = BenchmarkInstance::threaded(
            "cancel",
            Settings::new().with_attempts(1).with_threads(4).with_infinite(),
            CancelAfter {
                threshold: 1_000,
                runs: Arc::clone(&runs),
            },
        );
        let mut current = 0;
        instance
            .launch(&mut current, instance.count_launches(), &mut NullLaunchHandler)
            .unwrap();
        // All four workers observed the flag and joined
        assert!(instance.launched());
        assert!(runs.load(Ordering::Relaxed) >= 1_000);
    }

    struct QueueBench {
        queue: Mutex<VecDeque<u64>>,
        budget: AtomicI64,
        consumed: Arc<AtomicUsize>,
    }

    impl BenchmarkPc for QueueBench {
        fn run_producer(&self, context: &mut ContextPc) {
            self.queue.lock().unwrap().push_back(1);
            if self.budget.fetch_sub(1, Ordering::Relaxed) <= 1 {
                context.stop_produce();
            }
        }

        fn run_consumer(&self, context: &mut ContextPc) {
            let item = self.queue.lock().unwrap().pop_front();
            if item.is_some() {
                self.consumed.fetch_add(1, Ordering::Relaxed);
                context.add_items(1);
            } else if context.produce_stopped() {
                context.stop_consume();
            }
        }
    }

    #[test]
    fn test_producer_consumer_launch_stops_via_role_flags() {
        let consumed = Arc::new(AtomicUsize::new(0));
        let mut instance = BenchmarkInstance::producer_consumer(
            "queue",
            Settings::new().with_attempts(1).with_pc(1, 1).with_operations(50),
            QueueBench {
                queue: Mutex::new(VecDeque::new()),
                budget: AtomicI64::new(50),
                consumed: Arc::clone(&consumed),
            },
        );
        let mut current = 0;
        instance
            .launch(&mut current, instance.count_launches(), &mut NullLaunchHandler)
            .unwrap();

        assert!(consumed.load(Ordering::Relaxed) > 0);

        let root = instance.root_phases()[0];
        assert_eq!(instance.arena().name(root), "queue(producers:1,consumers:1)");
        let mut children: Vec<String> = instance
            .arena()
            .children(root)
            .iter()
            .map(|&child| instance.arena().name(child))
            .collect();
        children.sort();
        assert_eq!(
            children,
            [
                "queue(producers:1,consumers:1).consumer",
                "queue(producers:1,consumers:1).producer"
            ]
        );
    }

    #[test]
    fn test_calibration_derives_positive_operation_count() {
        let operations = calibrate_operations(2, || {
            std::hint::black_box(1 + 1);
        });
        assert!(operations.unwrap() > 0);
    }

    struct NestedWork;

    impl Benchmark for NestedWork {
        fn run(&mut self, context: &mut Context) {
            let _inner = context.scope_phase("inner");
        }
    }

    #[test]
    fn test_duration_calibration_does_not_inflate_subphase_totals() {
        let mut instance = BenchmarkInstance::sequential(
            "nested",
            Settings::new().with_attempts(1).with_duration(1),
            NestedWork,
        );
        let mut current = 0;
        instance
            .launch(&mut current, instance.count_launches(), &mut NullLaunchHandler)
            .unwrap();

        let root = instance.root_phases()[0];
        let children = instance.arena().children(root);
        assert_eq!(children.len(), 1);

        let root_result = instance.arena().result_metrics(root);
        let child_result = instance.arena().result_metrics(children[0]);
        assert!(root_result.total_operations() > 0);
        // Every measured operation opens the sub-phase exactly once; the
        // calibration pre-run must not leave extra traffic behind
        assert_eq!(
            child_result.total_operations(),
            root_result.total_operations()
        );
        assert!(child_result.total_time() <= root_result.total_time());
    }
}
